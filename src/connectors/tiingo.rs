//! Tiingo daily price connector (primary price provider)

use crate::connectors::{
    build_http_client, classify_status, classify_transport_error, sanitize_symbol, ConnectorError,
    ConnectorResult, FetchRequest, ProviderConnector,
};
use crate::models::{DataCategory, ProviderPayload, SeriesPoint};
use crate::quota::ProviderQuota;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

const BASE_URL: &str = "https://api.tiingo.com/tiingo/daily";

#[derive(Debug, Deserialize)]
struct TiingoBar {
    /// ISO timestamp, date in the first 10 chars.
    date: String,
    close: f64,
}

pub struct TiingoConnector {
    api_key: String,
    quota: Arc<ProviderQuota>,
    lookback_days: i64,
    client: Client,
}

impl TiingoConnector {
    pub fn new(api_key: String, quota: Arc<ProviderQuota>, lookback_days: i64) -> Self {
        Self {
            api_key,
            quota,
            lookback_days,
            client: build_http_client(),
        }
    }
}

#[async_trait::async_trait]
impl ProviderConnector for TiingoConnector {
    fn name(&self) -> &'static str {
        "tiingo"
    }

    fn description(&self) -> &'static str {
        "Tiingo daily close series"
    }

    fn category(&self) -> DataCategory {
        DataCategory::Price
    }

    async fn fetch(&self, request: &FetchRequest) -> ConnectorResult {
        let symbol = sanitize_symbol(request.symbol())?;

        if self.api_key.is_empty() {
            return Err(ConnectorError::Upstream("tiingo: no API key".to_string()));
        }
        if !self.quota.try_acquire() {
            return Err(ConnectorError::RateLimited(
                "tiingo: local quota window spent".to_string(),
            ));
        }

        let start = super::lookback_start(self.lookback_days);
        let url = format!(
            "{}/{}/prices?startDate={}&token={}",
            BASE_URL,
            symbol,
            super::iso_day(start),
            self.api_key
        );

        debug!(symbol = %symbol, "Fetching Tiingo daily prices");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| classify_transport_error(e, "tiingo"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, "tiingo", &body));
        }

        let bars: Vec<TiingoBar> = response
            .json()
            .await
            .map_err(|e| ConnectorError::Upstream(format!("tiingo: bad body: {}", e)))?;

        if bars.is_empty() {
            return Err(ConnectorError::InvalidSubject(format!(
                "tiingo: no price rows for '{}'",
                symbol
            )));
        }

        let points = bars
            .iter()
            .map(|bar| SeriesPoint::new(bar.date.chars().take(10).collect::<String>(), bar.close))
            .collect();

        Ok(ProviderPayload::from_points(points))
    }
}
