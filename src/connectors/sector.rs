//! Sector connector (SPDR ETF proxy)
//!
//! Resolves the intent's sector hint to its SPDR sector ETF, fetches
//! daily bars through the Polygon aggregates endpoint, and emits the
//! typical price (H+L+C)/3 per trading day.

use crate::connectors::polygon::fetch_daily_bars;
use crate::connectors::{
    build_http_client, ConnectorError, ConnectorResult, FetchRequest, ProviderConnector,
};
use crate::models::{DataCategory, ProviderPayload, SeriesPoint};
use crate::quota::ProviderQuota;
use reqwest::Client;
use std::sync::Arc;
use tracing::debug;

/// Sector name -> SPDR ETF ticker. Matching is case-insensitive on a
/// leading keyword so "Consumer Discretionary" and "consumer" both hit.
fn sector_etf(sector: &str) -> Option<(&'static str, &'static str)> {
    let lowered = sector.trim().to_lowercase();
    let table: &[(&str, &str, &str)] = &[
        ("technology", "Technology", "XLK"),
        ("financial", "Financials", "XLF"),
        ("energy", "Energy", "XLE"),
        ("health", "Healthcare", "XLV"),
        ("consumer", "Consumer Discretionary", "XLY"),
        ("industrial", "Industrials", "XLI"),
        ("utilit", "Utilities", "XLU"),
        ("material", "Materials", "XLB"),
        ("real estate", "Real Estate", "XLRE"),
        ("communication", "Communication Services", "XLC"),
    ];

    table
        .iter()
        .find(|(keyword, _, _)| lowered.contains(keyword))
        .map(|(_, canonical, etf)| (*canonical, *etf))
}

pub struct SectorEtfConnector {
    api_key: String,
    quota: Arc<ProviderQuota>,
    lookback_days: i64,
    client: Client,
}

impl SectorEtfConnector {
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
impl ProviderConnector for SectorEtfConnector {
    fn name(&self) -> &'static str {
        "sector-etf"
    }

    fn description(&self) -> &'static str {
        "Sector typical price via SPDR ETF daily bars"
    }

    fn category(&self) -> DataCategory {
        DataCategory::Sector
    }

    async fn fetch(&self, request: &FetchRequest) -> ConnectorResult {
        let Some(sector) = request.sector.as_deref().filter(|s| !s.trim().is_empty()) else {
            return Err(ConnectorError::InvalidSubject(
                "sector: intent carried no sector hint".to_string(),
            ));
        };
        let Some((canonical, etf)) = sector_etf(sector) else {
            return Err(ConnectorError::InvalidSubject(format!(
                "sector: no ETF mapping for '{}'",
                sector
            )));
        };

        if !self.quota.try_acquire() {
            return Err(ConnectorError::RateLimited(
                "sector: local quota window spent".to_string(),
            ));
        }

        debug!(sector = canonical, etf, "Fetching sector ETF bars");

        let bars = fetch_daily_bars(&self.client, &self.api_key, etf, self.lookback_days).await?;
        let points = bars
            .into_iter()
            .map(|bar| SeriesPoint::new(bar.date, (bar.high + bar.low + bar.close) / 3.0))
            .collect();

        Ok(ProviderPayload {
            points,
            texts: vec![format!("{} sector tracked via the {} ETF.", canonical, etf)],
        })
    }
}
