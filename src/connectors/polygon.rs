//! Polygon.io aggregates connector (price fallback)
//!
//! Also exposes the shared daily-bar fetch the sector connector rides
//! on, since both hit the same aggregates endpoint.

use crate::connectors::{
    build_http_client, classify_status, classify_transport_error, iso_day, lookback_start,
    sanitize_symbol, ConnectorError, ConnectorResult, FetchRequest, ProviderConnector,
};
use crate::models::{DataCategory, ProviderPayload, SeriesPoint};
use crate::quota::ProviderQuota;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

const BASE_URL: &str = "https://api.polygon.io/v2/aggs/ticker";

/// One daily aggregate bar, already keyed by ISO date.
#[derive(Debug, Clone)]
pub(crate) struct DailyBar {
    pub date: String,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

#[derive(Debug, Deserialize)]
struct AggResponse {
    #[serde(default)]
    results: Vec<AggBar>,
}

#[derive(Debug, Deserialize)]
struct AggBar {
    /// Bar timestamp, milliseconds since epoch.
    t: i64,
    h: f64,
    l: f64,
    c: f64,
}

/// Fetch adjusted daily bars for one symbol over the lookback window.
pub(crate) async fn fetch_daily_bars(
    client: &Client,
    api_key: &str,
    symbol: &str,
    lookback_days: i64,
) -> Result<Vec<DailyBar>, ConnectorError> {
    if api_key.is_empty() {
        return Err(ConnectorError::Upstream("polygon: no API key".to_string()));
    }

    let end = chrono::Utc::now().date_naive();
    let start = lookback_start(lookback_days);
    let url = format!(
        "{}/{}/range/1/day/{}/{}?adjusted=true&sort=asc&limit=50000&apiKey={}",
        BASE_URL,
        symbol,
        iso_day(start),
        iso_day(end),
        api_key
    );

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| classify_transport_error(e, "polygon"))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(classify_status(status, "polygon", &body));
    }

    let parsed: AggResponse = response
        .json()
        .await
        .map_err(|e| ConnectorError::Upstream(format!("polygon: bad body: {}", e)))?;

    if parsed.results.is_empty() {
        return Err(ConnectorError::InvalidSubject(format!(
            "polygon: no aggregate bars for '{}'",
            symbol
        )));
    }

    Ok(parsed
        .results
        .into_iter()
        .filter_map(|bar| {
            DateTime::from_timestamp_millis(bar.t).map(|ts| DailyBar {
                date: iso_day(ts.date_naive()),
                high: bar.h,
                low: bar.l,
                close: bar.c,
            })
        })
        .collect())
}

pub struct PolygonConnector {
    api_key: String,
    quota: Arc<ProviderQuota>,
    lookback_days: i64,
    client: Client,
}

impl PolygonConnector {
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
impl ProviderConnector for PolygonConnector {
    fn name(&self) -> &'static str {
        "polygon"
    }

    fn description(&self) -> &'static str {
        "Polygon.io adjusted daily aggregates"
    }

    fn category(&self) -> DataCategory {
        DataCategory::Price
    }

    async fn fetch(&self, request: &FetchRequest) -> ConnectorResult {
        let symbol = sanitize_symbol(request.symbol())?;

        if !self.quota.try_acquire() {
            return Err(ConnectorError::RateLimited(
                "polygon: local quota window spent".to_string(),
            ));
        }

        debug!(symbol = %symbol, "Fetching Polygon daily aggregates");

        let bars = fetch_daily_bars(&self.client, &self.api_key, &symbol, self.lookback_days).await?;
        let points = bars
            .into_iter()
            .map(|bar| SeriesPoint::new(bar.date, bar.close))
            .collect();

        Ok(ProviderPayload::from_points(points))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agg_response_parsing() {
        let raw = r#"{
            "ticker": "TSLA",
            "resultsCount": 2,
            "results": [
                {"t": 1754006400000, "o": 247.0, "h": 252.0, "l": 246.1, "c": 248.5, "v": 1000},
                {"t": 1754265600000, "o": 249.1, "h": 253.4, "l": 248.0, "c": 251.3, "v": 1200}
            ]
        }"#;

        let parsed: AggResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.results.len(), 2);
        assert_eq!(parsed.results[1].c, 251.3);
    }

    #[test]
    fn test_missing_results_defaults_empty() {
        let parsed: AggResponse = serde_json::from_str(r#"{"ticker": "TSLA"}"#).unwrap();
        assert!(parsed.results.is_empty());
    }

    #[test]
    fn test_timestamp_to_iso_date() {
        // 2025-08-01T00:00:00Z
        let date = DateTime::from_timestamp_millis(1754006400000).unwrap();
        assert_eq!(iso_day(date.date_naive()), "2025-08-01");
    }

    #[tokio::test]
    async fn test_quota_exhaustion_is_rate_limited() {
        let quota = Arc::new(ProviderQuota::new(0, std::time::Duration::from_secs(60)));
        // max(1) floor in ProviderQuota; drain the single slot.
        assert!(quota.try_acquire());

        let connector = PolygonConnector::new("key".to_string(), quota, 180);
        let request = FetchRequest {
            subject: "TSLA".to_string(),
            ticker: None,
            sector: None,
        };

        let err = connector.fetch(&request).await.unwrap_err();
        assert!(matches!(err, ConnectorError::RateLimited(_)));
    }
}
