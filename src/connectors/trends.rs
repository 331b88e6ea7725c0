//! Search-trend connector (SerpApi Google Trends)
//!
//! Weekly interest-over-time series for the subject, last 12 weeks,
//! normalized to {date, interest} points.

use crate::connectors::{
    build_http_client, classify_status, classify_transport_error, iso_day, ConnectorError,
    ConnectorResult, FetchRequest, ProviderConnector,
};
use crate::models::{DataCategory, ProviderPayload, SeriesPoint};
use crate::quota::ProviderQuota;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

const BASE_URL: &str = "https://serpapi.com/search.json";
const TREND_WEEKS: usize = 12;

#[derive(Debug, Deserialize)]
struct TrendsResponse {
    #[serde(default)]
    interest_over_time: Option<InterestOverTime>,
}

#[derive(Debug, Deserialize)]
struct InterestOverTime {
    #[serde(default)]
    timeline_data: Vec<TimelineEntry>,
}

#[derive(Debug, Deserialize)]
struct TimelineEntry {
    /// Unix seconds, as a string in the SerpApi payload.
    #[serde(default)]
    timestamp: String,
    #[serde(default)]
    values: Vec<TimelineValue>,
}

#[derive(Debug, Deserialize)]
struct TimelineValue {
    #[serde(default)]
    extracted_value: f64,
}

fn normalize(parsed: TrendsResponse, subject: &str) -> Result<ProviderPayload, ConnectorError> {
    let timeline = parsed
        .interest_over_time
        .map(|i| i.timeline_data)
        .unwrap_or_default();

    let mut points: Vec<SeriesPoint> = timeline
        .iter()
        .filter_map(|entry| {
            let secs: i64 = entry.timestamp.trim().parse().ok()?;
            let day = iso_day(DateTime::from_timestamp(secs, 0)?.date_naive());
            let value = entry.values.first()?.extracted_value;
            Some(SeriesPoint::new(day, value))
        })
        .collect();

    if points.is_empty() {
        return Err(ConnectorError::InvalidSubject(format!(
            "trends: no interest data for '{}'",
            subject
        )));
    }

    points.sort_by(|a, b| a.x.cmp(&b.x));
    if points.len() > TREND_WEEKS {
        points.drain(..points.len() - TREND_WEEKS);
    }

    Ok(ProviderPayload::from_points(points))
}

pub struct TrendsConnector {
    api_key: String,
    quota: Arc<ProviderQuota>,
    client: Client,
}

impl TrendsConnector {
    pub fn new(api_key: String, quota: Arc<ProviderQuota>) -> Self {
        Self {
            api_key,
            quota,
            client: build_http_client(),
        }
    }
}

#[async_trait::async_trait]
impl ProviderConnector for TrendsConnector {
    fn name(&self) -> &'static str {
        "serpapi-trends"
    }

    fn description(&self) -> &'static str {
        "Google Trends weekly interest via SerpApi"
    }

    fn category(&self) -> DataCategory {
        DataCategory::SearchTrend
    }

    async fn fetch(&self, request: &FetchRequest) -> ConnectorResult {
        let subject = request.subject.trim();
        if subject.is_empty() {
            return Err(ConnectorError::InvalidSubject(
                "trends: empty subject".to_string(),
            ));
        }
        if self.api_key.is_empty() {
            return Err(ConnectorError::Upstream("trends: no API key".to_string()));
        }
        if !self.quota.try_acquire() {
            return Err(ConnectorError::RateLimited(
                "trends: local quota window spent".to_string(),
            ));
        }

        debug!(subject, "Fetching search-trend interest");

        let response = self
            .client
            .get(BASE_URL)
            .query(&[
                ("engine", "google_trends"),
                ("q", subject),
                ("date", "today 3-m"),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| classify_transport_error(e, "serpapi-trends"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, "serpapi-trends", &body));
        }

        let parsed: TrendsResponse = response
            .json()
            .await
            .map_err(|e| ConnectorError::Upstream(format!("trends: bad body: {}", e)))?;

        normalize(parsed, subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TrendsResponse {
        serde_json::from_str(
            r#"{
                "interest_over_time": {
                    "timeline_data": [
                        {"date": "Jul 27 - Aug 2, 2025", "timestamp": "1753574400",
                         "values": [{"query": "tesla", "value": "64", "extracted_value": 64}]},
                        {"date": "Aug 3 - 9, 2025", "timestamp": "1754179200",
                         "values": [{"query": "tesla", "value": "71", "extracted_value": 71}]}
                    ]
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_normalize_extracts_weekly_points() {
        let payload = normalize(sample(), "tesla").unwrap();
        assert_eq!(payload.points.len(), 2);
        assert_eq!(payload.points[0].y, 64.0);
        assert!(payload.points[0].x < payload.points[1].x);
        assert!(payload.texts.is_empty());
    }

    #[test]
    fn test_normalize_caps_at_trend_weeks() {
        let entries: Vec<String> = (0..20)
            .map(|i| {
                format!(
                    r#"{{"timestamp": "{}", "values": [{{"extracted_value": {}}}]}}"#,
                    1700000000 + i * 604800,
                    i
                )
            })
            .collect();
        let raw = format!(
            r#"{{"interest_over_time": {{"timeline_data": [{}]}}}}"#,
            entries.join(",")
        );
        let parsed: TrendsResponse = serde_json::from_str(&raw).unwrap();

        let payload = normalize(parsed, "tesla").unwrap();
        assert_eq!(payload.points.len(), TREND_WEEKS);
        // Kept the most recent weeks.
        assert_eq!(payload.points.last().unwrap().y, 19.0);
    }

    #[test]
    fn test_empty_timeline_is_invalid_subject() {
        let parsed: TrendsResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            normalize(parsed, "tesla").unwrap_err(),
            ConnectorError::InvalidSubject(_)
        ));
    }
}
