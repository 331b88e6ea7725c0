//! GDELT article-search connector (news fallback)
//!
//! Keyless fallback behind NewsAPI. Same normalization: per-day net
//! lexicon score points over the news window plus the headline texts.

use crate::connectors::newsapi::{bucket_daily_scores, NEWS_WINDOW_DAYS};
use crate::connectors::{
    build_http_client, classify_status, classify_transport_error, iso_day, ConnectorError,
    ConnectorResult, FetchRequest, ProviderConnector,
};
use crate::models::{DataCategory, ProviderPayload};
use crate::quota::ProviderQuota;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

const BASE_URL: &str = "https://api.gdeltproject.org/api/v2/doc/doc";

#[derive(Debug, Deserialize)]
struct GdeltResponse {
    #[serde(default)]
    articles: Vec<GdeltArticle>,
}

#[derive(Debug, Deserialize)]
struct GdeltArticle {
    #[serde(default)]
    title: String,
    /// "YYYYMMDDThhmmssZ" compact timestamp.
    #[serde(default)]
    seendate: String,
}

/// "20260803T141500Z" -> "2026-08-03"
fn seendate_to_iso(seendate: &str) -> Option<String> {
    if seendate.len() < 8 || !seendate[..8].bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!(
        "{}-{}-{}",
        &seendate[..4],
        &seendate[4..6],
        &seendate[6..8]
    ))
}

pub struct GdeltConnector {
    quota: Arc<ProviderQuota>,
    client: Client,
}

impl GdeltConnector {
    pub fn new(quota: Arc<ProviderQuota>) -> Self {
        Self {
            quota,
            client: build_http_client(),
        }
    }
}

#[async_trait::async_trait]
impl ProviderConnector for GdeltConnector {
    fn name(&self) -> &'static str {
        "gdelt"
    }

    fn description(&self) -> &'static str {
        "GDELT article search with lexicon sentiment scoring"
    }

    fn category(&self) -> DataCategory {
        DataCategory::News
    }

    async fn fetch(&self, request: &FetchRequest) -> ConnectorResult {
        let subject = request.subject.trim();
        if subject.is_empty() {
            return Err(ConnectorError::InvalidSubject(
                "gdelt: empty subject".to_string(),
            ));
        }
        if !self.quota.try_acquire() {
            return Err(ConnectorError::RateLimited(
                "gdelt: local quota window spent".to_string(),
            ));
        }

        debug!(subject, "Fetching GDELT articles");

        let timespan = format!("{}d", NEWS_WINDOW_DAYS);
        let response = self
            .client
            .get(BASE_URL)
            .query(&[
                ("query", subject),
                ("mode", "ArtList"),
                ("format", "json"),
                ("maxrecords", "75"),
                ("timespan", timespan.as_str()),
                ("sort", "DateDesc"),
            ])
            .send()
            .await
            .map_err(|e| classify_transport_error(e, "gdelt"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, "gdelt", &body));
        }

        let parsed: GdeltResponse = response
            .json()
            .await
            .map_err(|e| ConnectorError::Upstream(format!("gdelt: bad body: {}", e)))?;

        Ok(normalize(parsed))
    }
}

fn normalize(parsed: GdeltResponse) -> ProviderPayload {
    let mut per_day: BTreeMap<String, Vec<String>> = BTreeMap::new();

    // Seed the window so quiet days still produce a zero point.
    let today = chrono::Utc::now().date_naive();
    for offset in 1..=NEWS_WINDOW_DAYS {
        per_day.insert(iso_day(today - chrono::Duration::days(offset)), Vec::new());
    }

    for article in parsed.articles {
        let title = article.title.trim();
        if title.is_empty() {
            continue;
        }
        if let Some(day) = seendate_to_iso(&article.seendate) {
            // Only keep articles inside the seeded window.
            if let Some(bucket) = per_day.get_mut(&day) {
                bucket.push(title.to_string());
            }
        }
    }

    bucket_daily_scores(per_day.into_iter().collect())
}
