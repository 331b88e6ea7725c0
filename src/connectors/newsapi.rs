//! NewsAPI headline connector (primary news provider)
//!
//! Pulls headlines for each of the last five days and scores them with
//! a small lexicon, emitting one net-sentiment point per day plus the
//! raw headline texts for the summarizer.

use crate::connectors::{
    build_http_client, classify_status, classify_transport_error, iso_day, ConnectorError,
    ConnectorResult, FetchRequest, ProviderConnector,
};
use crate::models::{DataCategory, ProviderPayload, SeriesPoint};
use crate::quota::ProviderQuota;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

const BASE_URL: &str = "https://newsapi.org/v2/everything";
pub(crate) const NEWS_WINDOW_DAYS: i64 = 5;

const POSITIVE_WORDS: &[&str] = &[
    "beat", "beats", "surge", "surges", "rally", "record", "growth", "gain", "gains", "strong",
    "upgrade", "upgraded", "profit", "profits", "soar", "soars", "bullish", "outperform", "win",
    "wins", "expands", "breakthrough",
];

const NEGATIVE_WORDS: &[&str] = &[
    "miss", "misses", "drop", "drops", "plunge", "plunges", "fall", "falls", "weak", "downgrade",
    "downgraded", "loss", "losses", "lawsuit", "recall", "bearish", "underperform", "cut", "cuts",
    "layoff", "layoffs", "probe", "fraud",
];

fn is_negator(token: &str) -> bool {
    matches!(token, "not" | "no" | "never" | "without" | "cannot")
}

/// Net lexicon score for one headline. A negator within the three
/// preceding tokens flips the sign of a hit.
pub(crate) fn score_headline(text: &str) -> i32 {
    let tokens: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_lowercase())
        .collect();

    let mut score = 0;
    for i in 0..tokens.len() {
        let word = tokens[i].as_str();
        let base = if POSITIVE_WORDS.contains(&word) {
            1
        } else if NEGATIVE_WORDS.contains(&word) {
            -1
        } else {
            continue;
        };

        let negated = (1..=3).any(|k| i >= k && is_negator(tokens[i - k].as_str()));
        score += if negated { -base } else { base };
    }
    score
}

/// Bucket (day, headline) pairs into per-day net-score points plus the
/// flattened headline list. Days arrive oldest-first.
pub(crate) fn bucket_daily_scores(days: Vec<(String, Vec<String>)>) -> ProviderPayload {
    let mut points = Vec::with_capacity(days.len());
    let mut texts = Vec::new();

    for (day, headlines) in days {
        let score: i32 = headlines.iter().map(|h| score_headline(h)).sum();
        points.push(SeriesPoint::new(day, score as f64));
        texts.extend(headlines);
    }

    ProviderPayload { points, texts }
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
    description: Option<String>,
}

pub struct NewsApiConnector {
    api_key: String,
    quota: Arc<ProviderQuota>,
    client: Client,
}

impl NewsApiConnector {
    pub fn new(api_key: String, quota: Arc<ProviderQuota>) -> Self {
        Self {
            api_key,
            quota,
            client: build_http_client(),
        }
    }

    async fn fetch_day(
        &self,
        subject: &str,
        from: &str,
        to: &str,
    ) -> Result<Vec<String>, ConnectorError> {
        if !self.quota.try_acquire() {
            return Err(ConnectorError::RateLimited(
                "newsapi: local quota window spent".to_string(),
            ));
        }

        let response = self
            .client
            .get(BASE_URL)
            .query(&[
                ("q", subject),
                ("from", from),
                ("to", to),
                ("language", "en"),
                ("sortBy", "relevancy"),
                ("pageSize", "50"),
                ("apiKey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| classify_transport_error(e, "newsapi"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, "newsapi", &body));
        }

        let parsed: NewsResponse = response
            .json()
            .await
            .map_err(|e| ConnectorError::Upstream(format!("newsapi: bad body: {}", e)))?;

        Ok(parsed
            .articles
            .into_iter()
            .filter_map(|a| a.title.or(a.description))
            .filter(|t| !t.trim().is_empty())
            .collect())
    }
}

#[async_trait::async_trait]
impl ProviderConnector for NewsApiConnector {
    fn name(&self) -> &'static str {
        "newsapi"
    }

    fn description(&self) -> &'static str {
        "NewsAPI headlines with lexicon sentiment scoring"
    }

    fn category(&self) -> DataCategory {
        DataCategory::News
    }

    async fn fetch(&self, request: &FetchRequest) -> ConnectorResult {
        let subject = request.subject.trim();
        if subject.is_empty() {
            return Err(ConnectorError::InvalidSubject(
                "newsapi: empty subject".to_string(),
            ));
        }
        if self.api_key.is_empty() {
            return Err(ConnectorError::Upstream("newsapi: no API key".to_string()));
        }

        debug!(subject, "Fetching NewsAPI headlines");

        let today = chrono::Utc::now().date_naive();
        let mut days = Vec::with_capacity(NEWS_WINDOW_DAYS as usize);
        for offset in (1..=NEWS_WINDOW_DAYS).rev() {
            let from = today - chrono::Duration::days(offset);
            let to = today - chrono::Duration::days(offset - 1);
            let headlines = self
                .fetch_day(subject, &iso_day(from), &iso_day(to))
                .await?;
            days.push((iso_day(from), headlines));
        }

        Ok(bucket_daily_scores(days))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_headline_polarity() {
        assert!(score_headline("Tesla beats delivery estimates, shares surge") > 0);
        assert!(score_headline("Tesla misses targets as sales drop") < 0);
        assert_eq!(score_headline("Tesla opens new showroom in Austin"), 0);
    }

    #[test]
    fn test_negation_flips_sign() {
        assert!(score_headline("Tesla did not miss estimates") > 0);
        assert!(score_headline("no growth in sight for Tesla") < 0);
    }

    #[test]
    fn test_bucket_daily_scores() {
        let payload = bucket_daily_scores(vec![
            (
                "2026-08-01".to_string(),
                vec![
                    "Tesla beats estimates".to_string(),
                    "Shares surge on record deliveries".to_string(),
                ],
            ),
            ("2026-08-02".to_string(), vec!["Analysts cut targets".to_string()]),
            ("2026-08-03".to_string(), vec![]),
        ]);

        assert_eq!(payload.points.len(), 3);
        assert!(payload.points[0].y > 0.0);
        assert!(payload.points[1].y < 0.0);
        assert_eq!(payload.points[2].y, 0.0);
        assert_eq!(payload.texts.len(), 3);
    }

    #[test]
    fn test_article_parsing_falls_back_to_description() {
        let raw = r#"{
            "status": "ok",
            "articles": [
                {"title": "Tesla beats estimates", "description": "full text"},
                {"title": null, "description": "Deliveries surge in Q2"},
                {"title": "", "description": null}
            ]
        }"#;

        let parsed: NewsResponse = serde_json::from_str(raw).unwrap();
        let headlines: Vec<String> = parsed
            .articles
            .into_iter()
            .filter_map(|a| a.title.or(a.description))
            .filter(|t| !t.trim().is_empty())
            .collect();
        assert_eq!(headlines.len(), 2);
        assert_eq!(headlines[1], "Deliveries surge in Q2");
    }
}
