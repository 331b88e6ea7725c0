//! Provider connectors
//!
//! One connector per (vendor, data category). Every connector
//! normalizes its vendor's wire format into `ProviderPayload` before
//! returning, so nothing vendor-shaped crosses into the orchestrator.

use crate::chain::FallbackChain;
use crate::config::PipelineConfig;
use crate::models::{DataCategory, Intent, ProviderPayload};
use crate::quota::ProviderQuota;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub mod gdelt;
pub mod newsapi;
pub mod polygon;
pub mod sector;
pub mod tiingo;
pub mod trends;

pub use gdelt::GdeltConnector;
pub use newsapi::NewsApiConnector;
pub use polygon::PolygonConnector;
pub use sector::SectorEtfConnector;
pub use tiingo::TiingoConnector;
pub use trends::TrendsConnector;

/// Connector failure modes. Retryable kinds advance the fallback
/// chain; `InvalidSubject` stops it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectorError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("upstream failure: {0}")]
    Upstream(String),

    #[error("invalid subject: {0}")]
    InvalidSubject(String),
}

impl ConnectorError {
    pub fn retryable(&self) -> bool {
        !matches!(self, ConnectorError::InvalidSubject(_))
    }
}

pub type ConnectorResult = std::result::Result<ProviderPayload, ConnectorError>;

/// Fetch target handed to every connector: the resolved subject plus
/// the intent hints some vendors can use directly.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub subject: String,
    pub ticker: Option<String>,
    pub sector: Option<String>,
}

impl FetchRequest {
    pub fn from_intent(intent: &Intent) -> Self {
        Self {
            subject: intent.subject.clone(),
            ticker: intent.ticker.clone(),
            sector: intent.sector.clone(),
        }
    }

    /// The symbol-shaped handle on the subject: explicit ticker when
    /// the intent carried one, raw subject otherwise.
    pub fn symbol(&self) -> &str {
        self.ticker.as_deref().unwrap_or(&self.subject)
    }
}

/// Trait for a single provider connector
#[async_trait::async_trait]
pub trait ProviderConnector: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn category(&self) -> DataCategory;
    async fn fetch(&self, request: &FetchRequest) -> ConnectorResult;
}

//
// ================= Shared helpers =================
//

pub(crate) fn build_http_client() -> Client {
    Client::builder()
        .pool_idle_timeout(Duration::from_secs(60))
        .pool_max_idle_per_host(8)
        .timeout(Duration::from_secs(30))
        .build()
        .expect("Failed to build HTTP client")
}

pub(crate) fn classify_transport_error(e: reqwest::Error, provider: &str) -> ConnectorError {
    if e.is_timeout() {
        ConnectorError::Timeout(format!("{}: {}", provider, e))
    } else {
        ConnectorError::Upstream(format!("{}: {}", provider, e))
    }
}

/// Map a non-success HTTP status onto a connector failure. Credential
/// problems (401/403) are a provider-availability issue, not a fault
/// in the subject, so they stay retryable.
pub(crate) fn classify_status(status: StatusCode, provider: &str, body: &str) -> ConnectorError {
    let detail = format!("{} returned {}: {}", provider, status, snippet(body));
    match status {
        StatusCode::TOO_MANY_REQUESTS => ConnectorError::RateLimited(detail),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ConnectorError::Upstream(detail),
        s if s.is_server_error() => ConnectorError::Upstream(detail),
        s if s.is_client_error() => ConnectorError::InvalidSubject(detail),
        _ => ConnectorError::Upstream(detail),
    }
}

fn snippet(body: &str) -> &str {
    let end = body
        .char_indices()
        .take(160)
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    &body[..end]
}

/// Uppercase and validate a candidate ticker symbol.
pub(crate) fn sanitize_symbol(raw: &str) -> Result<String, ConnectorError> {
    let cleaned = raw.trim().to_uppercase();
    let usable = !cleaned.is_empty()
        && cleaned.len() <= 12
        && cleaned
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');

    if usable {
        Ok(cleaned)
    } else {
        Err(ConnectorError::InvalidSubject(format!(
            "unusable symbol '{}'",
            raw.trim()
        )))
    }
}

pub(crate) fn lookback_start(days: i64) -> NaiveDate {
    chrono::Utc::now().date_naive() - chrono::Duration::days(days)
}

pub(crate) fn iso_day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

//
// ================= Stub connector =================
//

/// Canned connector for demos and tests: serves a fixed payload or
/// failure without touching the network, and counts its calls.
pub struct StubConnector {
    name: &'static str,
    category: DataCategory,
    payload: ProviderPayload,
    failure: Option<ConnectorError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StubConnector {
    pub fn healthy(name: &'static str, category: DataCategory, payload: ProviderPayload) -> Self {
        Self {
            name,
            category,
            payload,
            failure: None,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(name: &'static str, category: DataCategory, failure: ConnectorError) -> Self {
        Self {
            name,
            category,
            payload: ProviderPayload::default(),
            failure: Some(failure),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Never answers within any realistic deadline.
    pub fn hanging(name: &'static str, category: DataCategory) -> Self {
        Self {
            name,
            category,
            payload: ProviderPayload::default(),
            failure: None,
            delay: Some(Duration::from_secs(3600)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ProviderConnector for StubConnector {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        "Canned payloads for demos and tests"
    }

    fn category(&self) -> DataCategory {
        self.category
    }

    async fn fetch(&self, _request: &FetchRequest) -> ConnectorResult {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(self.payload.clone()),
        }
    }
}

//
// ================= Default chains =================
//

/// Build the production fallback chains from environment credentials.
/// Connectors with missing keys still register; they fail as
/// unavailable at fetch time and the chain moves past them.
pub fn create_default_chains(config: &PipelineConfig) -> Vec<FallbackChain> {
    let tiingo_key = env::var("TIINGO_API_KEY").unwrap_or_default();
    let polygon_key = env::var("POLYGON_API_KEY").unwrap_or_default();
    let newsapi_key = env::var("NEWSAPI_API_KEY").unwrap_or_default();
    let serpapi_key = env::var("SERPAPI_API_KEY").unwrap_or_default();

    let make_quota =
        || Arc::new(ProviderQuota::new(config.provider_window_limit, config.provider_window));

    let tiingo_quota = make_quota();
    // One Polygon account serves both price fallback and sector bars.
    let polygon_quota = make_quota();
    let newsapi_quota = make_quota();
    let gdelt_quota = make_quota();
    let serpapi_quota = make_quota();

    let price: Vec<Arc<dyn ProviderConnector>> = vec![
        Arc::new(TiingoConnector::new(
            tiingo_key,
            tiingo_quota,
            config.price_lookback_days,
        )),
        Arc::new(PolygonConnector::new(
            polygon_key.clone(),
            polygon_quota.clone(),
            config.price_lookback_days,
        )),
    ];

    let news: Vec<Arc<dyn ProviderConnector>> = vec![
        Arc::new(NewsApiConnector::new(newsapi_key, newsapi_quota)),
        Arc::new(GdeltConnector::new(gdelt_quota)),
    ];

    let trend: Vec<Arc<dyn ProviderConnector>> =
        vec![Arc::new(TrendsConnector::new(serpapi_key, serpapi_quota))];

    let sector: Vec<Arc<dyn ProviderConnector>> = vec![Arc::new(SectorEtfConnector::new(
        polygon_key,
        polygon_quota,
        config.price_lookback_days,
    ))];

    let chains = vec![
        FallbackChain::new(DataCategory::Price, price, config.per_call_timeout),
        FallbackChain::new(DataCategory::News, news, config.per_call_timeout),
        FallbackChain::new(DataCategory::SearchTrend, trend, config.per_call_timeout),
        FallbackChain::new(DataCategory::Sector, sector, config.per_call_timeout),
    ];

    for chain in &chains {
        info!(
            category = %chain.category(),
            providers = ?chain.provider_names(),
            "Configured fallback chain"
        );
    }

    chains
}
