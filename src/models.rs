//! Core data models for the insight pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum DataCategory {
    Price,
    News,
    SearchTrend,
    Sector,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BlockStatus {
    Complete,
    Partial,
    Failed,
}

/// Why a (pillar, category) fetch produced no payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FailureReason {
    /// Every provider in the chain was unavailable (rate limit, timeout,
    /// upstream failure) or the chain budget ran out first.
    AllProvidersExhausted(String),
    /// The request itself was unusable for this category; fallback is
    /// never attempted for these.
    InvalidSubject(String),
}

//
// ================= Query =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub request_id: Uuid,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            text: text.into(),
            received_at: Utc::now(),
        }
    }
}

//
// ================= Intent =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    pub subject: String,
    pub focus_areas: Vec<String>,
    pub is_low_context: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<String>,
}

impl Intent {
    /// Multi-pillar analysis intent.
    pub fn analysis(subject: impl Into<String>, focus_areas: Vec<String>) -> Self {
        Self {
            subject: subject.into(),
            focus_areas,
            is_low_context: false,
            ticker: None,
            sector: None,
            answer: None,
            citations: Vec::new(),
        }
    }

    /// Low-context intent carrying the capability's own answer.
    pub fn direct(
        subject: impl Into<String>,
        answer: impl Into<String>,
        citations: Vec<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            focus_areas: Vec::new(),
            is_low_context: true,
            ticker: None,
            sector: None,
            answer: Some(answer.into()),
            citations,
        }
    }

    pub fn with_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = Some(ticker.into());
        self
    }

    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }
}

//
// ================= Provider Payload =================
//

/// One chart point. `x` is an ISO date (YYYY-MM-DD) so lexicographic
/// order is chronological order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesPoint {
    pub x: String,
    pub y: f64,
}

impl SeriesPoint {
    pub fn new(x: impl Into<String>, y: f64) -> Self {
        Self { x: x.into(), y }
    }
}

/// Normalized fetch result. Every connector converts its vendor wire
/// format into this shape before returning; nothing vendor-shaped
/// crosses the connector boundary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderPayload {
    pub points: Vec<SeriesPoint>,
    pub texts: Vec<String>,
}

impl ProviderPayload {
    pub fn from_points(points: Vec<SeriesPoint>) -> Self {
        Self {
            points,
            texts: Vec::new(),
        }
    }
}

//
// ================= Fetch Result =================
//

/// Outcome of one (pillar, category) fetch through a fallback chain.
/// Never mutated after creation, only aggregated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFetchResult {
    pub category: DataCategory,
    pub provider_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<ProviderPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<FailureReason>,
    pub latency_ms: u64,
}

impl RawFetchResult {
    pub fn success(
        category: DataCategory,
        provider: &str,
        payload: ProviderPayload,
        latency: Duration,
    ) -> Self {
        Self {
            category,
            provider_used: Some(provider.to_string()),
            payload: Some(payload),
            failure_reason: None,
            latency_ms: latency.as_millis() as u64,
        }
    }

    pub fn failure(
        category: DataCategory,
        provider: Option<String>,
        reason: FailureReason,
        latency: Duration,
    ) -> Self {
        Self {
            category,
            provider_used: provider,
            payload: None,
            failure_reason: Some(reason),
            latency_ms: latency.as_millis() as u64,
        }
    }

    pub fn is_success(&self) -> bool {
        self.payload.is_some()
    }
}

//
// ================= Insight Block =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    pub visualization_type: String,
    pub x_key: String,
    pub y_key: String,
}

/// The unit of output: chart data, metadata, and narrative insight for
/// one pillar. Immutable once formatted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightBlock {
    pub pillar: String,
    #[serde(flatten)]
    pub metadata: ChartMetadata,
    pub data: Vec<SeriesPoint>,
    pub insight: String,
    pub status: BlockStatus,
}

//
// ================= Final Results =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub request_id: Uuid,
    pub intent: Intent,
    pub blocks: Vec<InsightBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectAnswer {
    pub request_id: Uuid,
    pub answer: String,
    #[serde(default)]
    pub citations: Vec<String>,
}

/// What `analyze` hands back: either the full chart-block response or
/// the Direct Answer short-circuit for low-context queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "mode")]
pub enum AnalysisOutcome {
    Analysis(AnalysisResponse),
    Direct(DirectAnswer),
}

impl fmt::Display for DataCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataCategory::Price => "price",
            DataCategory::News => "news",
            DataCategory::SearchTrend => "searchTrend",
            DataCategory::Sector => "sector",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::AllProvidersExhausted(detail) => {
                write!(f, "all providers exhausted: {}", detail)
            }
            FailureReason::InvalidSubject(detail) => write!(f, "invalid subject: {}", detail),
        }
    }
}
