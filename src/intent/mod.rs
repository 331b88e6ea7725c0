//! Intent resolution
//!
//! The resolver turns the raw query into an `Intent` through an
//! external reasoning capability. Transport failure gets exactly one
//! retry with backoff and is then fatal for the request; nothing
//! downstream can run without an intent.

use crate::error::PipelineError;
use crate::models::{Intent, Query};
use crate::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub mod sonar;
pub use sonar::SonarIntentExtractor;

/// Focus list assumed when the capability answers but its structured
/// fields cannot be parsed. Spans the whole pillar catalog.
pub const DEFAULT_FOCUS_AREAS: &[&str] = &[
    "financial",
    "news",
    "market",
    "adoption",
    "competitor",
    "contextual",
];

/// Reasoning capability seam.
#[async_trait]
pub trait IntentExtractor: Send + Sync {
    async fn extract_intent(&self, query: &str) -> Result<Intent>;
}

pub struct IntentResolver {
    extractor: Arc<dyn IntentExtractor>,
    retry_backoff: Duration,
}

impl IntentResolver {
    pub fn new(extractor: Arc<dyn IntentExtractor>, retry_backoff: Duration) -> Self {
        Self {
            extractor,
            retry_backoff,
        }
    }

    /// One call, one retry, then `IntentResolutionError`.
    pub async fn resolve(&self, query: &Query) -> Result<Intent> {
        match self.extractor.extract_intent(&query.text).await {
            Ok(intent) => {
                info!(
                    request_id = %query.request_id,
                    subject = %intent.subject,
                    focus = ?intent.focus_areas,
                    low_context = intent.is_low_context,
                    "Intent resolved"
                );
                Ok(intent)
            }
            Err(first) => {
                warn!(
                    request_id = %query.request_id,
                    error = %first,
                    backoff_ms = self.retry_backoff.as_millis() as u64,
                    "Intent extraction failed, retrying once"
                );
                tokio::time::sleep(self.retry_backoff).await;

                self.extractor.extract_intent(&query.text).await.map_err(|e| {
                    PipelineError::IntentResolutionError(format!(
                        "could not understand query after retry: {}",
                        e
                    ))
                })
            }
        }
    }
}

/// Canned extractor for demos and tests. Optionally fails its first N
/// calls to exercise the retry path, and counts invocations.
pub struct MockIntentExtractor {
    intent: Intent,
    fail_first: usize,
    calls: AtomicUsize,
}

impl MockIntentExtractor {
    pub fn returning(intent: Intent) -> Self {
        Self {
            intent,
            fail_first: 0,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_first(intent: Intent, fail_first: usize) -> Self {
        Self {
            intent,
            fail_first,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IntentExtractor for MockIntentExtractor {
    async fn extract_intent(&self, _query: &str) -> Result<Intent> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_first {
            return Err(PipelineError::CapabilityError(
                "simulated transport failure".to_string(),
            ));
        }
        Ok(self.intent.clone())
    }
}
