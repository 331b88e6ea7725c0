//! Fallback chain
//!
//! One ordered connector list per data category plus the switch-over
//! policy. Provider-availability failures (rate limit, timeout,
//! upstream errors) advance the chain; a client-caused failure stops
//! it immediately so a bad subject is never masked by trying more
//! vendors.

use crate::connectors::{FetchRequest, ProviderConnector};
use crate::models::{DataCategory, FailureReason, RawFetchResult};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub struct FallbackChain {
    category: DataCategory,
    connectors: Vec<Arc<dyn ProviderConnector>>,
    per_call_timeout: Duration,
}

impl FallbackChain {
    pub fn new(
        category: DataCategory,
        connectors: Vec<Arc<dyn ProviderConnector>>,
        per_call_timeout: Duration,
    ) -> Self {
        Self {
            category,
            connectors,
            per_call_timeout,
        }
    }

    pub fn category(&self) -> DataCategory {
        self.category
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.connectors.iter().map(|c| c.name()).collect()
    }

    /// Cumulative budget for one pass through the chain: the sum of
    /// per-call timeouts across its connectors.
    pub fn chain_deadline(&self) -> Duration {
        self.per_call_timeout * self.connectors.len().max(1) as u32
    }

    /// Walk the chain until a connector answers, a non-retryable
    /// failure surfaces, or the budget runs out. Always produces a
    /// RawFetchResult; chain-level failure is data, not an error.
    pub async fn fetch(&self, request: &FetchRequest) -> RawFetchResult {
        let started = Instant::now();
        let deadline = self.chain_deadline();
        let mut last_error = format!("no providers configured for {}", self.category);

        for connector in &self.connectors {
            let remaining = deadline.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                warn!(
                    category = %self.category,
                    "Chain budget spent with connectors remaining"
                );
                break;
            }

            let call_budget = remaining.min(self.per_call_timeout);
            let attempt_started = Instant::now();

            // A timed-out future is dropped here, which cancels the
            // in-flight call and releases its pooled connection.
            let outcome = tokio::time::timeout(call_budget, connector.fetch(request)).await;

            match outcome {
                Ok(Ok(payload)) => {
                    debug!(
                        category = %self.category,
                        provider = connector.name(),
                        points = payload.points.len(),
                        latency_ms = attempt_started.elapsed().as_millis() as u64,
                        "Connector succeeded"
                    );
                    return RawFetchResult::success(
                        self.category,
                        connector.name(),
                        payload,
                        started.elapsed(),
                    );
                }
                Ok(Err(err)) if !err.retryable() => {
                    warn!(
                        category = %self.category,
                        provider = connector.name(),
                        error = %err,
                        "Non-retryable failure, stopping chain"
                    );
                    return RawFetchResult::failure(
                        self.category,
                        Some(connector.name().to_string()),
                        FailureReason::InvalidSubject(err.to_string()),
                        started.elapsed(),
                    );
                }
                Ok(Err(err)) => {
                    warn!(
                        category = %self.category,
                        provider = connector.name(),
                        error = %err,
                        "Connector failed, falling back"
                    );
                    last_error = err.to_string();
                }
                Err(_) => {
                    warn!(
                        category = %self.category,
                        provider = connector.name(),
                        budget_ms = call_budget.as_millis() as u64,
                        "Connector timed out, falling back"
                    );
                    last_error = format!("{} timed out", connector.name());
                }
            }
        }

        RawFetchResult::failure(
            self.category,
            None,
            FailureReason::AllProvidersExhausted(last_error),
            started.elapsed(),
        )
    }
}
