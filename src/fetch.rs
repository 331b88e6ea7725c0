//! Fetch orchestrator
//!
//! Fans one request out into a task per (pillar, category) pair, each
//! running through its category's fallback chain, bounded by a global
//! concurrency cap and a global per-request deadline. Results land in
//! independent slots and are reconciled after everything settles;
//! sibling fetches share no mutable state.

use crate::chain::FallbackChain;
use crate::config::PipelineConfig;
use crate::connectors::FetchRequest;
use crate::models::{DataCategory, FailureReason, Intent, RawFetchResult};
use crate::pillars::Pillar;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tracing::{info, warn};

pub struct FetchOrchestrator {
    chains: HashMap<DataCategory, Arc<FallbackChain>>,
    semaphore: Arc<Semaphore>,
    global_deadline: Duration,
}

impl FetchOrchestrator {
    pub fn new(chains: Vec<FallbackChain>, config: &PipelineConfig) -> Self {
        Self {
            chains: chains
                .into_iter()
                .map(|c| (c.category(), Arc::new(c)))
                .collect(),
            semaphore: Arc::new(Semaphore::new(config.fetch_concurrency.max(1))),
            global_deadline: config.global_deadline,
        }
    }

    /// Dispatch every (pillar, category) fetch concurrently and wait
    /// for all of them to settle, or for the global deadline.
    ///
    /// On deadline, outstanding tasks are cancelled and whatever
    /// already settled is used as-is. Pillars whose every required
    /// category failed are dropped from the mapping entirely.
    pub async fn gather(
        &self,
        pillars: &[&'static Pillar],
        intent: &Intent,
    ) -> HashMap<&'static str, Vec<RawFetchResult>> {
        let request = Arc::new(FetchRequest::from_intent(intent));
        let started = Instant::now();

        let (tx, mut rx) = mpsc::unbounded_channel::<(&'static str, RawFetchResult)>();
        let mut handles = Vec::new();
        let mut expected = 0usize;

        for pillar in pillars {
            for category in pillar.categories {
                expected += 1;
                let Some(chain) = self.chains.get(category).cloned() else {
                    // No chain wired for this category; record it as a
                    // settled failure rather than silently skipping.
                    let _ = tx.send((
                        pillar.name,
                        RawFetchResult::failure(
                            *category,
                            None,
                            FailureReason::AllProvidersExhausted(format!(
                                "no chain configured for {}",
                                category
                            )),
                            Duration::ZERO,
                        ),
                    ));
                    continue;
                };

                let semaphore = self.semaphore.clone();
                let request = request.clone();
                let tx = tx.clone();
                let pillar_name = pillar.name;

                handles.push(tokio::spawn(async move {
                    // Closed semaphore cannot happen; treat it as a
                    // cancelled slot and let the deadline account for it.
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return;
                    };
                    let result = chain.fetch(&request).await;
                    let _ = tx.send((pillar_name, result));
                }));
            }
        }
        drop(tx);

        let mut slots: Vec<(&'static str, RawFetchResult)> = Vec::with_capacity(expected);
        let collect = async {
            while slots.len() < expected {
                match rx.recv().await {
                    Some(slot) => slots.push(slot),
                    None => break,
                }
            }
        };

        if tokio::time::timeout(self.global_deadline, collect).await.is_err() {
            warn!(
                settled = slots.len(),
                expected,
                deadline_ms = self.global_deadline.as_millis() as u64,
                "Global deadline elapsed, cancelling outstanding fetches"
            );
            for handle in &handles {
                handle.abort();
            }
            // Anything that settled while we were timing out still counts.
            while let Ok(slot) = rx.try_recv() {
                slots.push(slot);
            }
        }

        let mut grouped: HashMap<&'static str, Vec<RawFetchResult>> = HashMap::new();
        for (pillar_name, result) in slots {
            grouped.entry(pillar_name).or_default().push(result);
        }

        // Deterministic per-pillar ordering regardless of settle order.
        for results in grouped.values_mut() {
            results.sort_by_key(|r| r.category.to_string());
        }

        grouped.retain(|pillar_name, results| {
            let any_success = results.iter().any(|r| r.is_success());
            if !any_success {
                warn!(pillar = pillar_name, "Excluding pillar: every category failed");
            }
            any_success
        });

        info!(
            pillars = grouped.len(),
            fetches = expected,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Gather complete"
        );

        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::{ConnectorError, StubConnector};
    use crate::models::{ProviderPayload, SeriesPoint};
    use crate::pillars::pillar_by_name;

    fn payload(y: f64) -> ProviderPayload {
        ProviderPayload::from_points(vec![SeriesPoint::new("2026-08-03", y)])
    }

    fn config(deadline: Duration) -> PipelineConfig {
        PipelineConfig {
            per_call_timeout: Duration::from_millis(100),
            global_deadline: deadline,
            fetch_concurrency: 4,
            ..PipelineConfig::default()
        }
    }

    fn chain(category: DataCategory, connector: StubConnector) -> FallbackChain {
        FallbackChain::new(category, vec![Arc::new(connector)], Duration::from_millis(100))
    }

    fn intent() -> Intent {
        Intent::analysis(
            "Tesla",
            vec!["performance".to_string(), "sentiment".to_string()],
        )
    }

    #[tokio::test]
    async fn test_gathers_all_categories_per_pillar() {
        let orchestrator = FetchOrchestrator::new(
            vec![
                chain(
                    DataCategory::Price,
                    StubConnector::healthy("price", DataCategory::Price, payload(250.0)),
                ),
                chain(
                    DataCategory::News,
                    StubConnector::healthy("news", DataCategory::News, payload(2.0)),
                ),
                chain(
                    DataCategory::SearchTrend,
                    StubConnector::healthy("trend", DataCategory::SearchTrend, payload(60.0)),
                ),
            ],
            &config(Duration::from_secs(5)),
        );

        let pillars = vec![
            pillar_by_name("performance").unwrap(),
            pillar_by_name("sentiment").unwrap(),
        ];
        let gathered = orchestrator.gather(&pillars, &intent()).await;

        assert_eq!(gathered.len(), 2);
        assert_eq!(gathered["performance"].len(), 1);
        // Sentiment needs news + searchTrend.
        assert_eq!(gathered["sentiment"].len(), 2);
        assert!(gathered["sentiment"].iter().all(|r| r.is_success()));
    }

    #[tokio::test]
    async fn test_category_failure_does_not_abort_siblings() {
        let orchestrator = FetchOrchestrator::new(
            vec![
                chain(
                    DataCategory::Price,
                    StubConnector::healthy("price", DataCategory::Price, payload(250.0)),
                ),
                chain(
                    DataCategory::News,
                    StubConnector::failing(
                        "news",
                        DataCategory::News,
                        ConnectorError::Upstream("feed down".into()),
                    ),
                ),
                chain(
                    DataCategory::SearchTrend,
                    StubConnector::healthy("trend", DataCategory::SearchTrend, payload(60.0)),
                ),
            ],
            &config(Duration::from_secs(5)),
        );

        let pillars = vec![
            pillar_by_name("performance").unwrap(),
            pillar_by_name("sentiment").unwrap(),
        ];
        let gathered = orchestrator.gather(&pillars, &intent()).await;

        let sentiment = &gathered["sentiment"];
        assert_eq!(sentiment.len(), 2);
        assert_eq!(sentiment.iter().filter(|r| r.is_success()).count(), 1);
        assert!(gathered["performance"][0].is_success());
    }

    #[tokio::test]
    async fn test_pillar_with_all_categories_failed_is_excluded() {
        let orchestrator = FetchOrchestrator::new(
            vec![
                chain(
                    DataCategory::Price,
                    StubConnector::healthy("price", DataCategory::Price, payload(1.0)),
                ),
                chain(
                    DataCategory::SearchTrend,
                    StubConnector::failing(
                        "trend",
                        DataCategory::SearchTrend,
                        ConnectorError::RateLimited("spent".into()),
                    ),
                ),
            ],
            &config(Duration::from_secs(5)),
        );

        let pillars = vec![
            pillar_by_name("performance").unwrap(),
            pillar_by_name("interest").unwrap(),
        ];
        let gathered = orchestrator.gather(&pillars, &intent()).await;

        assert!(gathered.contains_key("performance"));
        assert!(!gathered.contains_key("interest"));
    }

    #[tokio::test]
    async fn test_returns_within_global_deadline_despite_hang() {
        let orchestrator = FetchOrchestrator::new(
            vec![
                chain(
                    DataCategory::Price,
                    StubConnector::healthy("price", DataCategory::Price, payload(1.0)),
                ),
                FallbackChain::new(
                    DataCategory::SearchTrend,
                    vec![Arc::new(StubConnector::hanging(
                        "stuck",
                        DataCategory::SearchTrend,
                    ))],
                    // Chain budget longer than the global deadline so
                    // the deadline is what fires.
                    Duration::from_secs(30),
                ),
            ],
            &config(Duration::from_millis(200)),
        );

        let pillars = vec![
            pillar_by_name("performance").unwrap(),
            pillar_by_name("interest").unwrap(),
        ];

        let started = Instant::now();
        let gathered = orchestrator.gather(&pillars, &intent()).await;

        assert!(started.elapsed() < Duration::from_secs(2));
        // The settled pillar survives; the hung one never produced a slot.
        assert!(gathered.contains_key("performance"));
        assert!(!gathered.contains_key("interest"));
    }

    #[tokio::test]
    async fn test_missing_chain_recorded_as_failure() {
        let orchestrator = FetchOrchestrator::new(
            vec![chain(
                DataCategory::Price,
                StubConnector::healthy("price", DataCategory::Price, payload(1.0)),
            )],
            &config(Duration::from_secs(5)),
        );

        // Overview needs price + news; no news chain is wired.
        let pillars = vec![pillar_by_name("overview").unwrap()];
        let gathered = orchestrator.gather(&pillars, &intent()).await;

        let results = &gathered["overview"];
        assert_eq!(results.len(), 2);
        let news = results
            .iter()
            .find(|r| r.category == DataCategory::News)
            .unwrap();
        assert!(matches!(
            news.failure_reason,
            Some(FailureReason::AllProvidersExhausted(_))
        ));
    }
}
