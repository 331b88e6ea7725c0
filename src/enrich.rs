//! Merger/enricher
//!
//! Folds a pillar's raw fetch results into one chart-ready block:
//! merged, chronologically sorted series plus narrative insight from
//! the summarization capability. Summarization failure degrades the
//! block to Partial with a placeholder; it never fails the request.

use crate::models::{BlockStatus, ChartMetadata, InsightBlock, RawFetchResult, SeriesPoint};
use crate::pillars::Pillar;
use crate::sonar::SonarClient;
use crate::Result;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;
use tracing::{info, warn};

const SUMMARY_SYSTEM_PROMPT: &str =
    "You are a financial analyst. Write one short, concrete paragraph. Be specific; no hedging boilerplate.";

/// Summarization capability seam.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, texts: &[String], instruction: &str) -> Result<String>;
}

pub struct SonarSummarizer {
    client: SonarClient,
}

impl SonarSummarizer {
    pub fn new(client: SonarClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Summarizer for SonarSummarizer {
    async fn summarize(&self, texts: &[String], instruction: &str) -> Result<String> {
        let user_text = format!("{}\n\nMATERIAL:\n{}", instruction, texts.join("\n"));
        let reply = self.client.generate(SUMMARY_SYSTEM_PROMPT, &user_text).await?;
        Ok(reply.content)
    }
}

/// Canned summarizer for demos and tests.
pub struct MockSummarizer {
    fail: bool,
    calls: AtomicUsize,
}

impl MockSummarizer {
    pub fn healthy() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(AtomicOrdering::SeqCst)
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, texts: &[String], _instruction: &str) -> Result<String> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        if self.fail {
            return Err(crate::error::PipelineError::SummarizationError(
                "simulated summarizer outage".to_string(),
            ));
        }
        Ok(format!("Summary over {} source lines.", texts.len()))
    }
}

pub struct Enricher {
    summarizer: Arc<dyn Summarizer>,
}

impl Enricher {
    pub fn new(summarizer: Arc<dyn Summarizer>) -> Self {
        Self { summarizer }
    }

    /// Build one InsightBlock from whatever this pillar's fetches
    /// produced. Complete only when every required category succeeded
    /// and summarization succeeded.
    pub async fn enrich(&self, pillar: &Pillar, results: &[RawFetchResult]) -> InsightBlock {
        let data = merge_series(results);
        let mut texts = collect_texts(results);

        let all_categories_ok = pillar.categories.iter().all(|category| {
            results
                .iter()
                .any(|r| r.category == *category && r.is_success())
        });

        if data.is_empty() && texts.is_empty() {
            // Callers drop fully-failed pillars before enrichment; a
            // block this empty still must not pretend to be usable.
            return InsightBlock {
                pillar: pillar.name.to_string(),
                metadata: metadata_for(pillar),
                data,
                insight: placeholder_insight(pillar),
                status: BlockStatus::Failed,
            };
        }

        if texts.is_empty() {
            texts.push(describe_series(pillar, &data));
        }

        let (insight, summarized) = match self
            .summarizer
            .summarize(&texts, pillar.summary_instruction)
            .await
        {
            Ok(text) => (text, true),
            Err(e) => {
                warn!(pillar = pillar.name, error = %e, "Summarization failed, using placeholder");
                (placeholder_insight(pillar), false)
            }
        };

        let status = if all_categories_ok && summarized {
            BlockStatus::Complete
        } else {
            BlockStatus::Partial
        };

        info!(
            pillar = pillar.name,
            points = data.len(),
            status = ?status,
            "Block enriched"
        );

        InsightBlock {
            pillar: pillar.name.to_string(),
            metadata: metadata_for(pillar),
            data,
            insight,
            status,
        }
    }
}

fn metadata_for(pillar: &Pillar) -> ChartMetadata {
    ChartMetadata {
        visualization_type: pillar.visualization_type.to_string(),
        x_key: pillar.x_key.to_string(),
        y_key: pillar.y_key.to_string(),
    }
}

fn placeholder_insight(pillar: &Pillar) -> String {
    format!(
        "No narrative insight is available for {} right now; the chart reflects the fetched data.",
        pillar.name
    )
}

/// Concatenate points from every successful category and sort them
/// chronologically. The x key is an ISO date, so lexicographic order
/// is date order; ties break on y to keep the merge deterministic.
fn merge_series(results: &[RawFetchResult]) -> Vec<SeriesPoint> {
    let mut points: Vec<SeriesPoint> = results
        .iter()
        .filter_map(|r| r.payload.as_ref())
        .flat_map(|p| p.points.iter().cloned())
        .collect();

    points.sort_by(|a, b| {
        a.x.cmp(&b.x)
            .then_with(|| a.y.partial_cmp(&b.y).unwrap_or(Ordering::Equal))
    });
    points
}

fn collect_texts(results: &[RawFetchResult]) -> Vec<String> {
    results
        .iter()
        .filter_map(|r| r.payload.as_ref())
        .flat_map(|p| p.texts.iter().cloned())
        .collect()
}

/// Textual stand-in for pillars whose categories carry no prose, so
/// the summarizer still has something concrete to work from.
fn describe_series(pillar: &Pillar, data: &[SeriesPoint]) -> String {
    match (data.first(), data.last()) {
        (Some(first), Some(last)) => format!(
            "{} series with {} points: {} at {}, {} at {}.",
            pillar.name,
            data.len(),
            first.y,
            first.x,
            last.y,
            last.x
        ),
        _ => format!("{} series is empty.", pillar.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataCategory, FailureReason, ProviderPayload};
    use crate::pillars::pillar_by_name;
    use std::time::Duration;

    fn success(category: DataCategory, points: Vec<SeriesPoint>, texts: Vec<&str>) -> RawFetchResult {
        RawFetchResult::success(
            category,
            "stub",
            ProviderPayload {
                points,
                texts: texts.into_iter().map(String::from).collect(),
            },
            Duration::from_millis(10),
        )
    }

    fn failure(category: DataCategory) -> RawFetchResult {
        RawFetchResult::failure(
            category,
            None,
            FailureReason::AllProvidersExhausted("down".to_string()),
            Duration::from_millis(10),
        )
    }

    #[tokio::test]
    async fn test_complete_block_when_everything_succeeds() {
        let enricher = Enricher::new(Arc::new(MockSummarizer::healthy()));
        let pillar = pillar_by_name("sentiment").unwrap();
        let results = vec![
            success(
                DataCategory::News,
                vec![SeriesPoint::new("2026-08-02", 3.0)],
                vec!["Tesla beats delivery estimates"],
            ),
            success(
                DataCategory::SearchTrend,
                vec![SeriesPoint::new("2026-08-01", 55.0)],
                vec![],
            ),
        ];

        let block = enricher.enrich(pillar, &results).await;
        assert_eq!(block.status, BlockStatus::Complete);
        assert_eq!(block.metadata.visualization_type, "bar");
        // Merged and chronologically sorted across categories.
        assert_eq!(block.data[0].x, "2026-08-01");
        assert_eq!(block.data[1].x, "2026-08-02");
    }

    #[tokio::test]
    async fn test_partial_when_one_category_failed() {
        let enricher = Enricher::new(Arc::new(MockSummarizer::healthy()));
        let pillar = pillar_by_name("sentiment").unwrap();
        let results = vec![
            success(
                DataCategory::News,
                vec![SeriesPoint::new("2026-08-02", -1.0)],
                vec!["Recall chatter weighs on Tesla"],
            ),
            failure(DataCategory::SearchTrend),
        ];

        let block = enricher.enrich(pillar, &results).await;
        assert_eq!(block.status, BlockStatus::Partial);
        // Only the surviving category contributes points.
        assert_eq!(block.data.len(), 1);
        assert_eq!(block.data[0].y, -1.0);
    }

    #[tokio::test]
    async fn test_summarizer_failure_degrades_to_partial_with_placeholder() {
        let summarizer = Arc::new(MockSummarizer::failing());
        let enricher = Enricher::new(summarizer.clone());
        let pillar = pillar_by_name("performance").unwrap();
        let results = vec![success(
            DataCategory::Price,
            vec![
                SeriesPoint::new("2026-08-01", 248.0),
                SeriesPoint::new("2026-08-02", 251.0),
            ],
            vec![],
        )];

        let block = enricher.enrich(pillar, &results).await;
        assert_eq!(block.status, BlockStatus::Partial);
        assert!(block.insight.contains("performance"));
        assert_eq!(summarizer.calls(), 1);
        assert_eq!(block.data.len(), 2);
    }

    #[tokio::test]
    async fn test_merge_is_deterministic() {
        let enricher = Enricher::new(Arc::new(MockSummarizer::healthy()));
        let pillar = pillar_by_name("overview").unwrap();
        let results = vec![
            success(
                DataCategory::News,
                vec![
                    SeriesPoint::new("2026-08-02", 2.0),
                    SeriesPoint::new("2026-08-01", 1.0),
                ],
                vec!["headline"],
            ),
            success(
                DataCategory::Price,
                vec![SeriesPoint::new("2026-08-01", 0.5)],
                vec![],
            ),
        ];

        let a = enricher.enrich(pillar, &results).await;
        let b = enricher.enrich(pillar, &results).await;
        assert_eq!(a.data, b.data);
        assert_eq!(
            a.data,
            vec![
                SeriesPoint::new("2026-08-01", 0.5),
                SeriesPoint::new("2026-08-01", 1.0),
                SeriesPoint::new("2026-08-02", 2.0),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_results_yield_failed_block() {
        let enricher = Enricher::new(Arc::new(MockSummarizer::healthy()));
        let pillar = pillar_by_name("interest").unwrap();

        let block = enricher.enrich(pillar, &[failure(DataCategory::SearchTrend)]).await;
        assert_eq!(block.status, BlockStatus::Failed);
        assert!(block.data.is_empty());
    }
}
