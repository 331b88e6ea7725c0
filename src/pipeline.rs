//! End-to-end analysis pipeline
//!
//! Query → intent resolution → (direct answer | pillar mapping →
//! concurrent fetch → enrichment → formatting). Only intent
//! resolution failure and a fully-empty gather reach the caller as
//! errors; everything below the pillar level degrades in place.

use crate::enrich::Enricher;
use crate::error::PipelineError;
use crate::fetch::FetchOrchestrator;
use crate::intent::IntentResolver;
use crate::models::{AnalysisOutcome, DirectAnswer, InsightBlock, Query};
use crate::pillars::{map_pillars, Pillar};
use crate::Result;
use tracing::{info, warn};

pub struct AnalysisPipeline {
    resolver: IntentResolver,
    orchestrator: FetchOrchestrator,
    enricher: Enricher,
}

impl AnalysisPipeline {
    pub fn new(
        resolver: IntentResolver,
        orchestrator: FetchOrchestrator,
        enricher: Enricher,
    ) -> Self {
        Self {
            resolver,
            orchestrator,
            enricher,
        }
    }

    pub async fn analyze(&self, query: Query) -> Result<AnalysisOutcome> {
        if query.text.trim().is_empty() {
            return Err(PipelineError::EmptyQuery);
        }

        info!(request_id = %query.request_id, "Pipeline started");

        let intent = self.resolver.resolve(&query).await?;

        if intent.is_low_context {
            info!(request_id = %query.request_id, "Direct answer short-circuit");
            return Ok(AnalysisOutcome::Direct(DirectAnswer {
                request_id: query.request_id,
                answer: intent.answer.clone().unwrap_or_default(),
                citations: intent.citations.clone(),
            }));
        }

        let pillars = map_pillars(&intent);
        info!(
            request_id = %query.request_id,
            pillars = ?pillars.iter().map(|p| p.name).collect::<Vec<_>>(),
            "Pillars mapped"
        );

        let gathered = self.orchestrator.gather(&pillars, &intent).await;
        if gathered.is_empty() {
            warn!(request_id = %query.request_id, "No pillar produced data");
            return Err(PipelineError::AnalysisUnavailable(
                "no pillar completed within the deadline".to_string(),
            ));
        }

        let mut blocks: Vec<(&'static Pillar, InsightBlock)> = Vec::with_capacity(gathered.len());
        for pillar in &pillars {
            if let Some(results) = gathered.get(pillar.name) {
                let block = self.enricher.enrich(pillar, results).await;
                blocks.push((pillar, block));
            }
        }

        let response = crate::format::format_response(query.request_id, &intent, blocks);
        info!(
            request_id = %query.request_id,
            blocks = response.blocks.len(),
            "Pipeline complete"
        );
        Ok(AnalysisOutcome::Analysis(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::FallbackChain;
    use crate::config::PipelineConfig;
    use crate::connectors::{ConnectorError, StubConnector};
    use crate::enrich::MockSummarizer;
    use crate::intent::{IntentResolver, MockIntentExtractor};
    use crate::models::{BlockStatus, DataCategory, Intent, ProviderPayload, SeriesPoint};
    use std::sync::Arc;
    use std::time::Duration;

    struct Stubs {
        price: Arc<StubConnector>,
        news: Arc<StubConnector>,
        trend: Arc<StubConnector>,
    }

    fn payload(day: &str, y: f64, texts: &[&str]) -> ProviderPayload {
        ProviderPayload {
            points: vec![SeriesPoint::new(day, y)],
            texts: texts.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn build_pipeline(
        intent: Intent,
        news_exhausted: bool,
    ) -> (AnalysisPipeline, Arc<MockIntentExtractor>, Arc<MockSummarizer>, Stubs) {
        let config = PipelineConfig {
            per_call_timeout: Duration::from_millis(100),
            global_deadline: Duration::from_secs(5),
            ..PipelineConfig::default()
        };

        let extractor = Arc::new(MockIntentExtractor::returning(intent));
        let resolver = IntentResolver::new(extractor.clone(), Duration::from_millis(1));

        let price = Arc::new(StubConnector::healthy(
            "stub-price",
            DataCategory::Price,
            payload("2026-08-03", 251.3, &[]),
        ));
        let news = Arc::new(if news_exhausted {
            StubConnector::failing(
                "stub-news",
                DataCategory::News,
                ConnectorError::Upstream("feed down".into()),
            )
        } else {
            StubConnector::healthy(
                "stub-news",
                DataCategory::News,
                payload("2026-08-02", 2.0, &["Tesla beats delivery estimates"]),
            )
        });
        let trend = Arc::new(StubConnector::healthy(
            "stub-trend",
            DataCategory::SearchTrend,
            payload("2026-08-01", 64.0, &[]),
        ));

        let chains = vec![
            FallbackChain::new(
                DataCategory::Price,
                vec![price.clone()],
                config.per_call_timeout,
            ),
            FallbackChain::new(
                DataCategory::News,
                vec![news.clone()],
                config.per_call_timeout,
            ),
            FallbackChain::new(
                DataCategory::SearchTrend,
                vec![trend.clone()],
                config.per_call_timeout,
            ),
        ];

        let orchestrator = FetchOrchestrator::new(chains, &config);
        let summarizer = Arc::new(MockSummarizer::healthy());
        let enricher = Enricher::new(summarizer.clone());

        (
            AnalysisPipeline::new(resolver, orchestrator, enricher),
            extractor,
            summarizer,
            Stubs { price, news, trend },
        )
    }

    fn tesla_intent() -> Intent {
        Intent::analysis(
            "Tesla",
            vec!["performance".to_string(), "sentiment".to_string()],
        )
        .with_ticker("TSLA")
    }

    #[tokio::test]
    async fn test_scenario_healthy_two_pillar_analysis() {
        let (pipeline, _, _, _) = build_pipeline(tesla_intent(), false);

        let outcome = pipeline
            .analyze(Query::new(
                "How is Tesla stock performing and what's the sentiment?",
            ))
            .await
            .unwrap();

        let AnalysisOutcome::Analysis(response) = outcome else {
            panic!("expected analysis outcome");
        };
        assert_eq!(response.intent.subject, "Tesla");

        let order: Vec<_> = response.blocks.iter().map(|b| b.pillar.as_str()).collect();
        assert_eq!(order, vec!["performance", "sentiment"]);
        assert!(response
            .blocks
            .iter()
            .all(|b| b.status == BlockStatus::Complete));
    }

    #[tokio::test]
    async fn test_scenario_news_exhaustion_degrades_sentiment_only() {
        let (pipeline, _, _, _) = build_pipeline(tesla_intent(), true);

        let outcome = pipeline
            .analyze(Query::new(
                "How is Tesla stock performing and what's the sentiment?",
            ))
            .await
            .unwrap();

        let AnalysisOutcome::Analysis(response) = outcome else {
            panic!("expected analysis outcome");
        };

        let performance = response
            .blocks
            .iter()
            .find(|b| b.pillar == "performance")
            .unwrap();
        let sentiment = response
            .blocks
            .iter()
            .find(|b| b.pillar == "sentiment")
            .unwrap();

        assert_eq!(performance.status, BlockStatus::Complete);
        assert_eq!(sentiment.status, BlockStatus::Partial);
        // Sentiment carries only the surviving search-trend points.
        assert_eq!(sentiment.data.len(), 1);
        assert_eq!(sentiment.data[0].y, 64.0);
    }

    #[tokio::test]
    async fn test_scenario_direct_answer_skips_fetch_and_summarize() {
        let intent = Intent::direct(
            "Apple",
            "Apple trades near $230.",
            vec!["https://example.com/quote".to_string()],
        );
        let (pipeline, extractor, summarizer, stubs) = build_pipeline(intent, false);

        let outcome = pipeline
            .analyze(Query::new("What is Apple's current stock price?"))
            .await
            .unwrap();

        let AnalysisOutcome::Direct(direct) = outcome else {
            panic!("expected direct answer");
        };
        assert_eq!(direct.answer, "Apple trades near $230.");
        assert_eq!(direct.citations.len(), 1);

        assert_eq!(extractor.calls(), 1);
        assert_eq!(summarizer.calls(), 0);
        assert_eq!(stubs.price.calls(), 0);
        assert_eq!(stubs.news.calls(), 0);
        assert_eq!(stubs.trend.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_query_rejected_before_resolution() {
        let (pipeline, extractor, _, _) = build_pipeline(tesla_intent(), false);

        let err = pipeline.analyze(Query::new("   ")).await.unwrap_err();
        assert!(matches!(err, PipelineError::EmptyQuery));
        assert_eq!(extractor.calls(), 0);
    }

    #[tokio::test]
    async fn test_all_pillars_failed_surfaces_unavailable() {
        let config = PipelineConfig {
            per_call_timeout: Duration::from_millis(50),
            global_deadline: Duration::from_secs(2),
            ..PipelineConfig::default()
        };
        let extractor = Arc::new(MockIntentExtractor::returning(
            Intent::analysis("Tesla", vec!["performance".to_string()]),
        ));
        let resolver = IntentResolver::new(extractor, Duration::from_millis(1));

        let chains = vec![FallbackChain::new(
            DataCategory::Price,
            vec![Arc::new(StubConnector::failing(
                "stub-price",
                DataCategory::Price,
                ConnectorError::Upstream("down".into()),
            )) as Arc<dyn crate::connectors::ProviderConnector>],
            config.per_call_timeout,
        )];
        let pipeline = AnalysisPipeline::new(
            resolver,
            FetchOrchestrator::new(chains, &config),
            Enricher::new(Arc::new(MockSummarizer::healthy())),
        );

        let err = pipeline
            .analyze(Query::new("How is Tesla performing?"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::AnalysisUnavailable(_)));
    }
}
