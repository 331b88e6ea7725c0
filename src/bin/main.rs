use market_insight_orchestrator::{
    chain::FallbackChain,
    config::PipelineConfig,
    connectors::{ConnectorError, ProviderConnector, StubConnector},
    enrich::{Enricher, MockSummarizer},
    fetch::FetchOrchestrator,
    intent::{IntentResolver, MockIntentExtractor},
    models::{AnalysisOutcome, DataCategory, Intent, ProviderPayload, Query, SeriesPoint},
    pipeline::AnalysisPipeline,
};
use std::sync::Arc;
use tracing::info;

fn payload(points: &[(&str, f64)], texts: &[&str]) -> ProviderPayload {
    ProviderPayload {
        points: points.iter().map(|(x, y)| SeriesPoint::new(*x, *y)).collect(),
        texts: texts.iter().map(|s| s.to_string()).collect(),
    }
}

fn build_pipeline(intent: Intent, break_news: bool) -> AnalysisPipeline {
    let config = PipelineConfig::default();

    let resolver = IntentResolver::new(
        Arc::new(MockIntentExtractor::returning(intent)),
        config.intent_retry_backoff,
    );

    let price: Vec<Arc<dyn ProviderConnector>> = vec![Arc::new(StubConnector::healthy(
        "stub-tiingo",
        DataCategory::Price,
        payload(
            &[("2026-08-01", 248.0), ("2026-08-04", 251.3), ("2026-08-05", 249.8)],
            &[],
        ),
    ))];

    let news: Vec<Arc<dyn ProviderConnector>> = if break_news {
        vec![
            Arc::new(StubConnector::failing(
                "stub-newsapi",
                DataCategory::News,
                ConnectorError::RateLimited("window spent".into()),
            )),
            Arc::new(StubConnector::failing(
                "stub-gdelt",
                DataCategory::News,
                ConnectorError::Upstream("feed down".into()),
            )),
        ]
    } else {
        vec![Arc::new(StubConnector::healthy(
            "stub-newsapi",
            DataCategory::News,
            payload(
                &[("2026-08-04", 2.0), ("2026-08-05", -1.0)],
                &["Tesla beats delivery estimates", "Recall chatter weighs on shares"],
            ),
        ))]
    };

    let trend: Vec<Arc<dyn ProviderConnector>> = vec![Arc::new(StubConnector::healthy(
        "stub-trends",
        DataCategory::SearchTrend,
        payload(&[("2026-07-27", 58.0), ("2026-08-03", 64.0)], &[]),
    ))];

    let chains = vec![
        FallbackChain::new(DataCategory::Price, price, config.per_call_timeout),
        FallbackChain::new(DataCategory::News, news, config.per_call_timeout),
        FallbackChain::new(DataCategory::SearchTrend, trend, config.per_call_timeout),
    ];

    AnalysisPipeline::new(
        resolver,
        FetchOrchestrator::new(chains, &config),
        Enricher::new(Arc::new(MockSummarizer::healthy())),
    )
}

fn print_outcome(outcome: &AnalysisOutcome) {
    match outcome {
        AnalysisOutcome::Analysis(response) => {
            println!("  subject: {}", response.intent.subject);
            for block in &response.blocks {
                println!(
                    "  [{:?}] {} ({} chart, {} points)",
                    block.status,
                    block.pillar,
                    block.metadata.visualization_type,
                    block.data.len()
                );
                println!("    insight: {}", block.insight);
            }
        }
        AnalysisOutcome::Direct(direct) => {
            println!("  direct answer: {}", direct.answer);
            for citation in &direct.citations {
                println!("    source: {}", citation);
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    dotenv::dotenv().ok();

    info!("Market insight pipeline walkthrough (stubbed providers)");

    let tesla = Intent::analysis(
        "Tesla",
        vec!["performance".to_string(), "sentiment".to_string()],
    )
    .with_ticker("TSLA");

    println!("\n=== Healthy two-pillar analysis ===");
    let outcome = build_pipeline(tesla.clone(), false)
        .analyze(Query::new(
            "How is Tesla stock performing and what's the sentiment?",
        ))
        .await?;
    print_outcome(&outcome);

    println!("\n=== News chain exhausted, sentiment degrades ===");
    let outcome = build_pipeline(tesla, true)
        .analyze(Query::new(
            "How is Tesla stock performing and what's the sentiment?",
        ))
        .await?;
    print_outcome(&outcome);

    println!("\n=== Low-context direct answer ===");
    let direct = Intent::direct(
        "Apple",
        "Apple trades near $230.",
        vec!["https://example.com/quote".to_string()],
    );
    let outcome = build_pipeline(direct, false)
        .analyze(Query::new("What is Apple's current stock price?"))
        .await?;
    print_outcome(&outcome);

    Ok(())
}
