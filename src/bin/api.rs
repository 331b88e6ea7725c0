use market_insight_orchestrator::{
    api::start_server,
    config::PipelineConfig,
    connectors::create_default_chains,
    enrich::{Enricher, SonarSummarizer},
    fetch::FetchOrchestrator,
    intent::{IntentResolver, SonarIntentExtractor},
    pipeline::AnalysisPipeline,
    sonar::{SonarClient, DEFAULT_BASE_URL, DEFAULT_MODEL},
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn sonar_client() -> SonarClient {
    let api_key = std::env::var("SONAR_API_KEY").unwrap_or_else(|_| {
        warn!("SONAR_API_KEY not set; capability calls will fail until configured");
        String::new()
    });
    let base_url =
        std::env::var("SONAR_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    let model = std::env::var("SONAR_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

    SonarClient::with_config(api_key, base_url, model)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    dotenv::dotenv().ok();

    let config = PipelineConfig::from_env();
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()?;

    info!(port, "Market Insight Orchestrator - API server");

    let resolver = IntentResolver::new(
        Arc::new(SonarIntentExtractor::new(sonar_client())),
        config.intent_retry_backoff,
    );
    let orchestrator = FetchOrchestrator::new(create_default_chains(&config), &config);
    let enricher = Enricher::new(Arc::new(SonarSummarizer::new(sonar_client())));

    let pipeline = Arc::new(AnalysisPipeline::new(resolver, orchestrator, enricher));

    info!("Pipeline initialized, starting server");

    start_server(pipeline, port).await?;

    Ok(())
}
