//! REST API server for the market insight pipeline
//!
//! Thin transport shell over `AnalysisPipeline`. Partial analyses are
//! still HTTP success; only empty input, intent-resolution failure,
//! and a fully-empty gather map to structured error codes.

use axum::{extract::State, http::StatusCode, routing::get, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::error::PipelineError;
use crate::models::Query;
use crate::pillars::CATALOG;
use crate::pipeline::AnalysisPipeline;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<ApiError>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(code: &str, message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.to_string(),
                message,
            }),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub pipeline: Arc<AnalysisPipeline>,
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn list_pillars() -> Json<ApiResponse> {
    Json(ApiResponse::success(CATALOG))
}

fn map_error(e: PipelineError) -> (StatusCode, Json<ApiResponse>) {
    let (status, code) = match &e {
        PipelineError::EmptyQuery => (StatusCode::BAD_REQUEST, "EMPTY_QUERY"),
        PipelineError::IntentResolutionError(_) => {
            (StatusCode::UNPROCESSABLE_ENTITY, "INTENT_RESOLUTION_FAILED")
        }
        PipelineError::AnalysisUnavailable(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, "ANALYSIS_UNAVAILABLE")
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    };
    (status, Json(ApiResponse::error(code, e.to_string())))
}

async fn analyze(
    State(state): State<ApiState>,
    Json(req): Json<AnalyzeRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let query = Query::new(req.query);
    info!(request_id = %query.request_id, "Received analyze request");

    match state.pipeline.analyze(query).await {
        Ok(outcome) => (StatusCode::OK, Json(ApiResponse::success(outcome))),
        Err(e) => map_error(e),
    }
}

pub fn create_router(pipeline: Arc<AnalysisPipeline>) -> Router {
    let state = ApiState { pipeline };

    Router::new()
        .route("/health", get(health))
        .route("/api/pillars", get(list_pillars))
        .route("/api/analyze", post(analyze))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

pub async fn start_server(
    pipeline: Arc<AnalysisPipeline>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(pipeline);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API server listening on http://0.0.0.0:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
