//! Perplexity Sonar API client
//!
//! Shared chat-completions client behind the reasoning and
//! summarization capabilities.
//! Uses a long-lived reqwest::Client for connection pooling.

use crate::error::PipelineError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

pub const DEFAULT_BASE_URL: &str = "https://api.perplexity.ai/chat/completions";
pub const DEFAULT_MODEL: &str = "sonar";

/// One capability reply: the model text plus whatever citations the
/// API attached to it.
#[derive(Debug, Clone)]
pub struct SonarReply {
    pub content: String,
    pub citations: Vec<String>,
}

/// Reusable Sonar client (connection-pooled)
pub struct SonarClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl SonarClient {
    pub fn new(api_key: String) -> Self {
        Self::with_config(
            api_key,
            DEFAULT_BASE_URL.to_string(),
            DEFAULT_MODEL.to_string(),
        )
    }

    pub fn with_config(api_key: String, base_url: String, model: String) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            base_url,
            model,
        }
    }

    /// Send one system + user exchange and return the reply.
    pub async fn generate(&self, system_prompt: &str, user_text: &str) -> crate::Result<SonarReply> {
        if self.api_key.is_empty() {
            return Err(PipelineError::CapabilityError(
                "SONAR_API_KEY not configured".to_string(),
            ));
        }

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_text.to_string(),
                },
            ],
            temperature: 0.2,
            max_tokens: 1024,
        };

        info!(model = %self.model, "Calling Sonar API");

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Sonar API request failed: {}", e);
                PipelineError::CapabilityError(format!("Sonar API error: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Sonar API error response ({}): {}", status, error_text);
            return Err(PipelineError::CapabilityError(format!(
                "Sonar API returned {}: {}",
                status, error_text
            )));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Sonar response: {}", e);
            PipelineError::CapabilityError(format!("Sonar parse error: {}", e))
        })?;

        let content = chat_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| {
                PipelineError::CapabilityError("No choices in Sonar response".to_string())
            })?;

        info!(
            citations = chat_response.citations.len(),
            chars = content.len(),
            "Sonar response received"
        );

        Ok(SonarReply {
            content,
            citations: chat_response.citations,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    citations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    #[allow(dead_code)]
    finish_reason: Option<String>,
}
