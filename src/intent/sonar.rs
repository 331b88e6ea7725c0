//! Sonar-backed intent extraction
//!
//! One capability call classifies the query (analysis vs. direct
//! answer) and pulls out subject, focus areas, sector, and ticker.
//! A reachable capability that answers sloppily degrades to a default
//! analysis intent instead of failing the request; only transport
//! failure propagates.

use crate::intent::{IntentExtractor, DEFAULT_FOCUS_AREAS};
use crate::models::Intent;
use crate::sonar::SonarClient;
use crate::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

const INTENT_SYSTEM_PROMPT: &str = r#"You detect whether a financial query needs an analytical breakdown (performance, sentiment, market, adoption, competitor, contextual analysis) or is a factual question that can be answered directly with citations.
Also assign a sector from ['Technology', 'Healthcare', 'Financials', 'Energy', 'Consumer Discretionary', 'Industrials', 'Materials', 'Utilities', 'Real Estate', 'Communication Services'] when one applies.
Also assign a stock ticker to the subject if possible.
Respond ONLY in this strict JSON format:
{ "type": "analysis" or "direct_answer", "subject": "string", "focus": ["tag1", ...], "sector": "string", "ticker": "string", "answer": "..." }

Examples:
- "whats up with nvidia this week" -> {"type": "analysis", "subject": "Nvidia", "focus": ["news", "market"], "sector": "Technology", "ticker": "NVDA"}
- "what is the stock price of nvidia?" -> {"type": "direct_answer", "subject": "Nvidia", "focus": [], "sector": "Technology", "ticker": "NVDA", "answer": "Nvidia is trading at $X.XX"}"#;

#[derive(Debug, Deserialize)]
struct IntentWire {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    focus: Vec<String>,
    #[serde(default)]
    sector: String,
    #[serde(default)]
    ticker: String,
    #[serde(default)]
    answer: String,
}

pub struct SonarIntentExtractor {
    client: SonarClient,
}

impl SonarIntentExtractor {
    pub fn new(client: SonarClient) -> Self {
        Self { client }
    }

    fn default_intent(query: &str) -> Intent {
        Intent::analysis(
            query.trim(),
            DEFAULT_FOCUS_AREAS.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn build_intent(query: &str, wire: IntentWire, citations: Vec<String>) -> Intent {
        let subject = if wire.subject.trim().is_empty() {
            query.trim().to_string()
        } else {
            wire.subject.trim().to_string()
        };

        let mut intent = if wire.kind == "direct_answer" && !wire.answer.trim().is_empty() {
            Intent::direct(subject, wire.answer.trim(), citations)
        } else {
            let focus = if wire.focus.is_empty() {
                DEFAULT_FOCUS_AREAS.iter().map(|s| s.to_string()).collect()
            } else {
                wire.focus
            };
            Intent::analysis(subject, focus)
        };

        if !wire.ticker.trim().is_empty() {
            intent = intent.with_ticker(wire.ticker.trim());
        }
        if !wire.sector.trim().is_empty() {
            intent = intent.with_sector(wire.sector.trim());
        }
        intent
    }
}

/// Pull the outermost JSON object out of a model reply that may wrap
/// it in prose or a markdown fence.
fn extract_json_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end > start {
        Some(&content[start..=end])
    } else {
        None
    }
}

#[async_trait]
impl IntentExtractor for SonarIntentExtractor {
    async fn extract_intent(&self, query: &str) -> Result<Intent> {
        let reply = self.client.generate(INTENT_SYSTEM_PROMPT, query).await?;

        let parsed = extract_json_object(&reply.content)
            .and_then(|raw| serde_json::from_str::<IntentWire>(raw).ok());

        match parsed {
            Some(wire) => {
                debug!(kind = %wire.kind, subject = %wire.subject, "Parsed intent reply");
                Ok(Self::build_intent(query, wire, reply.citations))
            }
            None => {
                warn!(
                    chars = reply.content.len(),
                    "Intent reply was not parseable JSON, using default analysis intent"
                );
                Ok(Self::default_intent(query))
            }
        }
    }
}
