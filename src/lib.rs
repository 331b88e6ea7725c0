//! Market Insight Orchestrator
//!
//! Turns a freeform financial query into chart-ready insight blocks:
//!
//! QUERY → INTENT → PILLARS → PARALLEL FETCH (with fallback) →
//! ENRICH → FORMAT
//!
//! - Intent resolution and summarization ride an external reasoning
//!   capability behind trait seams
//! - Each data category has an ordered fallback chain of rate-limited
//!   provider connectors
//! - Failures below the pillar level degrade block status instead of
//!   failing the request

pub mod api;
pub mod chain;
pub mod config;
pub mod connectors;
pub mod enrich;
pub mod error;
pub mod fetch;
pub mod format;
pub mod intent;
pub mod models;
pub mod pillars;
pub mod pipeline;
pub mod quota;
pub mod sonar;

pub use error::{PipelineError, Result};

// Re-export common types
pub use models::*;
pub use pillars::{map_pillars, Pillar, CATALOG};
pub use pipeline::AnalysisPipeline;
