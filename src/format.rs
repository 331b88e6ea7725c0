//! Chart block formatter
//!
//! Assembles the final AnalysisResponse. Ordering comes from the
//! pillar catalog's declared priority, never from request timing, so
//! repeated calls over the same inputs are byte-identical. Pure; the
//! only failure mode would be a programming error upstream.

use crate::models::{AnalysisResponse, InsightBlock, Intent};
use crate::pillars::Pillar;
use uuid::Uuid;

pub fn format_response(
    request_id: Uuid,
    intent: &Intent,
    mut blocks: Vec<(&'static Pillar, InsightBlock)>,
) -> AnalysisResponse {
    blocks.sort_by_key(|(pillar, _)| (pillar.priority, pillar.name));

    AnalysisResponse {
        request_id,
        intent: intent.clone(),
        blocks: blocks.into_iter().map(|(_, block)| block).collect(),
    }
}
