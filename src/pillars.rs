//! Pillar catalog and mapper
//!
//! A pillar is one analytical dimension of a query: which data
//! categories it needs, what chart shape it renders as, and where it
//! sits in the response ordering. The catalog is static; mapping from
//! focus areas to pillars is a pure lookup.

use crate::models::{DataCategory, Intent};
use lazy_static::lazy_static;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pillar {
    pub name: &'static str,
    pub priority: u32,
    pub categories: &'static [DataCategory],
    pub visualization_type: &'static str,
    pub x_key: &'static str,
    pub y_key: &'static str,
    #[serde(skip)]
    pub focus_tags: &'static [&'static str],
    /// One-line steer for the summarization capability so insight text
    /// stays on-pillar.
    #[serde(skip)]
    pub summary_instruction: &'static str,
}

pub static CATALOG: &[Pillar] = &[
    Pillar {
        name: "overview",
        priority: 10,
        categories: &[DataCategory::Price, DataCategory::News],
        visualization_type: "line",
        x_key: "date",
        y_key: "close",
        focus_tags: &["overview", "contextual", "general", "summary"],
        summary_instruction:
            "Give a short overall picture of the subject: where it stands and what matters right now.",
    },
    Pillar {
        name: "performance",
        priority: 20,
        categories: &[DataCategory::Price],
        visualization_type: "line",
        x_key: "date",
        y_key: "close",
        focus_tags: &[
            "performance",
            "financial",
            "price",
            "stock",
            "earnings",
            "growth",
        ],
        summary_instruction:
            "Summarize recent price action and momentum: direction, magnitude, and notable swings.",
    },
    Pillar {
        name: "sentiment",
        priority: 30,
        categories: &[DataCategory::News, DataCategory::SearchTrend],
        visualization_type: "bar",
        x_key: "date",
        y_key: "score",
        focus_tags: &["sentiment", "news", "headlines", "buzz", "opinion"],
        summary_instruction:
            "Summarize the tone of recent coverage and what is driving it, citing concrete headlines.",
    },
    Pillar {
        name: "interest",
        priority: 40,
        categories: &[DataCategory::SearchTrend],
        visualization_type: "line",
        x_key: "date",
        y_key: "interest",
        focus_tags: &["adoption", "interest", "popularity", "demand", "trend"],
        summary_instruction:
            "Describe how public interest and adoption signals have moved and whether attention is building or fading.",
    },
    Pillar {
        name: "sector",
        priority: 50,
        categories: &[DataCategory::Sector],
        visualization_type: "line",
        x_key: "date",
        y_key: "typical",
        focus_tags: &["market", "sector", "industry", "competitor", "competitors"],
        summary_instruction:
            "Place the subject in its sector context: how the sector is trending and how the subject compares.",
    },
];

/// Name of the pillar returned when nothing maps.
pub const DEFAULT_PILLAR: &str = "overview";

lazy_static! {
    static ref FOCUS_INDEX: HashMap<&'static str, &'static Pillar> = {
        let mut index = HashMap::new();
        for pillar in CATALOG {
            for tag in pillar.focus_tags {
                index.insert(*tag, pillar);
            }
        }
        index
    };
    static ref BY_NAME: HashMap<&'static str, &'static Pillar> =
        CATALOG.iter().map(|p| (p.name, p)).collect();
}

pub fn pillar_by_name(name: &str) -> Option<&'static Pillar> {
    BY_NAME.get(name).copied()
}

/// Map the intent's focus areas onto the pillar set.
///
/// Deterministic and order-independent: the result depends only on
/// which tags are present, not on their sequence. Unknown tags are
/// dropped with a warning. An empty or fully-unknown focus list maps
/// to the default pillar so the response always carries at least one
/// block.
pub fn map_pillars(intent: &Intent) -> Vec<&'static Pillar> {
    let mut names: BTreeSet<&'static str> = BTreeSet::new();

    for area in &intent.focus_areas {
        let tag = area.trim().to_lowercase();
        match FOCUS_INDEX.get(tag.as_str()) {
            Some(pillar) => {
                names.insert(pillar.name);
            }
            None => {
                warn!(focus = %area, "Dropping unmapped focus area");
            }
        }
    }

    if names.is_empty() {
        names.insert(DEFAULT_PILLAR);
    }

    let mut pillars: Vec<&'static Pillar> =
        names.into_iter().filter_map(pillar_by_name).collect();
    pillars.sort_by_key(|p| p.priority);
    pillars
}
