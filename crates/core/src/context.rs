//! The size-bounded context handed to the generation backend.
//!
//! A `ResearchContext` bundles plan metadata, the selected observations,
//! and the session's memory window. The assembler in the agent crate is
//! responsible for keeping its serialized size under budget; this module
//! only defines the shape and the measurement.

use crate::observation::Observation;
use crate::plan::{Intent, Language};
use crate::session::Turn;
use serde::{Deserialize, Serialize};

/// The session memory slice included in a context: the rolling summary
/// plus the retained recent turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryWindow {
    pub summary: String,
    pub recent_turns: Vec<Turn>,
}

impl MemoryWindow {
    pub fn empty() -> Self {
        Self {
            summary: String::new(),
            recent_turns: Vec::new(),
        }
    }
}

/// The bounded bundle consumed by the generation step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchContext {
    pub intent: Intent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    /// Resolved ticker. Never dropped by truncation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_query: Option<String>,
    pub observations: Vec<Observation>,
    pub memory: MemoryWindow,
}

impl ResearchContext {
    /// Serialized character footprint, as counted against the budget.
    pub fn chars(&self) -> usize {
        serde_json::to_string(self)
            .map(|s| s.chars().count())
            .unwrap_or(usize::MAX)
    }
}

/// What the assembler did to fit the budget; attached to the `context`
/// stream event so callers can see truncation happen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextMeta {
    /// Final serialized size in characters.
    pub chars: usize,
    /// Configured ceiling.
    pub budget: usize,
    pub truncated: bool,
    /// Reductions applied, in order, e.g. `"news_items: 5 -> 3"`.
    pub drops: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;

    #[test]
    fn chars_counts_serialized_footprint() {
        let ctx = ResearchContext {
            intent: Intent::General,
            language: None,
            symbol: None,
            asset_query: None,
            observations: Vec::new(),
            memory: MemoryWindow::empty(),
        };
        let small = ctx.chars();

        let bigger = ResearchContext {
            memory: MemoryWindow {
                summary: "a".repeat(500),
                recent_turns: vec![Turn::new(Role::User, "hello", 0)],
            },
            ..ctx
        };
        assert!(bigger.chars() > small + 500);
    }

    #[test]
    fn symbol_is_omitted_when_absent() {
        let ctx = ResearchContext {
            intent: Intent::Crypto,
            language: Some(Language::En),
            symbol: Some("ETH".into()),
            asset_query: Some("eth".into()),
            observations: Vec::new(),
            memory: MemoryWindow::empty(),
        };
        let json = serde_json::to_string(&ctx).unwrap();
        assert!(json.contains(r#""symbol":"ETH""#));

        let general = ResearchContext {
            intent: Intent::General,
            language: None,
            symbol: None,
            asset_query: None,
            observations: Vec::new(),
            memory: MemoryWindow::empty(),
        };
        assert!(!serde_json::to_string(&general).unwrap().contains("symbol"));
    }
}
