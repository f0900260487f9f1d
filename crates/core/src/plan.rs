//! The Planner's output: a typed decision about one query.
//!
//! The plan is deliberately a closed enum rather than a bag of optional
//! fields so downstream short-circuits (general chat, disambiguation)
//! are exhaustive matches instead of defensive field probing.

use crate::token::DexCandidate;
use serde::{Deserialize, Serialize};

/// Coarse query intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    /// Conversation or crypto education — no tool dispatch.
    General,
    /// Research into a specific asset.
    Crypto,
}

/// Detected answer language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    It,
}

impl Language {
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::It => "Italian",
        }
    }
}

/// How the asset reference resolved (or didn't).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanOutcome {
    /// No asset involved; answer from conversation alone.
    General,
    /// A single market was identified with confidence.
    Resolved { symbol: String, coin_id: String },
    /// The caller selected a DEX pool in a prior turn; research that pool.
    SelectedPool { pool_id: String },
    /// Zero or multiple plausible markets — ask the caller to pick.
    /// Wrong silent resolution is worse than asking.
    Ambiguous { candidates: Vec<DexCandidate> },
}

/// The Planner's structured decision for one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub intent: Intent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    /// Short asset query extracted from free text (ticker/name/keyword).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_query: Option<String>,
    pub outcome: PlanOutcome,
}

impl Plan {
    pub fn general(language: Option<Language>) -> Self {
        Self {
            intent: Intent::General,
            language,
            asset_query: None,
            outcome: PlanOutcome::General,
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self.outcome, PlanOutcome::Ambiguous { .. })
    }

    pub fn resolved_symbol(&self) -> Option<&str> {
        match &self.outcome {
            PlanOutcome::Resolved { symbol, .. } => Some(symbol),
            _ => None,
        }
    }

    pub fn candidates(&self) -> &[DexCandidate] {
        match &self.outcome {
            PlanOutcome::Ambiguous { candidates } => candidates,
            _ => &[],
        }
    }
}
