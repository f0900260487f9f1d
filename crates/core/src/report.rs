//! The final structured result of one research request.

use crate::observation::Observation;
use crate::plan::{Intent, Language, Plan, PlanOutcome};
use crate::session::MemoryStats;
use crate::token::DexCandidate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry in the request's progress trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub ms: u64,
}

impl StepRecord {
    pub fn ok(step: impl Into<String>, ms: u64) -> Self {
        Self {
            step: step.into(),
            ok: true,
            detail: None,
            ms,
        }
    }

    pub fn failed(step: impl Into<String>, detail: impl Into<String>, ms: u64) -> Self {
        Self {
            step: step.into(),
            ok: false,
            detail: Some(detail.into()),
            ms,
        }
    }
}

/// The terminal payload: echoes the plan, carries the answer, the
/// observations used, and the steps trace. Returned both as the `final`
/// stream event and as the blocking endpoint's response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    pub is_crypto: bool,
    pub is_ambiguous: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_query: Option<String>,
    /// Resolved ticker, "GENERAL" for chat, "N/A" when unresolved.
    pub symbol: String,
    pub answer: String,
    pub observations: Vec<Observation>,
    /// Disambiguation choices; non-empty only when `is_ambiguous`.
    pub candidates: Vec<DexCandidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryStats>,
    pub steps: Vec<StepRecord>,
    /// Set when generation failed mid-stream; `answer` is best-effort partial.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub generated_at: DateTime<Utc>,
}

impl Report {
    /// Seed a report from a plan; answer/observations filled in later.
    pub fn from_plan(query: impl Into<String>, session_id: Option<String>, plan: &Plan) -> Self {
        let symbol = match &plan.outcome {
            PlanOutcome::Resolved { symbol, .. } => symbol.clone(),
            PlanOutcome::SelectedPool { .. } => "DEX".into(),
            PlanOutcome::General => "GENERAL".into(),
            PlanOutcome::Ambiguous { .. } => "N/A".into(),
        };
        Self {
            query: query.into(),
            session_id,
            language: plan.language,
            is_crypto: plan.intent == Intent::Crypto && !plan.is_ambiguous(),
            is_ambiguous: plan.is_ambiguous(),
            asset_query: plan.asset_query.clone(),
            symbol,
            answer: String::new(),
            observations: Vec::new(),
            candidates: plan.candidates().to_vec(),
            memory: None,
            steps: Vec::new(),
            error: None,
            generated_at: Utc::now(),
        }
    }
}
