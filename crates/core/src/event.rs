//! The ordered streaming protocol for one research request.
//!
//! `ResearchEvent` is what the gateway forwards to clients over SSE and
//! what the blocking entry point folds into a final `Report`.
//!
//! Emission order contract (enforced by the stream sequencer):
//! - zero or more `trace` events
//! - zero or more `tool` events, each followed by its paired `observation`
//! - at most one `context` event, after dispatch and before generation
//! - zero or more `answer_delta` events, in generation order
//! - exactly one `memory` event (post-turn stats, sessions only)
//! - exactly one terminal `final` event, never omitted
//!
//! An ambiguous plan short-circuits: `trace` events, then `final` with
//! the candidate list — no tool, context, or answer_delta events.

use crate::context::{ContextMeta, ResearchContext};
use crate::observation::Observation;
use crate::report::Report;
use crate::session::MemoryStats;
use serde::{Deserialize, Serialize};

/// Events emitted while a research request runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResearchEvent {
    /// Human-readable progress note.
    Trace { phase: String, message: String },

    /// One dispatched tool call completed (or failed).
    Tool {
        name: String,
        ok: bool,
        ms: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },

    /// The normalized outcome paired with a prior `tool` event.
    Observation { observation: Observation },

    /// The assembled, size-bounded context handed to generation.
    Context {
        context: ResearchContext,
        meta: ContextMeta,
    },

    /// Post-turn memory pressure stats.
    Memory {
        #[serde(skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
        stats: MemoryStats,
    },

    /// One generated text chunk.
    AnswerDelta { delta: String },

    /// The terminal event carrying the full report.
    Final { report: Report },
}

impl ResearchEvent {
    /// SSE event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Trace { .. } => "trace",
            Self::Tool { .. } => "tool",
            Self::Observation { .. } => "observation",
            Self::Context { .. } => "context",
            Self::Memory { .. } => "memory",
            Self::AnswerDelta { .. } => "answer_delta",
            Self::Final { .. } => "final",
        }
    }

    /// Whether this event terminates the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Final { .. })
    }
}
