//! Session and turn domain types.
//!
//! A Session is the per-caller conversational state: an ordered sequence
//! of Turns plus an optional rolling Summary. Sessions are owned and
//! mutated only by the memory store; everything here is a value object.

use serde::{Deserialize, Serialize};

/// Opaque session identifier supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One conversational turn. Immutable once appended; `seq` increases
/// monotonically within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub seq: u64,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>, seq: u64) -> Self {
        Self {
            role,
            content: content.into(),
            seq,
        }
    }

    /// Character footprint of this turn as counted against the memory budget.
    pub fn chars(&self) -> usize {
        self.content.chars().count()
    }
}

/// Memory-pressure snapshot reported on the `memory` stream event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStats {
    /// Approximate character footprint (summary + retained + pending turns).
    pub approx_chars: usize,
    /// Characters held by the rolling summary.
    pub summary_chars: usize,
    /// Configured ceiling for summary + turns.
    pub max_chars: usize,
    /// Retained verbatim turns.
    pub turns: usize,
    /// Older turns queued for the next summarization pass.
    pub pending_turns: usize,
    /// Whether this call folded pending turns into the summary.
    pub was_summarized: bool,
    /// How many turns were folded away.
    pub dropped_turns: usize,
}
