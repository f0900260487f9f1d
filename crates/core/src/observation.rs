//! Observations — the normalized outcome of one external tool call.
//!
//! Every dispatched call produces exactly one Observation, success or
//! failure. Payloads are tagged variants (one per observation kind) so
//! context truncation and event serialization are exhaustive matches
//! rather than dynamic JSON probing.

use crate::error::{ToolErrorKind, ToolFailure};
use crate::market::{MarketSnapshot, PoolStats};
use crate::news::NewsDigest;
use crate::token::{DexCandidate, TokenProfile};
use serde::{Deserialize, Serialize};

/// What a tool call was after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationKind {
    Technicals,
    News,
    TokenProfile,
    DexPool,
    Candidates,
}

impl std::fmt::Display for ObservationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Technicals => "technicals",
            Self::News => "news",
            Self::TokenProfile => "token_profile",
            Self::DexPool => "dex_pool",
            Self::Candidates => "candidates",
        };
        write!(f, "{s}")
    }
}

/// Typed payload for a successful observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ObservationPayload {
    Technicals(MarketSnapshot),
    News(NewsDigest),
    TokenProfile(TokenProfile),
    DexPool(PoolStats),
    Candidates(Vec<DexCandidate>),
}

impl ObservationPayload {
    pub fn kind(&self) -> ObservationKind {
        match self {
            Self::Technicals(_) => ObservationKind::Technicals,
            Self::News(_) => ObservationKind::News,
            Self::TokenProfile(_) => ObservationKind::TokenProfile,
            Self::DexPool(_) => ObservationKind::DexPool,
            Self::Candidates(_) => ObservationKind::Candidates,
        }
    }
}

/// Failure detail attached to a failed observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationError {
    pub kind: ToolErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl From<&ToolFailure> for ObservationError {
    fn from(f: &ToolFailure) -> Self {
        Self {
            kind: f.kind,
            message: f.message.clone(),
            retry_after_secs: f.retry_after_secs,
        }
    }
}

/// The normalized outcome of one tool call. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub kind: ObservationKind,
    pub ok: bool,
    /// Human-readable one-liner for trace UIs.
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<ObservationPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ObservationError>,
    pub latency_ms: u64,
}

impl Observation {
    pub fn success(payload: ObservationPayload, summary: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            kind: payload.kind(),
            ok: true,
            summary: summary.into(),
            payload: Some(payload),
            error: None,
            latency_ms,
        }
    }

    pub fn failure(kind: ObservationKind, failure: &ToolFailure, latency_ms: u64) -> Self {
        Self {
            kind,
            ok: false,
            summary: format!("{kind} unavailable: {}", failure.message),
            payload: None,
            error: Some(ObservationError::from(failure)),
            latency_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_observation_carries_payload_kind() {
        let obs = Observation::success(
            ObservationPayload::News(NewsDigest::empty("ETH")),
            "Retrieved 0 headlines.",
            120,
        );
        assert!(obs.ok);
        assert_eq!(obs.kind, ObservationKind::News);
        assert!(obs.error.is_none());
    }

    #[test]
    fn failure_observation_carries_error_kind() {
        let failure = ToolFailure::rate_limited("HTTP 429", Some(30));
        let obs = Observation::failure(ObservationKind::News, &failure, 80);
        assert!(!obs.ok);
        assert!(obs.payload.is_none());
        let err = obs.error.unwrap();
        assert_eq!(err.kind, ToolErrorKind::RateLimited);
        assert_eq!(err.retry_after_secs, Some(30));
    }

    #[test]
    fn payload_serializes_with_kind_tag() {
        let payload = ObservationPayload::News(NewsDigest::empty("SOL"));
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains(r#""kind":"news""#));
        assert!(json.contains(r#""symbol":"SOL""#));
    }
}
