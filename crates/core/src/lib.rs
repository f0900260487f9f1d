//! # coinsage core
//!
//! Domain types, traits, and error definitions for the coinsage crypto
//! research agent. This crate has **zero framework dependencies** — it
//! defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! The generation backend and the data-provider clients are defined as
//! traits here; implementations live in their respective crates. This
//! enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod context;
pub mod error;
pub mod event;
pub mod generation;
pub mod market;
pub mod news;
pub mod observation;
pub mod plan;
pub mod report;
pub mod session;
pub mod token;

// Re-export key types at crate root for ergonomics
pub use context::{ContextMeta, MemoryWindow, ResearchContext};
pub use error::{Error, GenerationError, MemoryError, Result, ToolErrorKind, ToolFailure};
pub use event::ResearchEvent;
pub use generation::{ChatMessage, ChatRole, GenerationRequest, Generator};
pub use market::{IndicatorSet, MacdLabel, MacdSummary, MarketSnapshot, PoolStats, PricePoint};
pub use news::{NewsDigest, NewsItem, Sentiment, SentimentSource};
pub use observation::{Observation, ObservationError, ObservationKind, ObservationPayload};
pub use plan::{Intent, Language, Plan, PlanOutcome};
pub use report::{Report, StepRecord};
pub use session::{MemoryStats, Role, SessionId, Turn};
pub use token::{AssetMatch, DexCandidate, PoolToken, TokenProfile};
