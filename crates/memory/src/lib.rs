//! Per-session conversation memory for coinsage.
//!
//! Each session keeps a recent window of turns verbatim plus a rolling
//! summary of everything older. When the character footprint crosses the
//! configured budget, the oldest turns are folded into the summary via
//! the generation backend (with a deterministic fallback), keeping
//! `summary + turns` under budget after every append.
//!
//! Sessions are independent: the store holds one async mutex per session
//! id, so summarization for one session never blocks another.

pub mod store;

pub use store::{SessionMemory, SessionStore};
