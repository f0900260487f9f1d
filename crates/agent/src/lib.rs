//! The coinsage research loop — plan, dispatch, assemble, stream.
//!
//! One request flows through four stages:
//!
//! 1. **Plan**: classify intent and language, extract and resolve the
//!    asset reference (or collect disambiguation candidates)
//! 2. **Dispatch**: run the required tool calls concurrently, each with
//!    its own timeout and at most one retry; failures become failed
//!    observations, never aborts
//! 3. **Assemble**: merge plan, observations, and session memory into a
//!    size-bounded context
//! 4. **Generate**: stream the answer from the generation backend
//!
//! Every stage reports through the stream sequencer, which owns event
//! ordering and the exactly-one-terminal-event guarantee.

pub mod context;
pub mod dispatcher;
pub mod orchestrator;
pub mod planner;
pub mod prompts;
pub mod sequencer;

#[cfg(test)]
pub mod test_support;

pub use context::ContextAssembler;
pub use dispatcher::ToolDispatcher;
pub use orchestrator::{ResearchAgent, ResearchRequest};
pub use planner::{Planner, PlannerInput, Selection, SELECTION_KIND_DEX_POOL};
pub use sequencer::StreamSequencer;
