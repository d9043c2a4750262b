//! Survey sequencing: tracks the active question, evaluates per-question
//! branching rules, and drives draft persistence and completion signalling.

pub mod countdown;
pub mod drafts;
pub mod engine;
pub mod evaluator;
pub mod signal;
pub mod state_machine;

pub use countdown::Countdown;
pub use drafts::{DraftStore, MemoryDraftStore};
pub use engine::Sequencer;
pub use evaluator::LogicEvaluator;
pub use signal::{CompletionSignal, ResponseSink};
pub use state_machine::{TraversalState, TraversalStatus};
