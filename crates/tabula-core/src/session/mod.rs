//! Evaluation session: slot state, edits, and orchestration (UI-agnostic).

mod eval;
mod ops;
mod state;

pub use eval::SlotState;
pub use state::Session;
