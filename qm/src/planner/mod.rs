//! Planner validation
//!
//! Runs the external planner against a candidate artifact pair and turns its
//! output into a [`Verdict`](crate::domain::Verdict). Every failure mode,
//! including timeouts and a missing executable, is reported as a verdict;
//! nothing escapes to the caller as an error.

mod classify;
mod oracle;

pub use classify::{classify, messages};
pub use oracle::{FastDownwardOracle, ValidationOracle};
