//! Verdict domain type
//!
//! The classified outcome of running the planner against an artifact pair.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Verdict status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    /// The planner found a plan
    Solved,
    /// The planner proved the goal unreachable
    Unsolvable,
    /// The planner rejected the PDDL while parsing
    SyntaxError,
    /// The planner could not run, or failed at runtime
    ExecutionError,
    /// The planner ran cleanly but produced no plan
    NoSolutionFound,
    /// The planner exceeded its wall-clock budget
    Timeout,
}

impl VerdictStatus {
    /// True only for `Solved`
    pub fn is_solved(&self) -> bool {
        matches!(self, Self::Solved)
    }
}

impl std::fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Solved => "solved",
            Self::Unsolvable => "unsolvable",
            Self::SyntaxError => "syntax_error",
            Self::ExecutionError => "execution_error",
            Self::NoSolutionFound => "no_solution_found",
            Self::Timeout => "timeout",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of one validation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Classified status
    pub status: VerdictStatus,

    /// Human-readable summary
    pub message: String,

    /// Combined planner stdout and stderr (empty on timeout or launch failure)
    pub raw_log: String,
}

impl Verdict {
    /// Create a new verdict
    pub fn new(status: VerdictStatus, message: impl Into<String>, raw_log: impl Into<String>) -> Self {
        let message = message.into();
        debug!(%status, %message, "Verdict::new: called");
        Self {
            status,
            message,
            raw_log: raw_log.into(),
        }
    }

    /// An execution error with no planner output
    pub fn execution_error(message: impl Into<String>) -> Self {
        Self::new(VerdictStatus::ExecutionError, message, "")
    }

    /// True when a plan was found
    pub fn is_solved(&self) -> bool {
        self.status.is_solved()
    }
}
