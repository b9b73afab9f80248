//! Planner output classification

use tracing::debug;

use crate::domain::{Verdict, VerdictStatus};

/// Human-readable verdict messages
pub mod messages {
    pub const SOLVED: &str = "Valid plan found";
    pub const UNSOLVABLE: &str = "Problem is logically unsolvable";
    pub const SYNTAX_ERROR: &str = "Syntax error in the PDDL";
    pub const EXECUTION_ERROR: &str = "Error while running the planner";
    pub const NO_SOLUTION: &str = "No solution found (potential inconsistency)";
    pub const TIMEOUT: &str = "Planner timed out";
}

/// Markers the planner prints when it finds a plan
const SOLUTION_MARKERS: [&str; 2] = ["Solution found!", "Plan length"];

/// Classify combined planner output into a verdict
///
/// Checked in priority order: solution, unsolvable, parse error, generic
/// error, and finally "ran cleanly but found nothing". Only the solution
/// markers are case-sensitive.
pub fn classify(output: String) -> Verdict {
    debug!(output_len = output.len(), "classify: called");
    let lower = output.to_lowercase();

    let (status, message) = if SOLUTION_MARKERS.iter().any(|m| output.contains(m)) {
        debug!("classify: solution marker found");
        (VerdictStatus::Solved, messages::SOLVED)
    } else if lower.contains("unsolvable") {
        debug!("classify: unsolvable marker found");
        (VerdictStatus::Unsolvable, messages::UNSOLVABLE)
    } else if lower.contains("parse error") {
        debug!("classify: parse error marker found");
        (VerdictStatus::SyntaxError, messages::SYNTAX_ERROR)
    } else if lower.contains("error") {
        debug!("classify: generic error marker found");
        (VerdictStatus::ExecutionError, messages::EXECUTION_ERROR)
    } else {
        debug!("classify: no marker found");
        (VerdictStatus::NoSolutionFound, messages::NO_SOLUTION)
    };

    Verdict::new(status, message, output)
}
