//! ArtifactPair and RepairProposal domain types

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Explanation recorded when the model gave none
pub const NO_EXPLANATION: &str = "no explanation provided";

/// One candidate planning model: a PDDL domain and its problem
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPair {
    /// Domain file content (predicates and actions)
    pub domain: String,

    /// Problem file content (objects, init and goal)
    pub problem: String,
}

impl ArtifactPair {
    /// Create a new artifact pair
    pub fn new(domain: impl Into<String>, problem: impl Into<String>) -> Self {
        let domain = domain.into();
        let problem = problem.into();
        debug!(
            domain_len = domain.len(),
            problem_len = problem.len(),
            "ArtifactPair::new: called"
        );
        Self { domain, problem }
    }

    /// The pair used when model output could not be decoded
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when both documents are blank
    pub fn is_empty(&self) -> bool {
        self.domain.trim().is_empty() && self.problem.trim().is_empty()
    }
}

/// A revised artifact pair together with the model's reasoning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairProposal {
    pub artifacts: ArtifactPair,
    pub explanation: String,
}

impl RepairProposal {
    /// Create a new proposal
    pub fn new(artifacts: ArtifactPair, explanation: impl Into<String>) -> Self {
        Self {
            artifacts,
            explanation: explanation.into(),
        }
    }

    /// A proposal that leaves the artifacts untouched
    pub fn unchanged(artifacts: &ArtifactPair, explanation: impl Into<String>) -> Self {
        debug!("RepairProposal::unchanged: called");
        Self::new(artifacts.clone(), explanation)
    }
}
