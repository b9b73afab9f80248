//! Domain types for QuestMaster
//!
//! Core value types flowing through a session: the narrative input
//! (StorySpec), candidate planning artifacts (ArtifactPair), the planner's
//! classified outcome (Verdict), repair proposals and the final report.
//!
//! Every type here is an immutable snapshot. The session engine replaces
//! values wholesale instead of mutating them in place.

mod artifact;
mod report;
mod story;
mod verdict;

pub use artifact::{ArtifactPair, NO_EXPLANATION, RepairProposal};
pub use report::SessionReport;
pub use story::{Bound, RangeSpec, StorySpec};
pub use verdict::{Verdict, VerdictStatus};
