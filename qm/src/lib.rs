//! QuestMaster - narrative quests to validated PDDL
//!
//! QuestMaster turns a free-text quest description into a PDDL domain and
//! problem using a generative model, checks them with the Fast Downward
//! planner, and repairs them until a plan exists or the repair budget runs
//! out.
//!
//! # Core Concepts
//!
//! - **Tolerant decoding**: model output is parsed strictly, then from the
//!   outermost `{ ... }` slice, then reported as a failure, never guessed
//! - **Total validation**: every planner outcome, including timeouts and
//!   launch failures, becomes a classified [`Verdict`]
//! - **Bounded repair**: at most `max-attempts` repair rounds, each optionally
//!   gated by a human reviewer
//! - **Flat-file audit trail**: every attempt and the final report are written
//!   under the session directory
//!
//! # Modules
//!
//! - [`domain`] - Value types flowing through a session
//! - [`artifact`] - Decoding model responses into artifacts
//! - [`planner`] - Planner invocation and output classification
//! - [`repair`] - Repair agent and approval gates
//! - [`session`] - Session engine and persistence
//! - [`llm`] - LLM client trait and provider implementations
//! - [`prompts`] - Prompt templates
//! - [`story`] - Lore file parsing and interactive entry
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod artifact;
pub mod cli;
pub mod config;
pub mod domain;
pub mod llm;
pub mod planner;
pub mod prompts;
pub mod repair;
pub mod session;
pub mod story;

// Re-export commonly used types
pub use artifact::{DecodeError, decode};
pub use config::{Config, LlmConfig, PlannerConfig, SessionConfig};
pub use domain::{ArtifactPair, Bound, RangeSpec, RepairProposal, SessionReport, StorySpec, Verdict, VerdictStatus};
pub use llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, create_client};
pub use planner::{FastDownwardOracle, ValidationOracle, classify};
pub use prompts::PromptLoader;
pub use repair::{Approval, ApprovalGate, AutoApprove, ConsoleApproval, RepairAgent};
pub use session::{SessionEngine, SessionStore};
pub use story::{StoryError, find_lore_file, load_story};
