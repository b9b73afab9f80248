//! Repair: model-driven fixes for failing artifacts, gated by a reviewer

mod agent;
mod approval;

pub use agent::{LogExcerpt, RepairAgent};
pub use approval::{Approval, ApprovalGate, AutoApprove, ConsoleApproval, PREVIEW_CHARS, preview};
