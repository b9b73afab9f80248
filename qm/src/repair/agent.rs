//! RepairAgent: asks the model to fix a failing artifact pair
//!
//! A repair round never fails. Unusable model output, transport errors and
//! template errors all degrade to a proposal that leaves the artifacts
//! unchanged, so the session can record the attempt and move on.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::approval::{Approval, ApprovalGate};
use crate::artifact::decode_response;
use crate::config::{ExcerptStrategy, SessionConfig};
use crate::domain::{ArtifactPair, NO_EXPLANATION, RepairProposal, Verdict};
use crate::llm::{CompletionRequest, GenerationOptions, LlmClient};
use crate::prompts::{PromptLoader, RepairContext};

/// Bounded slice of the planner log embedded in a repair prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogExcerpt {
    pub strategy: ExcerptStrategy,
    pub max_chars: usize,
}

impl Default for LogExcerpt {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}

impl LogExcerpt {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            strategy: config.log_excerpt,
            max_chars: config.log_excerpt_chars,
        }
    }

    /// Cut `log` down to at most `max_chars` characters
    pub fn apply(&self, log: &str) -> String {
        match self.strategy {
            ExcerptStrategy::Head => log.chars().take(self.max_chars).collect(),
            ExcerptStrategy::Tail => {
                let total = log.chars().count();
                log.chars().skip(total.saturating_sub(self.max_chars)).collect()
            }
        }
    }

    /// Describes the excerpt inside the prompt
    pub fn label(&self) -> String {
        match self.strategy {
            ExcerptStrategy::Head => format!("first {} characters", self.max_chars),
            ExcerptStrategy::Tail => format!("last {} characters", self.max_chars),
        }
    }
}

/// Produces repair proposals for failing artifacts
pub struct RepairAgent {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
    gate: Arc<dyn ApprovalGate>,
    options: GenerationOptions,
    excerpt: LogExcerpt,
}

impl RepairAgent {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        prompts: Arc<PromptLoader>,
        gate: Arc<dyn ApprovalGate>,
        options: GenerationOptions,
        excerpt: LogExcerpt,
    ) -> Self {
        debug!(?options, ?excerpt, "RepairAgent::new: called");
        Self {
            llm,
            prompts,
            gate,
            options,
            excerpt,
        }
    }

    /// Propose a fix for `artifacts`, which failed with `verdict`
    ///
    /// The proposal always passes through the approval gate. A rejection
    /// triggers exactly one further round carrying the reviewer's feedback.
    pub async fn propose(&self, artifacts: &ArtifactPair, verdict: &Verdict) -> RepairProposal {
        debug!(status = %verdict.status, "RepairAgent::propose: called");
        let context = RepairContext::new(
            artifacts,
            verdict,
            self.excerpt.apply(&verdict.raw_log),
            self.excerpt.label(),
        );

        let prompt = match self.prompts.repair_prompt(&context) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!("Failed to render repair prompt: {}", e);
                return RepairProposal::unchanged(artifacts, format!("repair prompt unavailable: {}", e));
            }
        };

        let proposal = match self.ask(prompt).await {
            Ok(text) => match decode_response(&text) {
                Ok(response) => response.into_proposal(artifacts, NO_EXPLANATION),
                Err(e) => {
                    warn!("Repair response could not be decoded, keeping artifacts: {}", e);
                    RepairProposal::unchanged(artifacts, NO_EXPLANATION)
                }
            },
            Err(e) => {
                warn!("Repair request failed, keeping artifacts: {}", e);
                RepairProposal::unchanged(artifacts, format!("repair request failed: {}", e))
            }
        };
        info!("Repair proposed: {}", proposal.explanation);

        match self.review(&proposal).await {
            Approval::Accepted => {
                debug!("RepairAgent::propose: proposal accepted");
                proposal
            }
            Approval::Rejected { feedback } => {
                info!("Repair proposal rejected, requesting one revision");
                self.revise(artifacts, &context, &proposal, &feedback).await
            }
        }
    }

    /// The single feedback round after a rejection
    ///
    /// Any failure here reverts to the pre-repair artifacts.
    async fn revise(
        &self,
        artifacts: &ArtifactPair,
        context: &RepairContext,
        rejected: &RepairProposal,
        feedback: &str,
    ) -> RepairProposal {
        debug!(feedback_len = feedback.len(), "RepairAgent::revise: called");
        let prompt = match self.prompts.feedback_prompt(context, feedback) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!("Failed to render feedback prompt, keeping original artifacts: {}", e);
                return RepairProposal::unchanged(artifacts, rejected.explanation.clone());
            }
        };

        match self.ask(prompt).await {
            Ok(text) => match decode_response(&text) {
                Ok(response) => response.into_proposal(artifacts, &rejected.explanation),
                Err(e) => {
                    warn!("Revised response could not be decoded, keeping original artifacts: {}", e);
                    RepairProposal::unchanged(artifacts, rejected.explanation.clone())
                }
            },
            Err(e) => {
                warn!("Revision request failed, keeping original artifacts: {}", e);
                RepairProposal::unchanged(artifacts, rejected.explanation.clone())
            }
        }
    }

    async fn ask(&self, prompt: String) -> Result<String, crate::llm::LlmError> {
        let response = self.llm.complete(CompletionRequest::new(prompt, &self.options)).await?;
        debug!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            stop_reason = ?response.stop_reason,
            "RepairAgent::ask: response received"
        );
        Ok(response.text_or_empty().to_string())
    }

    // Console input blocks, so the gate runs off the async worker
    async fn review(&self, proposal: &RepairProposal) -> Approval {
        let gate = Arc::clone(&self.gate);
        let proposal = proposal.clone();
        match tokio::task::spawn_blocking(move || gate.review(&proposal)).await {
            Ok(approval) => approval,
            Err(e) => {
                warn!("Approval gate failed, accepting proposal: {}", e);
                Approval::Accepted
            }
        }
    }
}
