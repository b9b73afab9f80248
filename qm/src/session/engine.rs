//! SessionEngine - the generate, validate, repair loop
//!
//! One session runs strictly sequentially:
//!
//! ```text
//! Generate -> Validate -> (Repair -> Validate)* -> Finalize
//! ```
//!
//! Validation always runs against the current artifacts before any repair,
//! and the loop performs at most `max-attempts` repair rounds.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::store::SessionStore;
use crate::artifact::decode;
use crate::config::Config;
use crate::domain::{ArtifactPair, SessionReport, StorySpec, Verdict};
use crate::llm::{CompletionRequest, GenerationOptions, LlmClient};
use crate::planner::ValidationOracle;
use crate::prompts::PromptLoader;
use crate::repair::{ApprovalGate, LogExcerpt, RepairAgent};

/// Where the session is in its state machine
#[derive(Debug)]
enum SessionState {
    Generate,
    Validate(ArtifactPair),
    Repair(ArtifactPair, Verdict),
    Finalize(ArtifactPair, Verdict),
}

/// Drives one session from narrative to report
pub struct SessionEngine {
    /// Session ID (uuid v7)
    pub session_id: String,

    /// The narrative being modelled
    story: StorySpec,

    /// Generative capability for the initial draft
    llm: Arc<dyn LlmClient>,

    /// Planner-backed validation
    oracle: Arc<dyn ValidationOracle>,

    /// Repair rounds
    repair: RepairAgent,

    /// Template loader
    prompts: Arc<PromptLoader>,

    /// Flat-file persistence
    store: SessionStore,

    /// Options shared by generation and repair calls
    options: GenerationOptions,

    /// Repair budget
    max_attempts: u32,

    /// Repair rounds performed so far
    attempt_count: u32,
}

impl SessionEngine {
    /// Create a new session engine
    pub fn new(
        config: &Config,
        story: StorySpec,
        llm: Arc<dyn LlmClient>,
        oracle: Arc<dyn ValidationOracle>,
        gate: Arc<dyn ApprovalGate>,
    ) -> Self {
        let session_id = Uuid::now_v7().to_string();
        debug!(%session_id, max_attempts = config.session.max_attempts, "SessionEngine::new: called");

        let prompts = Arc::new(PromptLoader::new(config.prompts.dir.clone()));
        let options = GenerationOptions::from_config(&config.llm);
        let repair = RepairAgent::new(
            Arc::clone(&llm),
            Arc::clone(&prompts),
            gate,
            options,
            LogExcerpt::from_config(&config.session),
        );

        let store = SessionStore::new(&config.session.output_dir, session_id.clone());

        Self {
            session_id,
            story,
            llm,
            oracle,
            repair,
            prompts,
            store,
            options,
            max_attempts: config.session.max_attempts,
            attempt_count: 0,
        }
    }

    /// The store this session writes to
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Run the session to completion
    ///
    /// Exhausting the repair budget is a normal outcome: the report carries
    /// the last verdict and `valid = false`. Only persistence failures and
    /// an unusable generation template are errors.
    pub async fn run(mut self) -> eyre::Result<SessionReport> {
        info!(
            "Starting session {} (max_attempts: {}, output: {})",
            self.session_id,
            self.max_attempts,
            self.store.root().display()
        );

        let mut state = SessionState::Generate;
        loop {
            state = match state {
                SessionState::Generate => {
                    debug!(session_id = %self.session_id, "run: generate");
                    self.store.begin()?;
                    let artifacts = self.generate().await?;
                    self.store.save_artifacts(0, &artifacts)?;
                    SessionState::Validate(artifacts)
                }
                SessionState::Validate(artifacts) => {
                    debug!(session_id = %self.session_id, attempt = self.attempt_count, "run: validate");
                    let verdict = self.oracle.validate(&artifacts).await;
                    self.store.save_verdict(self.attempt_count, &verdict)?;
                    info!(
                        "Session {} attempt {}: {} ({})",
                        self.session_id, self.attempt_count, verdict.status, verdict.message
                    );

                    if verdict.is_solved() {
                        debug!(session_id = %self.session_id, "run: solved");
                        SessionState::Finalize(artifacts, verdict)
                    } else if self.attempt_count < self.max_attempts {
                        debug!(session_id = %self.session_id, "run: not solved, repairing");
                        SessionState::Repair(artifacts, verdict)
                    } else {
                        warn!(
                            "Session {} exhausted {} repair attempts, last status: {}",
                            self.session_id, self.max_attempts, verdict.status
                        );
                        SessionState::Finalize(artifacts, verdict)
                    }
                }
                SessionState::Repair(artifacts, verdict) => {
                    self.attempt_count += 1;
                    info!(
                        "Session {} repair {}/{}",
                        self.session_id, self.attempt_count, self.max_attempts
                    );
                    let proposal = self.repair.propose(&artifacts, &verdict).await;
                    self.store.save_artifacts(self.attempt_count, &proposal.artifacts)?;
                    SessionState::Validate(proposal.artifacts)
                }
                SessionState::Finalize(artifacts, verdict) => {
                    debug!(session_id = %self.session_id, "run: finalize");
                    let report = SessionReport::new(
                        self.session_id.clone(),
                        self.story.clone(),
                        artifacts,
                        verdict,
                        self.attempt_count,
                    );
                    self.store.save_final(&report)?;
                    info!(
                        "Session {} finished: valid={} after {} repairs",
                        self.session_id,
                        report.valid(),
                        report.attempt_count
                    );
                    return Ok(report);
                }
            };
        }
    }

    /// Draft the initial artifacts
    ///
    /// Model failures yield an empty pair so validation can surface them.
    async fn generate(&self) -> eyre::Result<ArtifactPair> {
        debug!(session_id = %self.session_id, "generate: called");
        let prompt = self.prompts.generate_prompt(&self.story)?;

        let response = match self.llm.complete(CompletionRequest::new(prompt, &self.options)).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Generation request failed, continuing with empty artifacts: {}", e);
                return Ok(ArtifactPair::empty());
            }
        };
        debug!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            stop_reason = ?response.stop_reason,
            "generate: response received"
        );

        match decode(response.text_or_empty()) {
            Ok(artifacts) => Ok(artifacts),
            Err(e) => {
                warn!("Generation response could not be decoded, continuing with empty artifacts: {}", e);
                Ok(ArtifactPair::empty())
            }
        }
    }
}
