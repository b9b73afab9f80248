//! End-to-end session tests
//!
//! The generative model is scripted and Fast Downward is replaced by small
//! shell scripts run through the real `FastDownwardOracle`.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use questmaster::config::Config;
use questmaster::domain::{ArtifactPair, RangeSpec, RepairProposal, StorySpec, VerdictStatus};
use questmaster::llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError};
use questmaster::planner::{FastDownwardOracle, messages};
use questmaster::repair::{Approval, ApprovalGate, AutoApprove};
use questmaster::session::SessionEngine;
use tempfile::TempDir;

// =============================================================================
// Fixtures
// =============================================================================

/// Replays canned model responses in order
struct ScriptedLlm {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.prompts.lock().unwrap().push(request.prompt);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .map(CompletionResponse::text)
            .ok_or_else(|| LlmError::InvalidResponse("script exhausted".to_string()))
    }
}

/// Rejects every proposal with the same feedback
struct AlwaysReject;

impl ApprovalGate for AlwaysReject {
    fn review(&self, _proposal: &RepairProposal) -> Approval {
        Approval::Rejected {
            feedback: "keep the original quest giver".to_string(),
        }
    }
}

const DOMAIN: &str = "(define (domain rescue) (:predicates (at ?x)) (:action walk :parameters (?x)))";
const PROBLEM: &str = "(define (problem rescue-1) (:domain rescue) (:init) (:goal (at tower)))";

fn artifacts_json(domain: &str, problem: &str, explanation: &str) -> String {
    serde_json::json!({"explanation": explanation, "domain": domain, "problem": problem}).to_string()
}

fn story() -> StorySpec {
    StorySpec::new(
        "A squire must carry a message across the marsh to the besieged castle.",
        RangeSpec::new(2, 3),
        RangeSpec::new(2, 3),
    )
}

/// Write a fake planner script and a config that runs it through `sh`
fn setup(script: &str, max_attempts: u32) -> (Config, TempDir) {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let planner = temp.path().join("fake-downward.sh");
    fs::write(&planner, script).unwrap();

    let mut config = Config::default();
    config.planner.path = planner;
    config.planner.interpreter = "sh".to_string();
    config.planner.timeout_ms = 10_000;
    config.planner.work_dir = Some(temp.path().join("scratch"));
    config.session.max_attempts = max_attempts;
    config.session.output_dir = temp.path().join("phase1_output");
    (config, temp)
}

fn output_dir(temp: &TempDir) -> PathBuf {
    temp.path().join("phase1_output")
}

fn scratch_is_empty(temp: &TempDir) -> bool {
    let scratch = temp.path().join("scratch");
    !scratch.exists() || fs::read_dir(scratch).unwrap().next().is_none()
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
}

async fn run_session(config: &Config, llm: Arc<ScriptedLlm>, gate: Arc<dyn ApprovalGate>) -> questmaster::SessionReport {
    let oracle = Arc::new(FastDownwardOracle::new(config.planner.clone()));
    SessionEngine::new(config, story(), llm, oracle, gate)
        .run()
        .await
        .expect("session should complete")
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_solved_on_first_validation() {
    let (config, temp) = setup("echo 'Solution found!'\necho 'Plan length: 2 step(s).'\n", 5);
    let llm = Arc::new(ScriptedLlm::new(vec![format!(
        "Here are your files:\n```json\n{}\n```",
        artifacts_json(DOMAIN, PROBLEM, "")
    )]));

    let report = run_session(&config, llm.clone(), Arc::new(AutoApprove)).await;

    assert!(report.valid());
    assert_eq!(report.attempt_count, 0);
    assert_eq!(report.final_verdict.message, messages::SOLVED);
    assert_eq!(llm.prompts().len(), 1);
    assert!(llm.prompts()[0].contains("Branching Factor: 2-3"));

    let out = output_dir(&temp);
    assert_eq!(read(&out.join("initial_attempt/domain.pddl")), DOMAIN);
    assert_eq!(read(&out.join("initial_attempt/problem.pddl")), PROBLEM);
    assert_eq!(read(&out.join("domain.pddl")), DOMAIN);

    let json: serde_json::Value = serde_json::from_str(&read(&out.join("report.json"))).unwrap();
    assert_eq!(json["valid"], true);
    assert_eq!(json["branching"]["min"], 2);
    assert_eq!(json["depth"]["max"], 3);
    assert_eq!(json["attempt_count"], 0);
    assert!(scratch_is_empty(&temp));
}

#[tokio::test]
async fn test_syntax_error_repaired_once() {
    let script = "if grep -q broken \"$1\"; then\n  echo 'translate.py: parse error in domain file'\nelse\n  echo 'Solution found!'\nfi\n";
    let (config, temp) = setup(script, 5);
    let llm = Arc::new(ScriptedLlm::new(vec![
        artifacts_json("(define (domain broken)", PROBLEM, ""),
        artifacts_json(DOMAIN, PROBLEM, "Closed the unbalanced domain definition."),
    ]));

    let report = run_session(&config, llm.clone(), Arc::new(AutoApprove)).await;

    assert!(report.valid());
    assert_eq!(report.attempt_count, 1);
    assert_eq!(report.final_artifacts, ArtifactPair::new(DOMAIN, PROBLEM));

    // The repair prompt carried the failing domain and the planner log
    let repair_prompt = &llm.prompts()[1];
    assert!(repair_prompt.contains("(define (domain broken)"));
    assert!(repair_prompt.contains("parse error in domain file"));
    assert!(repair_prompt.contains(messages::SYNTAX_ERROR));

    let out = output_dir(&temp);
    assert_eq!(read(&out.join("initial_attempt/domain.pddl")), "(define (domain broken)");
    let first: serde_json::Value = serde_json::from_str(&read(&out.join("initial_attempt/verdict.json"))).unwrap();
    assert_eq!(first["status"], "syntax_error");
    assert_eq!(read(&out.join("attempts/attempt-1/domain.pddl")), DOMAIN);

    let json: serde_json::Value = serde_json::from_str(&read(&out.join("report.json"))).unwrap();
    assert_eq!(json["valid"], true);
    assert_eq!(json["attempt_count"], 1);
}

#[tokio::test]
async fn test_unsolvable_exhausts_budget() {
    let script = "echo 'Search stopped without finding a solution.'\necho 'Completely explored state space -- problem proven unsolvable.'\n";
    let (config, temp) = setup(script, 5);
    let responses = (0..6)
        .map(|n| artifacts_json(&format!("(define (domain rescue-{}))", n), PROBLEM, "tweaked goal"))
        .collect();
    let llm = Arc::new(ScriptedLlm::new(responses));

    let report = run_session(&config, llm.clone(), Arc::new(AutoApprove)).await;

    assert!(!report.valid());
    assert_eq!(report.attempt_count, 5);
    assert_eq!(report.final_verdict.status, VerdictStatus::Unsolvable);
    assert_eq!(llm.prompts().len(), 6);
    // Artifacts are passed through even though no plan exists
    assert_eq!(report.final_artifacts.domain, "(define (domain rescue-5))");

    let out = output_dir(&temp);
    assert!(out.join("attempts/attempt-5/verdict.json").exists());
    assert!(!out.join("attempts/attempt-6").exists());

    let json: serde_json::Value = serde_json::from_str(&read(&out.join("report.json"))).unwrap();
    assert_eq!(json["valid"], false);
    assert_eq!(json["status"], "unsolvable");
    assert_eq!(json["validation_message"], messages::UNSOLVABLE);
    assert_eq!(json["attempt_count"], 5);
    assert!(scratch_is_empty(&temp));
}

// =============================================================================
// Degraded paths
// =============================================================================

#[tokio::test]
async fn test_rejected_repair_with_unusable_revision_keeps_artifacts() {
    let (config, _temp) = setup("echo 'parse error'\n", 1);
    let llm = Arc::new(ScriptedLlm::new(vec![
        artifacts_json("(define (domain original)", PROBLEM, ""),
        artifacts_json("(define (domain rewritten))", PROBLEM, "rewrote the domain"),
        "I am not able to help with that.".to_string(),
    ]));

    let report = run_session(&config, llm.clone(), Arc::new(AlwaysReject)).await;

    assert_eq!(report.attempt_count, 1);
    assert_eq!(report.final_artifacts.domain, "(define (domain original)");
    assert_eq!(report.final_verdict.status, VerdictStatus::SyntaxError);

    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 3);
    assert!(prompts[2].contains("keep the original quest giver"));
}

#[tokio::test]
async fn test_missing_planner_is_reported_not_raised() {
    let (mut config, temp) = setup("", 0);
    config.planner.path = temp.path().join("no-such-planner.py");
    let llm = Arc::new(ScriptedLlm::new(vec![artifacts_json(DOMAIN, PROBLEM, "")]));

    let report = run_session(&config, llm, Arc::new(AutoApprove)).await;

    assert!(!report.valid());
    assert_eq!(report.final_verdict.status, VerdictStatus::ExecutionError);
    assert!(report.final_verdict.message.contains("no-such-planner.py"));
}
