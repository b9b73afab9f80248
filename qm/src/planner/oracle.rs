//! Validation oracle backed by the Fast Downward planner

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use super::classify::{classify, messages};
use crate::config::PlannerConfig;
use crate::domain::{ArtifactPair, Verdict, VerdictStatus};

/// Prefix for unexpected failures around the planner run
const UNEXPECTED: &str = "Unexpected error while running the planner";

/// Certifies whether an artifact pair admits a plan
///
/// Implementations must be total: every failure is folded into the returned
/// verdict.
#[async_trait]
pub trait ValidationOracle: Send + Sync {
    /// Validate the artifacts and classify the outcome
    async fn validate(&self, artifacts: &ArtifactPair) -> Verdict;
}

/// Why a planner run produced no output to classify
#[derive(Debug)]
enum RunFailure {
    TimedOut,
    NotFound,
    Io(std::io::Error),
}

/// Runs Fast Downward in a scratch directory scoped to a single validation
pub struct FastDownwardOracle {
    config: PlannerConfig,
}

impl FastDownwardOracle {
    /// Create a new oracle
    pub fn new(config: PlannerConfig) -> Self {
        debug!(path = ?config.path, interpreter = %config.interpreter, "FastDownwardOracle::new: called");
        Self { config }
    }

    /// The planner configuration in use
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Resolve the planner path against the current directory
    ///
    /// The planner runs inside the scratch directory, so relative paths are
    /// anchored first. Bare names that do not exist locally are left for PATH
    /// lookup.
    fn planner_path(&self) -> PathBuf {
        let path = &self.config.path;
        if path.is_absolute() {
            return path.clone();
        }
        let anchored = path.components().count() > 1 || path.exists();
        match std::env::current_dir() {
            Ok(cwd) if anchored => cwd.join(path),
            _ => path.clone(),
        }
    }

    fn uses_interpreter(&self) -> bool {
        !self.config.interpreter.trim().is_empty()
    }

    fn not_found_message(&self, planner: &Path) -> String {
        if self.uses_interpreter() {
            format!(
                "Unable to run the planner. Check that '{}' is on PATH and that the planner path is correct: {}",
                self.config.interpreter.trim(),
                planner.display()
            )
        } else {
            format!("Unable to run the planner: executable not found at {}", planner.display())
        }
    }

    fn create_workspace(&self) -> std::io::Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("qm-validate-");
        match &self.config.work_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                builder.tempdir_in(dir)
            }
            None => builder.tempdir(),
        }
    }

    fn command(&self, planner: &Path, workdir: &Path, domain: &Path, problem: &Path) -> Command {
        let mut command = if self.uses_interpreter() {
            let mut c = Command::new(self.config.interpreter.trim());
            c.arg(planner);
            c
        } else {
            Command::new(planner)
        };
        command
            .arg(domain)
            .arg(problem)
            .arg("--search")
            .arg(&self.config.search)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        isolate_process_group(&mut command);
        command
    }

    /// Validate inside an already-created scratch directory
    async fn validate_in(&self, workdir: &Path, artifacts: &ArtifactPair) -> Verdict {
        let planner = self.planner_path();
        if self.uses_interpreter() && !planner.exists() {
            warn!(?planner, "validate_in: planner script missing");
            return Verdict::execution_error(self.not_found_message(&planner));
        }

        let domain_path = workdir.join("domain.pddl");
        let problem_path = workdir.join("problem.pddl");
        let written = async {
            tokio::fs::write(&domain_path, &artifacts.domain).await?;
            tokio::fs::write(&problem_path, &artifacts.problem).await
        }
        .await;
        if let Err(e) = written {
            warn!(error = %e, "validate_in: failed to write artifacts");
            return Verdict::execution_error(format!("{}: {}", UNEXPECTED, e));
        }

        match self.run_planner(&planner, workdir, &domain_path, &problem_path).await {
            Ok(output) => classify(output),
            Err(RunFailure::TimedOut) => Verdict::new(VerdictStatus::Timeout, messages::TIMEOUT, ""),
            Err(RunFailure::NotFound) => Verdict::execution_error(self.not_found_message(&planner)),
            Err(RunFailure::Io(e)) => Verdict::execution_error(format!("{}: {}", UNEXPECTED, e)),
        }
    }

    /// Spawn the planner and collect stdout followed by stderr
    async fn run_planner(
        &self,
        planner: &Path,
        workdir: &Path,
        domain: &Path,
        problem: &Path,
    ) -> Result<String, RunFailure> {
        debug!(?planner, search = %self.config.search, "run_planner: spawning");
        let mut child = self
            .command(planner, workdir, domain, problem)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => RunFailure::NotFound,
                _ => RunFailure::Io(e),
            })?;

        // Drain both pipes while waiting so a chatty planner cannot fill the
        // pipe buffer and deadlock.
        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();

        let read_stdout = async {
            let mut buf = Vec::new();
            if let Some(ref mut pipe) = stdout_pipe {
                pipe.read_to_end(&mut buf).await.ok();
            }
            String::from_utf8_lossy(&buf).into_owned()
        };

        let read_stderr = async {
            let mut buf = Vec::new();
            if let Some(ref mut pipe) = stderr_pipe {
                pipe.read_to_end(&mut buf).await.ok();
            }
            String::from_utf8_lossy(&buf).into_owned()
        };

        let timeout = self.config.timeout();
        match tokio::time::timeout(timeout, async {
            let (wait_result, stdout, stderr) = tokio::join!(child.wait(), read_stdout, read_stderr);
            (wait_result, stdout, stderr)
        })
        .await
        {
            Ok((Ok(status), stdout, stderr)) => {
                debug!(exit_code = ?status.code(), stdout_len = stdout.len(), stderr_len = stderr.len(), "run_planner: exited");
                Ok(format!("{}{}", stdout, stderr))
            }
            Ok((Err(e), _, _)) => {
                debug!(error = %e, "run_planner: wait failed");
                Err(RunFailure::Io(e))
            }
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "run_planner: timed out, terminating");
                terminate(&mut child).await;
                Err(RunFailure::TimedOut)
            }
        }
    }
}

#[async_trait]
impl ValidationOracle for FastDownwardOracle {
    async fn validate(&self, artifacts: &ArtifactPair) -> Verdict {
        debug!(
            domain_len = artifacts.domain.len(),
            problem_len = artifacts.problem.len(),
            "FastDownwardOracle::validate: called"
        );
        let start = Instant::now();

        let workspace = match self.create_workspace() {
            Ok(dir) => dir,
            Err(e) => {
                warn!(error = %e, "FastDownwardOracle::validate: could not create working directory");
                return Verdict::execution_error(format!("{}: could not create working directory: {}", UNEXPECTED, e));
            }
        };
        let workdir = workspace.path().to_path_buf();
        debug!(?workdir, "FastDownwardOracle::validate: working directory created");

        let verdict = self.validate_in(&workdir, artifacts).await;

        // TempDir removes itself on drop as well; closing explicitly surfaces
        // removal errors in the log.
        if let Err(e) = workspace.close() {
            warn!(?workdir, error = %e, "FastDownwardOracle::validate: failed to remove working directory");
        }

        info!(
            status = %verdict.status,
            duration_ms = start.elapsed().as_millis() as u64,
            "Planner verdict: {}",
            verdict.message
        );
        verdict
    }
}

#[cfg(unix)]
fn isolate_process_group(command: &mut Command) {
    command.process_group(0);
}

#[cfg(not(unix))]
fn isolate_process_group(_command: &mut Command) {}

/// Kill the planner and everything it spawned
async fn terminate(child: &mut Child) {
    kill_process_group(child);
    if let Err(e) = child.kill().await {
        debug!(error = %e, "terminate: kill failed (already exited?)");
    }
}

#[cfg(unix)]
fn kill_process_group(child: &Child) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    if let Some(pid) = child.id() {
        match i32::try_from(pid) {
            Ok(raw) => {
                if let Err(e) = killpg(Pid::from_raw(raw), Signal::SIGKILL) {
                    debug!(pid, error = %e, "kill_process_group: killpg failed");
                }
            }
            Err(_) => debug!(pid, "kill_process_group: pid out of range"),
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &Child) {}
