//! Flat-file persistence for a session
//!
//! Layout under the session root:
//!
//! ```text
//! initial_attempt/domain.pddl
//! initial_attempt/problem.pddl
//! initial_attempt/verdict.json
//! attempts/attempt-1/{domain.pddl, problem.pddl, verdict.json}
//! ...
//! domain.pddl
//! problem.pddl
//! report.json
//! ```
//!
//! Every `verdict.json` carries the session id and attempt number. A new
//! session clears the attempt folders and report left by an earlier one.

use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use serde::Serialize;
use tracing::debug;

use crate::domain::{ArtifactPair, SessionReport, Verdict};

pub const INITIAL_ATTEMPT_DIR: &str = "initial_attempt";
pub const ATTEMPTS_DIR: &str = "attempts";
pub const DOMAIN_FILE: &str = "domain.pddl";
pub const PROBLEM_FILE: &str = "problem.pddl";
pub const VERDICT_FILE: &str = "verdict.json";
pub const REPORT_FILE: &str = "report.json";

/// Writes every attempt, the final artifacts and the report
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
    session_id: String,
}

/// On-disk shape of `verdict.json`
#[derive(Serialize)]
struct VerdictRecord<'a> {
    session_id: &'a str,
    attempt: u32,
    #[serde(flatten)]
    verdict: &'a Verdict,
}

impl SessionStore {
    pub fn new(root: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        let root = root.into();
        let session_id = session_id.into();
        debug!(?root, %session_id, "SessionStore::new: called");
        Self { root, session_id }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Remove attempts and the report written by a previous session
    pub fn begin(&self) -> Result<()> {
        debug!(session_id = %self.session_id, root = ?self.root, "SessionStore::begin: called");
        for dir in [self.root.join(INITIAL_ATTEMPT_DIR), self.root.join(ATTEMPTS_DIR)] {
            if dir.is_dir() {
                debug!(?dir, "SessionStore::begin: removing stale attempts");
                fs::remove_dir_all(&dir).context(format!("Failed to remove {}", dir.display()))?;
            }
        }
        let report = self.root.join(REPORT_FILE);
        if report.is_file() {
            fs::remove_file(&report).context(format!("Failed to remove {}", report.display()))?;
        }
        Ok(())
    }

    /// Directory for attempt `n` (0 is the initial generation)
    pub fn attempt_dir(&self, attempt: u32) -> PathBuf {
        if attempt == 0 {
            self.root.join(INITIAL_ATTEMPT_DIR)
        } else {
            self.root.join(ATTEMPTS_DIR).join(format!("attempt-{}", attempt))
        }
    }

    /// Persist the artifacts produced by attempt `n`
    pub fn save_artifacts(&self, attempt: u32, artifacts: &ArtifactPair) -> Result<PathBuf> {
        let dir = self.attempt_dir(attempt);
        debug!(attempt, ?dir, "SessionStore::save_artifacts: called");
        write_pair(&dir, artifacts)?;
        Ok(dir)
    }

    /// Persist the verdict computed for attempt `n`
    pub fn save_verdict(&self, attempt: u32, verdict: &Verdict) -> Result<()> {
        let dir = self.attempt_dir(attempt);
        debug!(attempt, status = %verdict.status, "SessionStore::save_verdict: called");
        fs::create_dir_all(&dir).context(format!("Failed to create {}", dir.display()))?;
        let record = VerdictRecord {
            session_id: &self.session_id,
            attempt,
            verdict,
        };
        let json = serde_json::to_string_pretty(&record).context("Failed to serialize verdict")?;
        let path = dir.join(VERDICT_FILE);
        fs::write(&path, json).context(format!("Failed to write {}", path.display()))
    }

    /// Persist the final artifacts and `report.json` at the session root
    pub fn save_final(&self, report: &SessionReport) -> Result<()> {
        debug!(session_id = %report.session_id, "SessionStore::save_final: called");
        write_pair(&self.root, &report.final_artifacts)?;
        let json = report.to_json().context("Failed to serialize session report")?;
        let path = self.root.join(REPORT_FILE);
        fs::write(&path, json).context(format!("Failed to write {}", path.display()))
    }
}

fn write_pair(dir: &Path, artifacts: &ArtifactPair) -> Result<()> {
    fs::create_dir_all(dir).context(format!("Failed to create {}", dir.display()))?;
    let domain = dir.join(DOMAIN_FILE);
    fs::write(&domain, &artifacts.domain).context(format!("Failed to write {}", domain.display()))?;
    let problem = dir.join(PROBLEM_FILE);
    fs::write(&problem, &artifacts.problem).context(format!("Failed to write {}", problem.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RangeSpec, StorySpec, VerdictStatus};
    use tempfile::tempdir;

    #[test]
    fn test_attempt_dirs() {
        let store = SessionStore::new("/out", "s-1");
        assert_eq!(store.attempt_dir(0), PathBuf::from("/out/initial_attempt"));
        assert_eq!(store.attempt_dir(3), PathBuf::from("/out/attempts/attempt-3"));
    }

    #[test]
    fn test_save_initial_attempt() {
        let temp = tempdir().unwrap();
        let store = SessionStore::new(temp.path().join("session"), "s-1");
        let pair = ArtifactPair::new("(define (domain d))", "(define (problem p))");

        store.save_artifacts(0, &pair).unwrap();
        store
            .save_verdict(0, &Verdict::new(VerdictStatus::SyntaxError, "bad", "parse error"))
            .unwrap();

        let dir = temp.path().join("session/initial_attempt");
        assert_eq!(fs::read_to_string(dir.join("domain.pddl")).unwrap(), "(define (domain d))");
        assert_eq!(fs::read_to_string(dir.join("problem.pddl")).unwrap(), "(define (problem p))");
        let raw = fs::read_to_string(dir.join("verdict.json")).unwrap();
        let verdict: Verdict = serde_json::from_str(&raw).unwrap();
        assert_eq!(verdict.status, VerdictStatus::SyntaxError);
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["session_id"], "s-1");
        assert_eq!(json["attempt"], 0);
    }

    #[test]
    fn test_save_final() {
        let temp = tempdir().unwrap();
        let store = SessionStore::new(temp.path(), "s-1");
        let report = SessionReport::new(
            "s-1",
            StorySpec::new("lore", RangeSpec::new(2, 3), RangeSpec::new(2, 3)),
            ArtifactPair::new("final-d", "final-p"),
            Verdict::new(VerdictStatus::Solved, "Valid plan found", "Solution found!"),
            1,
        );

        store.save_final(&report).unwrap();

        assert_eq!(fs::read_to_string(temp.path().join("domain.pddl")).unwrap(), "final-d");
        assert_eq!(fs::read_to_string(temp.path().join("problem.pddl")).unwrap(), "final-p");
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(temp.path().join("report.json")).unwrap()).unwrap();
        assert_eq!(json["valid"], true);
        assert_eq!(json["attempt_count"], 1);
    }

    #[test]
    fn test_save_into_file_path_fails() {
        let temp = tempdir().unwrap();
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let store = SessionStore::new(&blocker, "s-1");
        assert!(store.save_artifacts(0, &ArtifactPair::empty()).is_err());
    }

    #[test]
    fn test_begin_clears_previous_session() {
        let temp = tempdir().unwrap();
        let old = SessionStore::new(temp.path(), "old");
        old.save_artifacts(0, &ArtifactPair::new("d0", "p0")).unwrap();
        old.save_artifacts(3, &ArtifactPair::new("d3", "p3")).unwrap();
        old.save_verdict(3, &Verdict::new(VerdictStatus::Unsolvable, "no plan", "unsolvable"))
            .unwrap();
        fs::write(temp.path().join(REPORT_FILE), "{}").unwrap();

        let new = SessionStore::new(temp.path(), "new");
        new.begin().unwrap();

        assert!(!temp.path().join("attempts").exists());
        assert!(!temp.path().join("initial_attempt").exists());
        assert!(!temp.path().join(REPORT_FILE).exists());
    }

    #[test]
    fn test_begin_on_fresh_root() {
        let temp = tempdir().unwrap();
        let store = SessionStore::new(temp.path().join("missing"), "s-1");
        store.begin().unwrap();
        assert!(!temp.path().join("missing").exists());
    }
}
