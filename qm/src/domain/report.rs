//! SessionReport domain type
//!
//! Written once when a session reaches its terminal state. The on-disk form
//! (`report.json`) carries the story, both range constraints, the final
//! validity flag and the final validation message.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::{ArtifactPair, RangeSpec, StorySpec, Verdict, VerdictStatus};

/// Final record of a session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    /// Session identifier (uuid v7)
    pub session_id: String,

    /// When the report was produced
    pub generated_at: DateTime<Utc>,

    /// The narrative the session was generated from
    pub story: StorySpec,

    /// Artifacts current at the end of the session, solved or not
    pub final_artifacts: ArtifactPair,

    /// The last verdict computed against `final_artifacts`
    pub final_verdict: Verdict,

    /// Number of repair rounds performed
    pub attempt_count: u32,
}

/// Serialized shape of `report.json`
#[derive(Serialize)]
struct ReportFile<'a> {
    session_id: &'a str,
    generated_at: String,
    lore: &'a str,
    branching: &'a RangeSpec,
    depth: &'a RangeSpec,
    valid: bool,
    status: VerdictStatus,
    validation_message: &'a str,
    attempt_count: u32,
}

impl SessionReport {
    /// Create a report stamped with the current time
    pub fn new(
        session_id: impl Into<String>,
        story: StorySpec,
        final_artifacts: ArtifactPair,
        final_verdict: Verdict,
        attempt_count: u32,
    ) -> Self {
        let session_id = session_id.into();
        debug!(%session_id, status = %final_verdict.status, attempt_count, "SessionReport::new: called");
        Self {
            session_id,
            generated_at: Utc::now(),
            story,
            final_artifacts,
            final_verdict,
            attempt_count,
        }
    }

    /// True when the final verdict is `Solved`
    pub fn valid(&self) -> bool {
        self.final_verdict.is_solved()
    }

    /// Render the report as pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        let file = ReportFile {
            session_id: &self.session_id,
            generated_at: self.generated_at.to_rfc3339(),
            lore: &self.story.lore,
            branching: &self.story.branching,
            depth: &self.story.depth,
            valid: self.valid(),
            status: self.final_verdict.status,
            validation_message: &self.final_verdict.message,
            attempt_count: self.attempt_count,
        };
        serde_json::to_string_pretty(&file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_json_shape() {
        let story = StorySpec::new("A knight seeks a grail", RangeSpec::new(2, 3), RangeSpec::unspecified());
        let verdict = Verdict::new(VerdictStatus::Unsolvable, "goal unreachable", "log");
        let report = SessionReport::new("sess-1", story, ArtifactPair::new("d", "p"), verdict, 5);

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["session_id"], "sess-1");
        assert_eq!(json["lore"], "A knight seeks a grail");
        assert_eq!(json["branching"]["min"], 2);
        assert_eq!(json["branching"]["max"], 3);
        assert_eq!(json["depth"]["min"], "N/A");
        assert_eq!(json["valid"], false);
        assert_eq!(json["status"], "unsolvable");
        assert_eq!(json["validation_message"], "goal unreachable");
        assert_eq!(json["attempt_count"], 5);
        assert!(json.get("raw_log").is_none());
    }

    #[test]
    fn test_report_valid_follows_verdict() {
        let story = StorySpec::new("lore", RangeSpec::new(1, 2), RangeSpec::new(1, 2));
        let solved = Verdict::new(VerdictStatus::Solved, "ok", "");
        let report = SessionReport::new("s", story, ArtifactPair::empty(), solved, 0);
        assert!(report.valid());
    }
}
