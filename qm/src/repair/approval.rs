//! Human-in-the-loop approval gate
//!
//! A repair proposal is shown to a reviewer before it replaces the current
//! artifacts. Non-interactive sessions use [`AutoApprove`].

use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, warn};

use crate::domain::RepairProposal;

/// Characters of each artifact shown in a console preview
pub const PREVIEW_CHARS: usize = 800;

/// Reviewer decision on a repair proposal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Approval {
    Accepted,
    /// Rejected, with guidance for one more repair round
    Rejected { feedback: String },
}

/// Synchronous review of a repair proposal
pub trait ApprovalGate: Send + Sync {
    fn review(&self, proposal: &RepairProposal) -> Approval;
}

/// Accepts every proposal
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

impl ApprovalGate for AutoApprove {
    fn review(&self, _proposal: &RepairProposal) -> Approval {
        debug!("AutoApprove::review: called");
        Approval::Accepted
    }
}

/// Asks the author on the terminal
#[derive(Debug, Clone, Copy)]
pub struct ConsoleApproval {
    preview_chars: usize,
}

impl Default for ConsoleApproval {
    fn default() -> Self {
        Self {
            preview_chars: PREVIEW_CHARS,
        }
    }
}

impl ConsoleApproval {
    fn print_preview(&self, proposal: &RepairProposal) {
        println!();
        println!("{}", "--- DOMAIN (proposed) ---".bright_cyan());
        println!("{}", preview(&proposal.artifacts.domain, self.preview_chars));
        println!();
        println!("{}", "--- PROBLEM (proposed) ---".bright_cyan());
        println!("{}", preview(&proposal.artifacts.problem, self.preview_chars));
    }
}

impl ApprovalGate for ConsoleApproval {
    fn review(&self, proposal: &RepairProposal) -> Approval {
        debug!("ConsoleApproval::review: called");
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                warn!("Failed to initialize readline, accepting proposal: {}", e);
                return Approval::Accepted;
            }
        };

        println!();
        println!("{}", "The repair agent proposed the following changes:".bold());
        println!("{} {}", "Explanation:".yellow(), proposal.explanation);
        println!();

        if let Some(answer) = ask(&mut rl, "Preview the changes? [y/N]: ")
            && is_yes(&answer)
        {
            self.print_preview(proposal);
        }

        let Some(answer) = ask(&mut rl, "\nApprove these changes? [y/N]: ") else {
            warn!("No answer to approval prompt, accepting proposal");
            return Approval::Accepted;
        };

        if is_yes(&answer) {
            println!("{}", "Changes approved.".green());
            return Approval::Accepted;
        }

        println!("Enter feedback for the repair agent (what to improve, what to keep):");
        let feedback = ask(&mut rl, "> ").unwrap_or_default();
        debug!(feedback_len = feedback.len(), "ConsoleApproval::review: rejected");
        Approval::Rejected { feedback }
    }
}

fn ask(rl: &mut DefaultEditor, prompt: &str) -> Option<String> {
    match rl.readline(prompt) {
        Ok(line) => Some(line.trim().to_string()),
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
            debug!("ask: input closed");
            None
        }
        Err(e) => {
            warn!("Readline error: {}", e);
            None
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.to_lowercase().as_str(), "y" | "yes")
}

/// First `limit` characters of `text`, with `...` when truncated
pub fn preview(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ArtifactPair;

    #[test]
    fn test_auto_approve() {
        let proposal = RepairProposal::new(ArtifactPair::new("d", "p"), "fixed");
        assert_eq!(AutoApprove.review(&proposal), Approval::Accepted);
    }

    #[test]
    fn test_preview_short_text_untouched() {
        assert_eq!(preview("(define)", 800), "(define)");
        assert_eq!(preview("", 800), "");
    }

    #[test]
    fn test_preview_truncates_with_ellipsis() {
        let text = "a".repeat(1000);
        let shown = preview(&text, PREVIEW_CHARS);
        assert_eq!(shown.len(), 803);
        assert!(shown.ends_with("..."));
    }

    #[test]
    fn test_preview_exact_limit_not_marked() {
        let text = "b".repeat(800);
        assert_eq!(preview(&text, 800), text);
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        assert_eq!(preview("ééé", 2), "éé...");
    }

    #[test]
    fn test_is_yes() {
        assert!(is_yes("Y"));
        assert!(is_yes("yes"));
        assert!(!is_yes("n"));
        assert!(!is_yes(""));
    }
}
