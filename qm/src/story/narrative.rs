//! Narrative document parsing
//!
//! A lore file is free text with optional labelled sections:
//!
//! ```text
//! Quest Description: The knight must ...
//! Branching Factor: 2-3
//! Depth Constraints: 3 – 5
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use thiserror::Error;
use tracing::{debug, info};

use super::document::docx_text;
use crate::domain::{Bound, RangeSpec, StorySpec};

/// Lore files looked for in a directory, in order
pub const LORE_CANDIDATES: [&str; 4] = ["lore.docx", "lore.doc", "lore.txt", "lore.md"];

/// Errors while reading a narrative document
#[derive(Debug, Error)]
pub enum StoryError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported narrative format: {0} (use .docx, plain text or markdown)")]
    Unsupported(PathBuf),

    #[error("failed to read document {path}: {reason}")]
    Document { path: PathBuf, reason: String },

    #[error("narrative file is empty: {0}")]
    Empty(PathBuf),
}

/// First lore file present in `dir`
pub fn find_lore_file(dir: &Path) -> Option<PathBuf> {
    debug!(?dir, "find_lore_file: called");
    LORE_CANDIDATES.iter().map(|name| dir.join(name)).find(|path| path.is_file())
}

/// Text following `label:` up to the next `Header:` line, trimmed
///
/// Returns an empty string when the label is absent.
pub fn extract_section(text: &str, label: &str) -> String {
    let pattern = format!(r"(?is){}:(.*?)(?:\n[A-Z][a-zA-Z ]+:|$)", regex::escape(label));
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            debug!(%label, error = %e, "extract_section: invalid pattern");
            return String::new();
        }
    };

    match re.captures(text).and_then(|caps| caps.get(1)) {
        Some(m) => m.as_str().trim().to_string(),
        None => {
            debug!(%label, "extract_section: label not found");
            String::new()
        }
    }
}

/// Parse a `MIN-MAX` range; en dash, em dash and minus sign count as `-`
pub fn parse_range(text: &str) -> RangeSpec {
    let normalized: String = text
        .trim()
        .chars()
        .map(|c| match c {
            '\u{2013}' | '\u{2014}' | '\u{2212}' => '-',
            other => other,
        })
        .collect();

    let parts: Vec<&str> = normalized.split('-').collect();
    match parts.as_slice() {
        [min, max] => RangeSpec {
            min: Bound::parse(min),
            max: Bound::parse(max),
        },
        _ => {
            debug!(%normalized, "parse_range: not a MIN-MAX pair");
            RangeSpec::unspecified()
        }
    }
}

impl StorySpec {
    /// Build a story from narrative text
    ///
    /// The lore is the "Quest Description" section, or the whole text when
    /// that section is missing.
    pub fn from_narrative(text: &str) -> Self {
        debug!(len = text.len(), "StorySpec::from_narrative: called");
        let description = extract_section(text, "Quest Description");
        let lore = if description.is_empty() {
            text.trim().to_string()
        } else {
            description
        };

        Self::new(
            lore,
            parse_range(&extract_section(text, "Branching Factor")),
            parse_range(&extract_section(text, "Depth Constraints")),
        )
    }
}

/// Read and parse a narrative file
pub fn load_story(path: &Path) -> Result<StorySpec, StoryError> {
    debug!(?path, "load_story: called");
    let extension = path.extension().and_then(|e| e.to_str()).map(str::to_lowercase);
    let text = match extension.as_deref() {
        Some("docx") => docx_text(path)?,
        Some("doc") => return Err(StoryError::Unsupported(path.to_path_buf())),
        _ => fs::read_to_string(path).map_err(|source| StoryError::Read {
            path: path.to_path_buf(),
            source,
        })?,
    };
    if text.trim().is_empty() {
        return Err(StoryError::Empty(path.to_path_buf()));
    }

    let story = StorySpec::from_narrative(&text);
    info!(
        "Loaded lore from {} (branching: {}, depth: {})",
        path.display(),
        story.branching,
        story.depth
    );
    Ok(story)
}
