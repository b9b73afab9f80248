//! Interactive story entry on the terminal

use colored::Colorize;
use eyre::{Result, eyre};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use super::narrative::parse_range;
use crate::domain::{RangeSpec, StorySpec};

/// Ask for lore, branching factor and depth
pub fn prompt_story() -> Result<StorySpec> {
    debug!("prompt_story: called");
    let mut rl = editor()?;

    println!("{}", "No lore file found, enter the story manually.".yellow());
    let lore = read_lore(&mut rl)?;

    let branching = read_line(&mut rl, "Branching factor (MIN-MAX, e.g. 2-3): ")?;
    let depth = read_line(&mut rl, "Depth (MIN-MAX, e.g. 2-3): ")?;

    Ok(StorySpec::new(lore, parse_range(&branching), parse_range(&depth)))
}

/// Ask for the lore only; both ranges stay unspecified
///
/// Used when a lore file exists but cannot be read.
pub fn prompt_lore() -> Result<StorySpec> {
    debug!("prompt_lore: called");
    let mut rl = editor()?;
    let lore = read_lore(&mut rl)?;
    Ok(StorySpec::new(lore, RangeSpec::unspecified(), RangeSpec::unspecified()))
}

fn editor() -> Result<DefaultEditor> {
    DefaultEditor::new().map_err(|e| eyre!("Failed to initialize readline: {}", e))
}

fn read_lore(rl: &mut DefaultEditor) -> Result<String> {
    println!("Describe your story (lore):");
    let lore = read_line(rl, "> ")?;
    if lore.is_empty() {
        return Err(eyre!("No lore provided"));
    }
    Ok(lore)
}

fn read_line(rl: &mut DefaultEditor, prompt: &str) -> Result<String> {
    match rl.readline(prompt) {
        Ok(line) => Ok(line.trim().to_string()),
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Err(eyre!("Story entry cancelled")),
        Err(e) => Err(eyre!("Readline error: {}", e)),
    }
}
