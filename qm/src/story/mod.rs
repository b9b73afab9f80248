//! Story ingestion: lore files and interactive entry

mod document;
mod interactive;
mod narrative;

pub use document::docx_text;
pub use interactive::{prompt_lore, prompt_story};
pub use narrative::{LORE_CANDIDATES, StoryError, extract_section, find_lore_file, load_story, parse_range};
