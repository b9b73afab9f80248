//! Prompt Template System
//!
//! Loads and renders `.pmt` (prompt template) files for artifact generation
//! and repair.
//!
//! Template loading chain:
//! 1. `{prompts.dir}/{name}.pmt` (configured override)
//! 2. Embedded fallback in code
//!
//! Templates use Handlebars syntax for variable substitution, with HTML
//! escaping disabled.

pub mod embedded;
mod loader;

pub use loader::{FeedbackContext, GenerateContext, PromptLoader, RepairContext, repair_guidance};
