//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Initial artifact generation prompt
pub const GENERATE: &str = include_str!("../../prompts/generate.pmt");

/// Repair prompt for a failing artifact pair
pub const REPAIR: &str = include_str!("../../prompts/repair.pmt");

/// Suffix appended to the repair prompt after a human rejection
pub const FEEDBACK: &str = include_str!("../../prompts/feedback.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "generate" => {
            debug!("get_embedded: matched generate");
            Some(GENERATE)
        }
        "repair" => {
            debug!("get_embedded: matched repair");
            Some(REPAIR)
        }
        "feedback" => {
            debug!("get_embedded: matched feedback");
            Some(FEEDBACK)
        }
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}
