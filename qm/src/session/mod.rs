//! Session orchestration and persistence

mod engine;
mod store;

pub use engine::SessionEngine;
pub use store::{
    ATTEMPTS_DIR, DOMAIN_FILE, INITIAL_ATTEMPT_DIR, PROBLEM_FILE, REPORT_FILE, SessionStore, VERDICT_FILE,
};
