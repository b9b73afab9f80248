//! Prompt Loader
//!
//! Loads prompt templates from an override directory or falls back to
//! embedded defaults.

use std::path::PathBuf;

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::embedded;
use crate::domain::{ArtifactPair, StorySpec, Verdict, VerdictStatus};

/// Context for the initial generation prompt
#[derive(Debug, Clone, Serialize)]
pub struct GenerateContext {
    pub lore: String,
    pub branching: String,
    pub depth: String,
}

impl GenerateContext {
    /// Build the context from a story specification
    pub fn from_story(story: &StorySpec) -> Self {
        debug!(lore_len = story.lore.len(), "GenerateContext::from_story: called");
        Self {
            lore: story.lore.clone(),
            branching: story.branching.to_string(),
            depth: story.depth.to_string(),
        }
    }
}

/// Context for a repair prompt
#[derive(Debug, Clone, Serialize)]
pub struct RepairContext {
    pub status: String,
    pub message: String,
    pub guidance: String,
    pub excerpt_label: String,
    pub planner_log: String,
    pub domain: String,
    pub problem: String,
}

impl RepairContext {
    /// Build the context for `artifacts` failing with `verdict`
    ///
    /// `planner_log` is the already-bounded excerpt of the raw log.
    pub fn new(
        artifacts: &ArtifactPair,
        verdict: &Verdict,
        planner_log: String,
        excerpt_label: impl Into<String>,
    ) -> Self {
        debug!(status = %verdict.status, log_len = planner_log.len(), "RepairContext::new: called");
        Self {
            status: verdict.status.to_string(),
            message: verdict.message.clone(),
            guidance: repair_guidance(verdict.status).to_string(),
            excerpt_label: excerpt_label.into(),
            planner_log,
            domain: artifacts.domain.clone(),
            problem: artifacts.problem.clone(),
        }
    }
}

/// Context for the rejection feedback suffix
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackContext {
    pub feedback: String,
}

/// Status-specific hint so syntax fixes and logical fixes are asked for differently
pub fn repair_guidance(status: VerdictStatus) -> &'static str {
    match status {
        VerdictStatus::SyntaxError => {
            "The planner could not parse the files. Fix the PDDL syntax first: balanced parentheses, \
             declared requirements, types, predicates and parameters that match their uses."
        }
        VerdictStatus::Unsolvable | VerdictStatus::NoSolutionFound => {
            "The files parse but no plan reaches the goal. Check that the initial state and action \
             effects can actually achieve every goal fact, and that preconditions are not contradictory."
        }
        VerdictStatus::Timeout => {
            "The planner ran out of time. Reduce the size of the search space: fewer objects, \
             tighter preconditions, and a goal reachable within the requested depth."
        }
        VerdictStatus::ExecutionError => {
            "The planner failed while running. Check for constructs the planner does not support \
             and for objects or constants used without being declared."
        }
        VerdictStatus::Solved => "The files are already valid. Keep changes minimal.",
    }
}

/// Loads and renders prompt templates
#[derive(Clone)]
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// Override directory holding `{name}.pmt` files
    override_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a prompt loader with an optional override directory
    pub fn new(override_dir: Option<PathBuf>) -> Self {
        debug!(?override_dir, "PromptLoader::new: called");
        let override_dir = match override_dir {
            Some(dir) if dir.is_dir() => {
                debug!("PromptLoader::new: override directory found");
                Some(dir)
            }
            Some(dir) => {
                tracing::warn!("Prompt directory {} does not exist, using embedded prompts", dir.display());
                None
            }
            None => {
                debug!("PromptLoader::new: no override directory");
                None
            }
        };

        Self {
            hbs: Self::engine(),
            override_dir,
        }
    }

    /// Create a loader that only uses embedded prompts
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: Self::engine(),
            override_dir: None,
        }
    }

    // PDDL and planner logs are plain text; HTML escaping would corrupt them
    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template by name
    ///
    /// Checks in order:
    /// 1. Override: `{dir}/{name}.pmt`
    /// 2. Embedded fallback
    fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        if let Some(ref dir) = self.override_dir {
            let path = dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found in override directory");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read prompt {}: {}", path.display(), e));
            }
            debug!(?path, "PromptLoader::load_template: not found in override directory");
        }

        debug!("PromptLoader::load_template: trying embedded fallback");
        embedded::get_embedded(name)
            .map(str::to_string)
            .ok_or_else(|| eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render<T: Serialize>(&self, template_name: &str, context: &T) -> Result<String> {
        debug!(%template_name, "PromptLoader::render: called");
        let template = self.load_template(template_name)?;
        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }

    /// Render the initial generation prompt for `story`
    pub fn generate_prompt(&self, story: &StorySpec) -> Result<String> {
        self.render("generate", &GenerateContext::from_story(story))
    }

    /// Render the repair prompt
    pub fn repair_prompt(&self, context: &RepairContext) -> Result<String> {
        self.render("repair", context)
    }

    /// Render the repair prompt extended with human feedback
    pub fn feedback_prompt(&self, context: &RepairContext, feedback: &str) -> Result<String> {
        debug!(feedback_len = feedback.len(), "PromptLoader::feedback_prompt: called");
        let repair = self.repair_prompt(context)?;
        let suffix = self.render(
            "feedback",
            &FeedbackContext {
                feedback: feedback.to_string(),
            },
        )?;
        Ok(format!("{}\n\n{}", repair, suffix))
    }
}
