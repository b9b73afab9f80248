//! QuestMaster configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Main QuestMaster configuration
///
/// Passed explicitly into every component; nothing reads process-wide state
/// after startup apart from the API key lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Generative model configuration
    pub llm: LlmConfig,

    /// External planner configuration
    pub planner: PlannerConfig,

    /// Session loop configuration
    pub session: SessionConfig,

    /// Prompt template configuration
    pub prompts: PromptsConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that required environment variables are set.
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        debug!(api_key_env = %self.llm.api_key_env, "Config::validate: called");
        if std::env::var(&self.llm.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.llm.api_key_env
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .questmaster.yml
        let local_config = PathBuf::from(".questmaster.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/questmaster/questmaster.yml
        if let Some(user_config) = Self::user_config_path()
            && user_config.exists()
        {
            match Self::load_from_file(&user_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialised
    ///
    /// Errors are swallowed: the full load reports them once logging is up.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => {
                let mut paths = vec![PathBuf::from(".questmaster.yml")];
                paths.extend(Self::user_config_path());
                paths
            }
        };

        candidates
            .into_iter()
            .find(|p| p.exists())
            .and_then(|p| fs::read_to_string(p).ok())
            .and_then(|content| serde_yaml::from_str::<Self>(&content).ok())
            .and_then(|config| config.log_level)
    }

    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("questmaster").join("questmaster.yml"))
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Generative model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name ("gemini" or "openai")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL (provider default when unset)
    #[serde(rename = "base-url")]
    pub base_url: Option<String>,

    /// Sampling temperature, shared by generation and repair
    pub temperature: f32,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            base_url: None,
            temperature: 0.4,
            max_tokens: 8192,
            timeout_ms: 300_000,
        }
    }
}

impl LlmConfig {
    /// Base URL to use, falling back to the provider's public endpoint
    pub fn effective_base_url(&self) -> String {
        if let Some(url) = &self.base_url {
            return url.trim_end_matches('/').to_string();
        }
        match self.provider.as_str() {
            "openai" => "https://api.openai.com".to_string(),
            _ => "https://generativelanguage.googleapis.com".to_string(),
        }
    }

    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .map_err(|_| eyre::eyre!("Environment variable {} is not set", self.api_key_env))
    }

    /// Request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// External planner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Planner entry point (script or executable)
    pub path: PathBuf,

    /// Interpreter used to launch `path`; empty runs `path` directly
    pub interpreter: String,

    /// Search configuration passed after `--search`
    pub search: String,

    /// Wall-clock limit per validation in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Parent directory for per-validation scratch directories
    #[serde(rename = "work-dir")]
    pub work_dir: Option<PathBuf>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./fast-downward.py"),
            interpreter: "python".to_string(),
            search: "astar(blind())".to_string(),
            timeout_ms: 60_000,
            work_dir: None,
        }
    }
}

impl PlannerConfig {
    /// Validation timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Which part of the planner log feeds the repair prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExcerptStrategy {
    /// Leading characters of the log
    #[default]
    Head,
    /// Trailing characters of the log
    Tail,
}

/// Session loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum repair rounds before giving up
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Session root directory for persisted artifacts and the report
    #[serde(rename = "output-dir")]
    pub output_dir: PathBuf,

    /// Maximum planner-log characters embedded in a repair prompt
    #[serde(rename = "log-excerpt-chars")]
    pub log_excerpt_chars: usize,

    /// Which end of the planner log to keep
    #[serde(rename = "log-excerpt")]
    pub log_excerpt: ExcerptStrategy,

    /// Ask a human to approve each repair proposal
    pub interactive: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            output_dir: PathBuf::from("phase1_output"),
            log_excerpt_chars: 2000,
            log_excerpt: ExcerptStrategy::Head,
            interactive: false,
        }
    }
}

/// Prompt template configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Directory holding `.pmt` overrides
    pub dir: Option<PathBuf>,
}
