//! CLI command definitions and subcommands

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::Config;

/// QuestMaster - narrative quests to validated PDDL
#[derive(Parser)]
#[command(
    name = "qm",
    about = "Generate PDDL planning models from narrative quests and repair them until a planner accepts them",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute (defaults to `run`)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a full session: generate, validate, repair, report
    Run(RunArgs),

    /// Validate an existing domain/problem pair with the planner
    Validate {
        /// Domain file
        domain: PathBuf,

        /// Problem file
        problem: PathBuf,

        /// Planner entry point (overrides config)
        #[arg(short, long)]
        planner: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Parse a lore file and print the resulting story specification
    Story {
        /// Lore file (defaults to lore.txt or lore.md in the current directory)
        path: Option<PathBuf>,
    },
}

/// Options for a full session
#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Lore file (defaults to lore.txt or lore.md in the current directory)
    #[arg(short = 'f', long)]
    pub lore_file: Option<PathBuf>,

    /// Planner entry point (overrides config)
    #[arg(short, long)]
    pub planner: Option<PathBuf>,

    /// Maximum repair attempts (overrides config)
    #[arg(short, long)]
    pub max_attempts: Option<u32>,

    /// Session output directory (overrides config)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Review every repair proposal before it is applied
    #[arg(short, long)]
    pub interactive: bool,
}

impl RunArgs {
    /// Apply command-line overrides on top of the loaded config
    pub fn apply(&self, config: &mut Config) {
        debug!(?self, "RunArgs::apply: called");
        if let Some(planner) = &self.planner {
            config.planner.path = planner.clone();
        }
        if let Some(max_attempts) = self.max_attempts {
            config.session.max_attempts = max_attempts;
        }
        if let Some(output_dir) = &self.output_dir {
            config.session.output_dir = output_dir.clone();
        }
        if self.interactive {
            config.session.interactive = true;
        }
    }
}

/// Result of checking a required tool
pub struct ToolCheck {
    pub name: &'static str,
    pub available: bool,
    pub version: Option<String>,
}

impl ToolCheck {
    /// Check if a tool is available and get its version
    pub fn check(name: &'static str, version_args: &[&str]) -> Self {
        debug!(name, ?version_args, "ToolCheck::check: called");
        let result = std::process::Command::new(name).args(version_args).output();

        match result {
            Ok(output) if output.status.success() => {
                debug!(name, "ToolCheck::check: tool available");
                // Older interpreters print their version on stderr
                let version_str = if output.stdout.is_empty() {
                    String::from_utf8_lossy(&output.stderr)
                } else {
                    String::from_utf8_lossy(&output.stdout)
                };
                Self {
                    name,
                    available: true,
                    version: Some(parse_version(&version_str)),
                }
            }
            _ => {
                debug!(name, "ToolCheck::check: tool not available");
                Self {
                    name,
                    available: false,
                    version: None,
                }
            }
        }
    }
}

/// Parse version from command output (extracts first version-like string)
fn parse_version(output: &str) -> String {
    debug!(%output, "parse_version: called");
    // Look for patterns like "1.2.3" or "v1.2.3"
    for word in output.split_whitespace() {
        let word = word.trim_start_matches('v');
        if word.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            let version: String = word.chars().take_while(|c| c.is_ascii_digit() || *c == '.').collect();
            if !version.is_empty() {
                debug!(%version, "parse_version: found version");
                return version;
            }
        }
    }
    debug!("parse_version: no version found, returning unknown");
    "unknown".to_string()
}

/// Check the interpreter the default planner configuration launches
pub fn check_required_tools() -> Vec<ToolCheck> {
    debug!("check_required_tools: called");
    vec![ToolCheck::check("python", &["--version"])]
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("questmaster")
        .join("logs")
        .join("questmaster.log");
    debug!(?path, "get_log_path: returning path");
    path
}

fn status_icon(ok: bool) -> &'static str {
    if ok { "\u{2705}" } else { "\u{274C}" }
}

/// Generate the after_help text with tool, planner and API key checks
pub fn generate_after_help() -> String {
    debug!("generate_after_help: called");
    let defaults = Config::default();
    let tools = check_required_tools();
    let log_path = get_log_path();

    let mut help = String::new();

    help.push_str("Required Tools:\n");
    for tool in &tools {
        let version = tool.version.as_deref().unwrap_or("not found");
        help.push_str(&format!("  {} {:<10} {}\n", status_icon(tool.available), tool.name, version));
    }

    help.push('\n');
    help.push_str("Planner:\n");
    let planner: &Path = &defaults.planner.path;
    let planner_found = planner.exists();
    help.push_str(&format!(
        "  {} {} {}\n",
        status_icon(planner_found),
        planner.display(),
        if planner_found { "" } else { "(set planner.path or --planner)" }
    ));

    help.push('\n');
    help.push_str("API Keys:\n");
    for var in ["GEMINI_API_KEY", "OPENAI_API_KEY"] {
        let set = std::env::var(var).is_ok();
        help.push_str(&format!(
            "  {} {:<15} {}\n",
            status_icon(set),
            var,
            if set { "set" } else { "not set" }
        ));
    }

    help.push('\n');
    help.push_str(&format!("Logs are written to: {}\n", log_path.display()));

    debug!("generate_after_help: returning help text");
    help
}

/// Output format for the validate command
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => {
                debug!(%s, "OutputFormat::from_str: unknown format");
                Err(format!("Unknown format: {}. Use: text or json", s))
            }
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}
