//! QuestMaster - narrative quests to validated PDDL
//!
//! CLI entry point: runs sessions, validates existing files and inspects
//! lore documents.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use questmaster::cli::{Cli, Command, OutputFormat, RunArgs, generate_after_help, get_log_path};
use questmaster::config::Config;
use questmaster::domain::{ArtifactPair, StorySpec};
use questmaster::llm::create_client;
use questmaster::planner::{FastDownwardOracle, ValidationOracle};
use questmaster::repair::{ApprovalGate, AutoApprove, ConsoleApproval};
use questmaster::session::SessionEngine;
use questmaster::story::{LORE_CANDIDATES, find_lore_file, load_story, prompt_lore, prompt_story};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Build command with dynamic after_help that shows tool and key checks
    let cmd = Cli::command().after_help(generate_after_help());

    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!(
        "QuestMaster loaded config: provider={}, model={}",
        config.llm.provider, config.llm.model
    );

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Run(args)) => cmd_run(config, &args).await.map(|_| ExitCode::SUCCESS),
        None => {
            debug!("main: no command, defaulting to run");
            cmd_run(config, &RunArgs::default()).await.map(|_| ExitCode::SUCCESS)
        }
        Some(Command::Validate {
            domain,
            problem,
            planner,
            format,
        }) => cmd_validate(config, &domain, &problem, planner, format).await,
        Some(Command::Story { path }) => cmd_story(path.as_deref()).map(|_| ExitCode::SUCCESS),
    }
}

/// Run a full session
async fn cmd_run(mut config: Config, args: &RunArgs) -> Result<()> {
    debug!(?args, "cmd_run: called");
    args.apply(&mut config);
    config.validate()?;

    let story = resolve_story(args.lore_file.as_deref())?;
    println!("{} {}", "Branching:".bold(), story.branching);
    println!("{} {}", "Depth:".bold(), story.depth);

    let llm = create_client(&config.llm).context("Failed to create LLM client")?;
    let oracle: Arc<dyn ValidationOracle> = Arc::new(FastDownwardOracle::new(config.planner.clone()));
    let gate: Arc<dyn ApprovalGate> = if config.session.interactive {
        Arc::new(ConsoleApproval::default())
    } else {
        Arc::new(AutoApprove)
    };

    let output_dir = config.session.output_dir.clone();
    let engine = SessionEngine::new(&config, story, llm, oracle, gate);
    println!("{} {}", "Session:".bold(), engine.session_id);
    println!("Generating PDDL with {}...", config.llm.model);

    let report = engine.run().await?;

    println!();
    if report.valid() {
        println!("{} {}", "Final status:".bold(), report.final_verdict.message.green());
    } else {
        println!(
            "{} {} ({})",
            "Final status:".bold(),
            report.final_verdict.message.yellow(),
            report.final_verdict.status
        );
    }
    println!("{} {}", "Repair attempts:".bold(), report.attempt_count);
    println!("Outputs saved in '{}'", output_dir.display());
    Ok(())
}

/// Find the story: explicit file, lore file in the working directory, or the terminal
fn resolve_story(lore_file: Option<&Path>) -> Result<StorySpec> {
    debug!(?lore_file, "resolve_story: called");
    let path = match lore_file {
        Some(path) => Some(path.to_path_buf()),
        None => find_lore_file(&std::env::current_dir().context("Failed to read current directory")?),
    };

    let Some(path) = path else {
        debug!("resolve_story: no lore file, asking interactively");
        return prompt_story();
    };

    println!("Lore file found: {}", path.display());
    match load_story(&path) {
        Ok(story) => Ok(story),
        Err(e) => {
            warn!("Failed to load lore file, asking for the lore: {}", e);
            eprintln!("{} {}", "Error reading lore file:".red(), e);
            prompt_lore()
        }
    }
}

/// Validate existing files; exits 1 when no plan is found
async fn cmd_validate(
    mut config: Config,
    domain: &Path,
    problem: &Path,
    planner: Option<PathBuf>,
    format: OutputFormat,
) -> Result<ExitCode> {
    debug!(?domain, ?problem, ?planner, %format, "cmd_validate: called");
    if let Some(planner) = planner {
        config.planner.path = planner;
    }

    let artifacts = ArtifactPair::new(
        fs::read_to_string(domain).context(format!("Failed to read {}", domain.display()))?,
        fs::read_to_string(problem).context(format!("Failed to read {}", problem.display()))?,
    );

    let oracle = FastDownwardOracle::new(config.planner);
    let verdict = oracle.validate(&artifacts).await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&verdict)?),
        OutputFormat::Text => {
            let status = if verdict.is_solved() {
                verdict.status.to_string().green()
            } else {
                verdict.status.to_string().red()
            };
            println!("{} {}", "Status:".bold(), status);
            println!("{} {}", "Message:".bold(), verdict.message);
        }
    }

    if verdict.is_solved() {
        Ok(ExitCode::SUCCESS)
    } else {
        info!("Validation failed: {}", verdict.status);
        Ok(ExitCode::FAILURE)
    }
}

/// Print the story parsed from a lore file
fn cmd_story(path: Option<&Path>) -> Result<()> {
    debug!(?path, "cmd_story: called");
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => find_lore_file(&std::env::current_dir().context("Failed to read current directory")?)
            .ok_or_else(|| eyre::eyre!("No lore file found (looked for {})", LORE_CANDIDATES.join(", ")))?,
    };

    let story = load_story(&path)?;
    println!("{}", serde_json::to_string_pretty(&story)?);
    Ok(())
}
