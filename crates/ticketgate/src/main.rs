//! ticketgate - access policy and time-in-state reports for a ticket tracker
//!
//! This binary is the command layer around the core crates:
//! - Settings loading
//! - Policy checks for projects, commands and records
//! - Search query narrowing
//! - Time-in-state statistics from exported change logs
//!
//! Tracker data is read from JSON files that were already fetched; nothing
//! here talks to the network.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use ticketgate_api::{AccessDecision, DenyReason, HistoryEntry, Issue, IssueStatistics, SearchQuery};
use ticketgate_config::load_config;
use ticketgate_core::{FilterRegistry, PolicyEngine, StatusAnalyzer};
use ticketgate_util::{
    CommandName, GateError, ProjectKey, UserId, default_config_path, format_datetime_full,
    is_mock_time_active, parse_comma_list, parse_timestamp,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Exit code for a policy denial
const EXIT_DENIED: u8 = 3;
/// Exit code for invalid input or settings
const EXIT_INVALID: u8 = 1;

/// Command name checked before statistics are computed
const STATISTICS_COMMAND: &str = "get-issue-statistics";

/// ticketgate - Access policy for tracker commands
#[derive(Parser, Debug)]
#[command(name = "ticketgate", version)]
#[command(about = "Access policy checks and time-in-state reports for a ticket tracker", long_about = None)]
struct Args {
    /// Settings file path (or set TICKETGATE_CONFIG env var)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Log level
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check whether a project is allowed
    CheckProject { project: String },

    /// Check whether a command is allowed, optionally for one project
    CheckCommand {
        command: String,

        #[arg(short, long)]
        project: Option<String>,
    },

    /// Check a command against an exported issue, including record filters
    CheckIssue {
        /// Issue JSON file
        #[arg(short, long)]
        issue: PathBuf,

        /// Account id of the acting user
        #[arg(short, long, env = "TICKETGATE_USER")]
        user: String,

        #[arg(short = 'm', long, default_value = "task-with-details")]
        command: String,
    },

    /// Print a search query with the global filters applied
    SearchQuery { query: String },

    /// Filter a comma-separated list of project keys down to the allowed ones
    AllowedProjects { projects: String },

    /// Filter a comma-separated list of command names down to the visible ones
    VisibleCommands { commands: String },

    /// Time spent in each status for one or more exported issues
    Statistics {
        /// Issue JSON files, each optionally carrying a `histories` array
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Account id of the acting user
        #[arg(short, long, env = "TICKETGATE_USER")]
        user: String,

        /// Reference time (RFC 3339), defaults to the current time
        #[arg(long)]
        now: Option<String>,
    },
}

/// An exported issue together with its change log
#[derive(Debug, Deserialize)]
struct IssueExport {
    #[serde(flatten)]
    issue: Issue,

    #[serde(default)]
    histories: Vec<HistoryEntry>,
}

fn read_issue(path: &Path) -> Result<IssueExport> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read issue file {:?}", path))?;
    let export: IssueExport = serde_json::from_str(&content)
        .map_err(|e| GateError::validation(format!("Malformed issue file {:?}: {}", path, e)))?;
    debug!(issue = %export.issue.key, histories = export.histories.len(), "Issue loaded");
    Ok(export)
}

fn print_decision(decision: &AccessDecision, subject: &str, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(decision)?);
        return Ok(());
    }

    match decision {
        AccessDecision::Allowed => println!("✓ {} is allowed", subject),
        AccessDecision::Denied { reasons } => {
            println!("✗ {} is denied", subject);
            for reason in reasons {
                println!("  - {}", reason);
            }
        }
    }
    Ok(())
}

fn print_statistics(results: &[IssueStatistics], now: DateTime<Utc>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(results)?);
        return Ok(());
    }

    println!("Time in status as of {} UTC", format_datetime_full(&now));
    for stats in results {
        println!();
        println!("{}: {} [{}]", stats.key, stats.summary, stats.status);
        for (state, label) in stats.rows() {
            println!("  {:<20} {}", state, label);
        }
    }
    Ok(())
}

fn print_list<T: std::fmt::Display + serde::Serialize>(items: &[T], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(items)?);
    } else {
        for item in items {
            println!("{}", item);
        }
    }
    Ok(())
}

fn run(args: Args) -> Result<()> {
    let policy = load_config(&args.config)
        .map_err(|e| GateError::config(e.to_string()))
        .with_context(|| format!("Failed to load settings from {:?}", args.config))?;

    info!(
        config_path = %args.config.display(),
        override_count = policy.project_overrides.len(),
        "Settings loaded"
    );

    let engine = PolicyEngine::new(policy, FilterRegistry::with_builtins())
        .map_err(|e| GateError::config(e.to_string()))?;

    match args.command {
        Command::CheckProject { project } => {
            let project = ProjectKey::new(project.trim());
            let decision = if engine.is_project_allowed(&project) {
                AccessDecision::Allowed
            } else {
                AccessDecision::from_reasons(vec![DenyReason::ProjectNotAllowed {
                    project: project.clone(),
                }])
            };
            print_decision(&decision, &format!("Project {}", project), args.json)?;
            decision.into_result()?;
        }

        Command::CheckCommand { command, project } => {
            let command = CommandName::new(command.trim());
            let decision = match project {
                Some(project) => {
                    engine.authorize_project_command(&command, &ProjectKey::new(project.trim()))
                }
                None if engine.is_command_allowed(&command, None) => AccessDecision::Allowed,
                None => AccessDecision::from_reasons(vec![
                    DenyReason::CommandNotAllowed {
                        command: command.clone(),
                        project: None,
                    },
                ]),
            };
            print_decision(&decision, &format!("Command '{}'", command), args.json)?;
            decision.into_result()?;
        }

        Command::CheckIssue {
            issue,
            user,
            command,
        } => {
            let export = read_issue(&issue)?;
            let command = CommandName::new(command.trim());
            let decision = engine.authorize_issue(&command, &export.issue, &UserId::new(user.trim()));
            print_decision(
                &decision,
                &format!("Command '{}' on {}", command, export.issue.key),
                args.json,
            )?;
            decision.into_result()?;
        }

        Command::SearchQuery { query } => {
            if query.trim().is_empty() {
                return Err(GateError::validation("Search query cannot be empty").into());
            }
            let narrowed = engine.apply_global_filters(SearchQuery::parse(&query));
            if args.json {
                println!("{}", serde_json::to_string_pretty(&narrowed)?);
            } else {
                println!("{}", narrowed);
            }
        }

        Command::AllowedProjects { projects } => {
            let projects: Vec<ProjectKey> = parse_comma_list(&projects)
                .into_iter()
                .map(ProjectKey::from)
                .collect();
            print_list(&engine.allowed_projects(&projects), args.json)?;
        }

        Command::VisibleCommands { commands } => {
            let commands: Vec<CommandName> = parse_comma_list(&commands)
                .iter()
                .map(|c| CommandName::new(c.as_str()))
                .collect();
            print_list(&engine.visible_commands(&commands), args.json)?;
        }

        Command::Statistics { files, user, now } => {
            let now = match now {
                Some(raw) => parse_timestamp(&raw)
                    .ok_or_else(|| GateError::validation(format!("Invalid --now timestamp '{}'", raw)))?,
                None => {
                    if is_mock_time_active() {
                        warn!("Mock time is active, statistics use the mocked clock");
                    }
                    ticketgate_util::now()
                }
            };
            let user = UserId::new(user.trim());
            let command = CommandName::new(STATISTICS_COMMAND);
            let analyzer = StatusAnalyzer::new(engine.status_field());

            let mut results = Vec::new();
            let mut failure: Option<anyhow::Error> = None;
            for path in &files {
                let outcome = read_issue(path).and_then(|export| {
                    engine
                        .authorize_issue(&command, &export.issue, &user)
                        .into_result()?;
                    analyzer
                        .issue_statistics(&export.issue, &export.histories, now)
                        .map_err(|e| GateError::validation(e.to_string()).into())
                });

                match outcome {
                    Ok(stats) => results.push(stats),
                    Err(e) => {
                        warn!(file = %path.display(), error = %e, "Skipping issue");
                        eprintln!("Failed to compute statistics for {}: {:#}", path.display(), e);
                        if failure.is_none() {
                            failure = Some(e);
                        }
                    }
                }
            }

            if !results.is_empty() {
                print_statistics(&results, now, args.json)?;
            }
            // Any skipped file fails the run, with the exit code of the first failure
            if let Some(e) = failure {
                return Err(e);
            }
            if results.is_empty() {
                bail!("No statistics computed");
            }
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    debug!(version = env!("CARGO_PKG_VERSION"), "ticketgate starting");

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let denied = e
                .downcast_ref::<GateError>()
                .is_some_and(GateError::is_permission_denied);
            if denied {
                debug!(error = %e, "Denied by policy");
                ExitCode::from(EXIT_DENIED)
            } else {
                eprintln!("Error: {:#}", e);
                ExitCode::from(EXIT_INVALID)
            }
        }
    }
}
