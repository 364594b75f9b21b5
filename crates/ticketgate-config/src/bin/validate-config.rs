//! Settings validation CLI tool
//!
//! Validates a ticketgate settings file and reports any errors.

use std::path::PathBuf;
use std::process::ExitCode;
use ticketgate_config::{GlobalFilter, PolicyDocument, Scope};
use ticketgate_util::default_config_path;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [settings-file]");
            eprintln!();
            eprintln!("Validates a ticketgate settings file.");
            eprintln!();
            eprintln!("Default location: {}", default_path.display());
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Settings file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match ticketgate_config::load_config(&config_path) {
        Ok(policy) => {
            println!("✓ Settings are valid");
            println!();
            print_summary(&policy);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Settings validation failed");
            eprintln!();
            match &e {
                ticketgate_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                ticketgate_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                ticketgate_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                ticketgate_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        ticketgate_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}

fn describe_scope<T: Ord + std::fmt::Display>(scope: &Scope<T>) -> String {
    match scope {
        Scope::Unrestricted => "all".to_string(),
        Scope::Restricted(items) if items.is_empty() => "none".to_string(),
        Scope::Restricted(items) => items
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", "),
    }
}

fn print_summary(policy: &PolicyDocument) {
    println!("Summary:");
    println!("  Config version: {}", ticketgate_config::CURRENT_CONFIG_VERSION);
    println!("  Commands: {}", describe_scope(&policy.allowed_commands));
    println!("  Projects: {}", describe_scope(&policy.allowed_projects));
    println!("  Status field: {}", policy.statistics.status_field);

    if !policy.project_overrides.is_empty() {
        println!();
        println!("Project overrides:");
        for (key, project) in &policy.project_overrides {
            let commands = project
                .allowed_commands
                .as_ref()
                .map(describe_scope)
                .unwrap_or_else(|| "(global)".to_string());
            let filters = if project.issue_filters.is_empty() {
                "-".to_string()
            } else {
                project.issue_filters.join(", ")
            };
            println!("  - {}: commands [{}], filters [{}]", key, commands, filters);
        }
    }

    if !policy.global_filters.is_empty() {
        println!();
        println!("Global filters:");
        for filter in &policy.global_filters {
            println!("  - {}", GlobalFilter::to_clause(filter));
        }
    }
}
