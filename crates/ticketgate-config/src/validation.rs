//! Configuration validation

use crate::schema::{RawConfig, RawProjectEntry, RawProjects, RawScope};
use std::collections::HashSet;
use thiserror::Error;
use ticketgate_util::ISSUE_KEY_SEPARATOR;

/// Sentinel that lifts a restriction at its level
pub const ALL_PRESET: &str = "all";

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Invalid value for '{field}': {message}")]
    InvalidScope { field: String, message: String },

    #[error("Project key cannot be empty")]
    EmptyProjectKey,

    #[error("Invalid project key '{key}': {message}")]
    InvalidProjectKey { key: String, message: String },

    #[error("Duplicate project: {0}")]
    DuplicateProject(String),

    #[error("Override for project '{0}' which is not in the allowed projects")]
    OverrideForDisallowedProject(String),

    #[error("Project '{project}': {message}")]
    ProjectError { project: String, message: String },

    #[error("Global filter error: {0}")]
    GlobalFilterError(String),

    #[error("Statistics config error: {0}")]
    StatisticsError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(commands) = &config.commands {
        errors.extend(validate_scope(commands, "commands"));
    }

    let mut seen_projects = HashSet::new();
    let mut listed_projects = HashSet::new();
    let mut projects_unrestricted = false;

    match &config.projects {
        Some(RawProjects::Preset(preset)) => {
            if let Err(message) = parse_preset(preset) {
                errors.push(ValidationError::InvalidScope {
                    field: "projects".into(),
                    message,
                });
            }
            projects_unrestricted = true;
        }
        Some(RawProjects::List(entries)) => {
            for entry in entries {
                let key = entry.key();
                if matches!(entry, RawProjectEntry::Key(k) if k.trim().eq_ignore_ascii_case(ALL_PRESET)) {
                    if entries.len() > 1 {
                        errors.push(ValidationError::InvalidScope {
                            field: "projects".into(),
                            message: "\"all\" cannot be combined with other projects".into(),
                        });
                    }
                    projects_unrestricted = true;
                    continue;
                }
                errors.extend(validate_project_key(key));
                if !seen_projects.insert(key.to_string()) {
                    errors.push(ValidationError::DuplicateProject(key.to_string()));
                }
                listed_projects.insert(key.to_string());

                if let RawProjectEntry::Detailed(detail) = entry {
                    errors.extend(validate_project_settings(
                        key,
                        detail.commands.as_ref(),
                        &detail.filters,
                    ));
                }
            }
        }
        None => {}
    }

    for (key, project_override) in &config.overrides {
        errors.extend(validate_project_key(key));
        if !seen_projects.insert(key.clone()) {
            errors.push(ValidationError::DuplicateProject(key.clone()));
        }
        if !projects_unrestricted && !listed_projects.contains(key) {
            errors.push(ValidationError::OverrideForDisallowedProject(key.clone()));
        }
        errors.extend(validate_project_settings(
            key,
            project_override.commands.as_ref(),
            &project_override.filters,
        ));
    }

    if let Some(global) = &config.global_filters {
        for clause in &global.clauses {
            if clause.trim().is_empty() {
                errors.push(ValidationError::GlobalFilterError(
                    "clause cannot be empty".into(),
                ));
            }
        }
    }

    if let Some(field) = &config.statistics.status_field
        && field.trim().is_empty()
    {
        errors.push(ValidationError::StatisticsError(
            "status_field cannot be empty".into(),
        ));
    }

    errors
}

fn validate_scope(scope: &RawScope, field: &str) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    match scope {
        RawScope::Preset(preset) => {
            if let Err(message) = parse_preset(preset) {
                errors.push(ValidationError::InvalidScope {
                    field: field.to_string(),
                    message,
                });
            }
        }
        RawScope::List(items) => {
            for item in items {
                if item.trim().is_empty() {
                    errors.push(ValidationError::InvalidScope {
                        field: field.to_string(),
                        message: "command name cannot be empty".into(),
                    });
                } else if item.trim().eq_ignore_ascii_case(ALL_PRESET) && items.len() > 1 {
                    errors.push(ValidationError::InvalidScope {
                        field: field.to_string(),
                        message: "\"all\" cannot be combined with other commands".into(),
                    });
                }
            }
        }
    }

    errors
}

fn validate_project_settings(
    project: &str,
    commands: Option<&RawScope>,
    filters: &[String],
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(commands) = commands {
        errors.extend(validate_scope(commands, &format!("{}.commands", project)));
    }

    for filter in filters {
        if filter.trim().is_empty() {
            errors.push(ValidationError::ProjectError {
                project: project.to_string(),
                message: "filter name cannot be empty".into(),
            });
        }
    }

    errors
}

fn validate_project_key(key: &str) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if key.is_empty() {
        errors.push(ValidationError::EmptyProjectKey);
    } else if key.contains(ISSUE_KEY_SEPARATOR) {
        errors.push(ValidationError::InvalidProjectKey {
            key: key.to_string(),
            message: format!("must not contain '{}'", ISSUE_KEY_SEPARATOR),
        });
    } else if key.chars().any(char::is_whitespace) {
        errors.push(ValidationError::InvalidProjectKey {
            key: key.to_string(),
            message: "must not contain whitespace".into(),
        });
    }

    errors
}

/// Parse a preset string. Only "all" (any case) is recognised.
pub fn parse_preset(preset: &str) -> Result<(), String> {
    if preset.trim().eq_ignore_ascii_case(ALL_PRESET) {
        Ok(())
    } else {
        Err(format!("Unknown preset '{}' (expected \"all\" or a list)", preset))
    }
}

/// Whether a list consists of the single "all" sentinel
pub fn is_all_list(items: &[String]) -> bool {
    matches!(items, [only] if only.trim().eq_ignore_ascii_case(ALL_PRESET))
}
