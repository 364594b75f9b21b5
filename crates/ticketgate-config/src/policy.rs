//! Validated policy structures

use crate::schema::{RawConfig, RawGlobalFilters, RawProjectEntry, RawProjects, RawScope};
use crate::validation::{ALL_PRESET, is_all_list};
use std::collections::{BTreeMap, BTreeSet};
use ticketgate_util::{CommandName, ProjectKey};
use tracing::warn;

/// Default history field that carries the workflow state
pub const DEFAULT_STATUS_FIELD: &str = "status";

/// An allow-set: either everything, or exactly the listed items.
///
/// An empty `Restricted` set denies everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope<T: Ord> {
    Unrestricted,
    Restricted(BTreeSet<T>),
}

impl<T: Ord> Scope<T> {
    pub fn deny_all() -> Self {
        Scope::Restricted(BTreeSet::new())
    }

    pub fn only(items: impl IntoIterator<Item = T>) -> Self {
        Scope::Restricted(items.into_iter().collect())
    }

    pub fn permits(&self, item: &T) -> bool {
        match self {
            Scope::Unrestricted => true,
            Scope::Restricted(items) => items.contains(item),
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Scope::Unrestricted)
    }
}

impl<T: Ord> Default for Scope<T> {
    fn default() -> Self {
        Self::deny_all()
    }
}

/// Per-project refinement of the global policy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectPolicy {
    /// Replaces the global command set for this project when present
    pub allowed_commands: Option<Scope<CommandName>>,

    /// Names of record filters; all must pass
    pub issue_filters: Vec<String>,
}

/// A restriction appended to every search, in terms of the current user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlobalFilter {
    AssignedToCurrentUser,
    ReportedByCurrentUser,
    WatchedByCurrentUser,
    /// Any of the nested filters holds
    AnyOf(Vec<GlobalFilter>),
    /// A raw clause in the tracker's query language
    Clause(String),
}

impl GlobalFilter {
    /// The user took part in the item: assignee, reporter or watcher
    pub fn participated() -> Self {
        GlobalFilter::AnyOf(vec![
            GlobalFilter::AssignedToCurrentUser,
            GlobalFilter::ReportedByCurrentUser,
            GlobalFilter::WatchedByCurrentUser,
        ])
    }

    /// Render as a self-contained clause that is safe to join with `AND`
    pub fn to_clause(&self) -> String {
        match self {
            GlobalFilter::AssignedToCurrentUser => "assignee = currentUser()".to_string(),
            GlobalFilter::ReportedByCurrentUser => "reporter = currentUser()".to_string(),
            GlobalFilter::WatchedByCurrentUser => "watcher = currentUser()".to_string(),
            GlobalFilter::AnyOf(filters) => {
                let parts: Vec<String> = filters.iter().map(GlobalFilter::to_clause).collect();
                format!("({})", parts.join(" OR "))
            }
            GlobalFilter::Clause(raw) => format!("({})", raw.trim()),
        }
    }
}

/// Duration analytics settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatisticsSettings {
    pub status_field: String,
}

impl Default for StatisticsSettings {
    fn default() -> Self {
        Self {
            status_field: DEFAULT_STATUS_FIELD.to_string(),
        }
    }
}

/// Validated policy ready for use by the core engine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyDocument {
    pub allowed_commands: Scope<CommandName>,
    pub allowed_projects: Scope<ProjectKey>,
    pub project_overrides: BTreeMap<ProjectKey, ProjectPolicy>,
    pub global_filters: Vec<GlobalFilter>,
    pub statistics: StatisticsSettings,
}

impl PolicyDocument {
    /// Policy that allows nothing; used when no settings are loaded
    pub fn deny_all() -> Self {
        Self::default()
    }

    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let allowed_commands = raw
            .commands
            .map(convert_command_scope)
            .unwrap_or_default();

        let mut project_overrides = BTreeMap::new();
        let allowed_projects = match raw.projects {
            Some(RawProjects::Preset(_)) => Scope::Unrestricted,
            Some(RawProjects::List(entries)) => {
                let mut keys = BTreeSet::new();
                let mut unrestricted = false;
                for entry in entries {
                    match entry {
                        RawProjectEntry::Key(key) if key.trim().eq_ignore_ascii_case(ALL_PRESET) => {
                            unrestricted = true;
                        }
                        RawProjectEntry::Key(key) => {
                            keys.insert(ProjectKey::new(key));
                        }
                        RawProjectEntry::Detailed(detail) => {
                            let key = ProjectKey::new(detail.key);
                            project_overrides.insert(
                                key.clone(),
                                convert_project_policy(&key, detail.commands, detail.filters),
                            );
                            keys.insert(key);
                        }
                    }
                }
                if unrestricted {
                    Scope::Unrestricted
                } else {
                    Scope::Restricted(keys)
                }
            }
            None => Scope::deny_all(),
        };

        for (key, raw_override) in raw.overrides {
            let key = ProjectKey::new(key);
            let policy = convert_project_policy(&key, raw_override.commands, raw_override.filters);
            project_overrides.insert(key, policy);
        }

        Self {
            allowed_commands,
            allowed_projects,
            project_overrides,
            global_filters: raw
                .global_filters
                .map(convert_global_filters)
                .unwrap_or_default(),
            statistics: StatisticsSettings {
                status_field: raw
                    .statistics
                    .status_field
                    .map(|f| f.trim().to_string())
                    .unwrap_or_else(|| DEFAULT_STATUS_FIELD.to_string()),
            },
        }
    }

    /// Get the override for a project, if any
    pub fn project_policy(&self, project: &ProjectKey) -> Option<&ProjectPolicy> {
        self.project_overrides.get(project)
    }
}

// Conversion helpers

fn convert_command_scope(raw: RawScope) -> Scope<CommandName> {
    match raw {
        RawScope::Preset(_) => Scope::Unrestricted,
        RawScope::List(items) if is_all_list(&items) => Scope::Unrestricted,
        RawScope::List(items) => Scope::only(items.into_iter().map(|c| CommandName::new(c.trim()))),
    }
}

fn convert_project_policy(
    project: &ProjectKey,
    commands: Option<RawScope>,
    filters: Vec<String>,
) -> ProjectPolicy {
    let allowed_commands = match commands {
        Some(RawScope::List(items)) if items.is_empty() => {
            // An empty override would otherwise read as "deny all" for the project
            warn!(
                project = %project,
                "Empty command list in project override, using global commands"
            );
            None
        }
        other => other.map(convert_command_scope),
    };

    ProjectPolicy {
        allowed_commands,
        issue_filters: filters.into_iter().map(|f| f.trim().to_string()).collect(),
    }
}

fn convert_global_filters(raw: RawGlobalFilters) -> Vec<GlobalFilter> {
    let mut filters = Vec::new();

    if raw.participated {
        filters.push(GlobalFilter::participated());
    }
    if raw.assignee {
        filters.push(GlobalFilter::AssignedToCurrentUser);
    }
    if raw.reporter {
        filters.push(GlobalFilter::ReportedByCurrentUser);
    }
    filters.extend(raw.clauses.into_iter().map(GlobalFilter::Clause));

    filters
}
