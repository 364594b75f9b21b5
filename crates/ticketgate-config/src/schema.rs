//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw settings as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Globally allowed commands: "all" or a list. Absent means none.
    #[serde(default)]
    pub commands: Option<RawScope>,

    /// Allowed projects: "all" or a list of keys / structured entries.
    /// Absent means none.
    #[serde(default)]
    pub projects: Option<RawProjects>,

    /// Per-project overrides keyed by project key
    #[serde(default)]
    pub overrides: BTreeMap<String, RawProjectOverride>,

    /// Restrictions appended to every search
    #[serde(default)]
    pub global_filters: Option<RawGlobalFilters>,

    /// Duration analytics settings
    #[serde(default)]
    pub statistics: RawStatistics,
}

/// "all" or an explicit list
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawScope {
    Preset(String),
    List(Vec<String>),
}

/// Project allow-list: "all" or a list of entries
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawProjects {
    Preset(String),
    List(Vec<RawProjectEntry>),
}

/// A project in the allow-list: a bare key or a key with overrides
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawProjectEntry {
    Key(String),
    Detailed(RawProjectDetail),
}

impl RawProjectEntry {
    pub fn key(&self) -> &str {
        match self {
            RawProjectEntry::Key(key) => key,
            RawProjectEntry::Detailed(detail) => &detail.key,
        }
    }
}

/// Structured project entry
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawProjectDetail {
    pub key: String,

    /// Replaces the global command set for this project
    #[serde(default)]
    pub commands: Option<RawScope>,

    /// Names of record filters that must all pass
    #[serde(default)]
    pub filters: Vec<String>,
}

/// Override table under `[overrides.<KEY>]`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawProjectOverride {
    #[serde(default)]
    pub commands: Option<RawScope>,

    #[serde(default)]
    pub filters: Vec<String>,
}

/// Global search restrictions
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawGlobalFilters {
    /// Only items the current user is assignee, reporter or watcher of
    #[serde(default)]
    pub participated: bool,

    /// Only items assigned to the current user
    #[serde(default)]
    pub assignee: bool,

    /// Only items reported by the current user
    #[serde(default)]
    pub reporter: bool,

    /// Extra raw clauses in the tracker's query language
    #[serde(default)]
    pub clauses: Vec<String>,
}

/// Duration analytics settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawStatistics {
    /// History field that carries the workflow state (default: "status")
    pub status_field: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_mixed_project_entries() {
        let toml_str = r#"
            config_version = 1
            commands = ["me", "projects"]
            projects = ["BP", { key = "OPS", commands = ["task-with-details"], filters = ["participated"] }]
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        let Some(RawProjects::List(entries)) = &config.projects else {
            panic!("expected project list");
        };
        assert_eq!(entries.len(), 2);
        assert!(matches!(&entries[0], RawProjectEntry::Key(k) if k == "BP"));
        assert_eq!(entries[1].key(), "OPS");
        assert!(matches!(config.commands, Some(RawScope::List(ref l)) if l.len() == 2));
    }

    #[test]
    fn parse_presets_and_tables() {
        let toml_str = r#"
            config_version = 1
            commands = "all"
            projects = "all"

            [overrides.SEC]
            commands = ["list-colleagues"]
            filters = ["participated", "assignee"]

            [global_filters]
            participated = true
            clauses = ["statusCategory != Done"]

            [statistics]
            status_field = "state"
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert!(matches!(config.commands, Some(RawScope::Preset(ref p)) if p == "all"));
        assert!(matches!(config.projects, Some(RawProjects::Preset(ref p)) if p == "all"));
        assert_eq!(config.overrides["SEC"].filters.len(), 2);
        assert!(config.global_filters.unwrap().participated);
        assert_eq!(config.statistics.status_field.as_deref(), Some("state"));
    }

    #[test]
    fn missing_sections_default() {
        let config: RawConfig = toml::from_str("config_version = 1").unwrap();
        assert!(config.commands.is_none());
        assert!(config.projects.is_none());
        assert!(config.overrides.is_empty());
        assert!(config.global_filters.is_none());
    }
}
