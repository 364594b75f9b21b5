//! Strongly-typed identifiers for ticketgate

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::GateError;

/// Separator between the project key and the sequence number of an issue key
pub const ISSUE_KEY_SEPARATOR: char = '-';

/// Key of a tracker project (e.g. `BP`)
///
/// Matching is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectKey(String);

impl ProjectKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ProjectKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProjectKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Key of a single tracker record (e.g. `BP-123`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IssueKey(String);

impl IssueKey {
    /// Wrap a key as supplied by the tracker, without validation
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Parse user input into an issue key.
    ///
    /// Accepts `PROJECT-NUMBER` where the project part starts with an
    /// uppercase letter followed by uppercase letters, digits or `_`.
    pub fn parse(input: &str) -> Result<Self, GateError> {
        let input = input.trim();
        let Some((project, number)) = input.split_once(ISSUE_KEY_SEPARATOR) else {
            return Err(GateError::validation(format!(
                "Invalid issue key '{}': expected PROJECT-NUMBER",
                input
            )));
        };

        let mut chars = project.chars();
        let project_ok = chars.next().is_some_and(|c| c.is_ascii_uppercase())
            && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
        let number_ok = !number.is_empty() && number.chars().all(|c| c.is_ascii_digit());

        if !project_ok || !number_ok {
            return Err(GateError::validation(format!(
                "Invalid issue key '{}': expected PROJECT-NUMBER",
                input
            )));
        }

        Ok(Self(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Project key: everything before the first separator.
    /// A key without a separator is its own project key.
    pub fn project(&self) -> ProjectKey {
        let prefix = self
            .0
            .split_once(ISSUE_KEY_SEPARATOR)
            .map(|(project, _)| project)
            .unwrap_or(&self.0);
        ProjectKey::new(prefix)
    }
}

impl fmt::Display for IssueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for IssueKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Tracker account id of a user
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Name of a user-facing command (e.g. `task-with-details`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CommandName(String);

impl CommandName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CommandName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
