//! Access decisions produced by the policy engine

use serde::{Deserialize, Serialize};
use std::fmt;
use ticketgate_util::{CommandName, GateError, IssueKey, ProjectKey};

/// Structured reason codes for why an operation was denied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum DenyReason {
    /// Project is not in the allowed project set
    ProjectNotAllowed { project: ProjectKey },

    /// Command is not allowed, globally or for the given project
    CommandNotAllowed {
        command: CommandName,
        project: Option<ProjectKey>,
    },

    /// A record filter of the issue's project rejected the acting user
    FilteredOut { issue: IssueKey, filter: String },
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::ProjectNotAllowed { project } => {
                write!(f, "Project '{}' is not allowed by your settings", project)
            }
            DenyReason::CommandNotAllowed {
                command,
                project: Some(project),
            } => write!(
                f,
                "Command '{}' is not allowed for project {}",
                command, project
            ),
            DenyReason::CommandNotAllowed {
                command,
                project: None,
            } => write!(f, "Command '{}' is not allowed", command),
            DenyReason::FilteredOut { issue, filter } => write!(
                f,
                "Access to issue {} is restricted by project filter '{}'",
                issue, filter
            ),
        }
    }
}

/// Outcome of an authorization check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AccessDecision {
    Allowed,
    Denied { reasons: Vec<DenyReason> },
}

impl AccessDecision {
    pub fn from_reasons(reasons: Vec<DenyReason>) -> Self {
        if reasons.is_empty() {
            Self::Allowed
        } else {
            Self::Denied { reasons }
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    pub fn reasons(&self) -> &[DenyReason] {
        match self {
            Self::Allowed => &[],
            Self::Denied { reasons } => reasons,
        }
    }

    /// Turn a denial into a `GateError::PermissionDenied` listing every reason
    pub fn into_result(self) -> Result<(), GateError> {
        match self {
            Self::Allowed => Ok(()),
            Self::Denied { reasons } => {
                let message = reasons
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                Err(GateError::permission(message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_reasons_mean_allowed() {
        assert_eq!(AccessDecision::from_reasons(vec![]), AccessDecision::Allowed);
        assert!(AccessDecision::Allowed.into_result().is_ok());
    }

    #[test]
    fn denial_maps_to_permission_error() {
        let decision = AccessDecision::from_reasons(vec![
            DenyReason::ProjectNotAllowed {
                project: ProjectKey::new("SEC"),
            },
            DenyReason::CommandNotAllowed {
                command: CommandName::new("add-label-to-issue"),
                project: Some(ProjectKey::new("SEC")),
            },
        ]);
        assert_eq!(decision.reasons().len(), 2);

        let err = decision.into_result().unwrap_err();
        assert!(err.is_permission_denied());
        let message = err.to_string();
        assert!(message.contains("Project 'SEC' is not allowed"));
        assert!(message.contains("Command 'add-label-to-issue' is not allowed for project SEC"));
    }
}
