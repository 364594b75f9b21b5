//! Tracker records as consumed by the engines

use serde::{Deserialize, Serialize};
use ticketgate_util::{IssueKey, ProjectKey, UserId};

/// Reference to a tracker user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub account_id: UserId,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl UserRef {
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: UserId::new(account_id),
            display_name: None,
        }
    }
}

/// A tracked work item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub key: IssueKey,

    #[serde(default)]
    pub summary: String,

    /// Current workflow state label
    pub status: String,

    /// Creation timestamp, as delivered by the tracker
    pub created: String,

    #[serde(default)]
    pub assignee: Option<UserRef>,

    #[serde(default)]
    pub reporter: Option<UserRef>,

    #[serde(default)]
    pub watchers: Vec<UserRef>,

    /// Authors of comments on the issue
    #[serde(default)]
    pub commenters: Vec<UserRef>,

    #[serde(default)]
    pub labels: Vec<String>,
}

impl Issue {
    /// Project the issue belongs to, derived from its key
    pub fn project(&self) -> ProjectKey {
        self.key.project()
    }

    pub fn is_assignee(&self, user: &UserId) -> bool {
        self.assignee.as_ref().is_some_and(|u| &u.account_id == user)
    }

    pub fn is_reporter(&self, user: &UserId) -> bool {
        self.reporter.as_ref().is_some_and(|u| &u.account_id == user)
    }

    pub fn is_watcher(&self, user: &UserId) -> bool {
        self.watchers.iter().any(|u| &u.account_id == user)
    }

    pub fn is_commenter(&self, user: &UserId) -> bool {
        self.commenters.iter().any(|u| &u.account_id == user)
    }
}

/// One entry of an issue's change log: a timestamp and the fields it changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// When the change was recorded, as delivered by the tracker
    pub created: String,

    #[serde(default)]
    pub items: Vec<ChangeItem>,
}

/// A single changed field within a history entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeItem {
    pub field: String,

    #[serde(rename = "fromString", default)]
    pub from_state: Option<String>,

    #[serde(rename = "toString", default)]
    pub to_state: Option<String>,
}

impl ChangeItem {
    pub fn new(field: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            from_state: Some(from.into()),
            to_state: Some(to.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tracker_issue() {
        let json = r#"{
            "key": "BP-7",
            "summary": "Fix login",
            "status": "In Progress",
            "created": "2024-01-01T10:00:00.000+0000",
            "assignee": { "accountId": "u-1", "displayName": "Ana" },
            "reporter": { "accountId": "u-2" },
            "watchers": [{ "accountId": "u-3" }]
        }"#;

        let issue: Issue = serde_json::from_str(json).unwrap();
        assert_eq!(issue.project(), ProjectKey::new("BP"));
        assert!(issue.is_assignee(&UserId::new("u-1")));
        assert!(issue.is_reporter(&UserId::new("u-2")));
        assert!(issue.is_watcher(&UserId::new("u-3")));
        assert!(!issue.is_commenter(&UserId::new("u-1")));
        assert!(issue.labels.is_empty());
    }

    #[test]
    fn parse_history_entry() {
        let json = r#"{
            "created": "2024-01-02T10:00:00Z",
            "items": [
                { "field": "status", "fromString": "To Do", "toString": "In Progress" },
                { "field": "assignee", "fromString": null, "toString": "Ana" }
            ]
        }"#;

        let entry: HistoryEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.items.len(), 2);
        assert_eq!(entry.items[0], ChangeItem::new("status", "To Do", "In Progress"));
        assert_eq!(entry.items[1].from_state, None);
    }
}
