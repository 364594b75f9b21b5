//! Named record filters
//!
//! A project override lists filters by name. Each name resolves to a
//! predicate over the record and the acting user's id; new predicates are
//! added by registering them, the evaluation loop does not change.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use ticketgate_api::Issue;
use ticketgate_util::UserId;

/// Predicate deciding whether `user` may see `issue`
pub type IssuePredicate = Arc<dyn Fn(&Issue, &UserId) -> bool + Send + Sync>;

/// User is assignee, reporter, watcher or commenter
pub const PARTICIPATED_FILTER: &str = "participated";
pub const ASSIGNEE_FILTER: &str = "assignee";
pub const REPORTER_FILTER: &str = "reporter";
pub const WATCHER_FILTER: &str = "watcher";

/// Registry mapping filter names to predicates
#[derive(Clone)]
pub struct FilterRegistry {
    predicates: HashMap<String, IssuePredicate>,
}

impl FilterRegistry {
    /// Registry without any filters
    pub fn empty() -> Self {
        Self {
            predicates: HashMap::new(),
        }
    }

    /// Registry with the built-in filters
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(PARTICIPATED_FILTER, |issue, user| {
            issue.is_assignee(user)
                || issue.is_reporter(user)
                || issue.is_watcher(user)
                || issue.is_commenter(user)
        });
        registry.register(ASSIGNEE_FILTER, |issue, user| issue.is_assignee(user));
        registry.register(REPORTER_FILTER, |issue, user| issue.is_reporter(user));
        registry.register(WATCHER_FILTER, |issue, user| issue.is_watcher(user));
        registry
    }

    /// Register a predicate, replacing any previous one with the same name
    pub fn register<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&Issue, &UserId) -> bool + Send + Sync + 'static,
    {
        self.predicates.insert(name.into(), Arc::new(predicate));
    }

    pub fn get(&self, name: &str) -> Option<IssuePredicate> {
        self.predicates.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.predicates.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.predicates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("names", &self.names())
            .finish()
    }
}
