//! Core policy engine

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};
use ticketgate_api::{AccessDecision, DenyReason, Issue, SearchQuery};
use ticketgate_config::PolicyDocument;
use ticketgate_util::{CommandName, ProjectKey, UserId};
use tracing::{debug, info, warn};

use crate::{CoreEvent, EngineError, EngineResult, FilterRegistry, IssuePredicate};

/// A policy document with its filter names resolved against the registry
struct CompiledPolicy {
    document: Arc<PolicyDocument>,
    issue_filters: BTreeMap<ProjectKey, Vec<(String, IssuePredicate)>>,
}

impl CompiledPolicy {
    fn compile(document: PolicyDocument, registry: &FilterRegistry) -> EngineResult<Self> {
        let mut issue_filters = BTreeMap::new();

        for (project, project_policy) in &document.project_overrides {
            let mut resolved = Vec::with_capacity(project_policy.issue_filters.len());
            for name in &project_policy.issue_filters {
                let predicate = registry.get(name).ok_or_else(|| EngineError::UnknownFilter {
                    project: project.clone(),
                    filter: name.clone(),
                })?;
                resolved.push((name.clone(), predicate));
            }
            if !resolved.is_empty() {
                issue_filters.insert(project.clone(), resolved);
            }
        }

        Ok(Self {
            document: Arc::new(document),
            issue_filters,
        })
    }

    fn is_project_allowed(&self, project: &ProjectKey) -> bool {
        self.document.allowed_projects.permits(project)
    }

    fn is_command_allowed(&self, command: &CommandName, project: Option<&ProjectKey>) -> bool {
        // A project override replaces the global set, it never adds to it
        let project_scope = project
            .and_then(|p| self.document.project_policy(p))
            .and_then(|p| p.allowed_commands.as_ref());

        match project_scope {
            Some(scope) => scope.permits(command),
            None => self.document.allowed_commands.permits(command),
        }
    }

    /// Names of the filters of the issue's project that reject `user`
    fn failed_filters(&self, issue: &Issue, user: &UserId) -> Vec<String> {
        let Some(filters) = self.issue_filters.get(&issue.project()) else {
            return Vec::new();
        };

        filters
            .iter()
            .filter(|(_, predicate)| user.is_empty() || !predicate(issue, user))
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// The core policy engine.
///
/// Holds the active policy behind a lock that is only taken to clone or
/// swap an `Arc`; evaluation runs on an immutable snapshot, so a reload is
/// never observed half-applied.
pub struct PolicyEngine {
    current: RwLock<Arc<CompiledPolicy>>,
    registry: FilterRegistry,
}

impl PolicyEngine {
    /// Create an engine for a loaded policy document.
    ///
    /// Fails if a project references a filter the registry does not know.
    pub fn new(document: PolicyDocument, registry: FilterRegistry) -> EngineResult<Self> {
        let compiled = CompiledPolicy::compile(document, &registry)?;

        info!(
            override_count = compiled.document.project_overrides.len(),
            global_filter_count = compiled.document.global_filters.len(),
            "Policy engine initialized"
        );

        Ok(Self {
            current: RwLock::new(Arc::new(compiled)),
            registry,
        })
    }

    /// Create an engine without settings: every check denies
    pub fn unloaded(registry: FilterRegistry) -> Self {
        let compiled = CompiledPolicy {
            document: Arc::new(PolicyDocument::deny_all()),
            issue_filters: BTreeMap::new(),
        };

        Self {
            current: RwLock::new(Arc::new(compiled)),
            registry,
        }
    }

    /// Replace the active policy.
    ///
    /// The new document is compiled first; on error the previous policy
    /// stays active.
    pub fn reload(&self, document: PolicyDocument) -> EngineResult<CoreEvent> {
        let compiled = match CompiledPolicy::compile(document, &self.registry) {
            Ok(compiled) => compiled,
            Err(e) => {
                warn!(error = %e, "Policy reload rejected, keeping previous policy");
                return Err(e);
            }
        };

        let override_count = compiled.document.project_overrides.len();
        let global_filter_count = compiled.document.global_filters.len();

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(compiled);

        info!(override_count, global_filter_count, "Policy reloaded");

        Ok(CoreEvent::PolicyReloaded {
            override_count,
            global_filter_count,
        })
    }

    fn snapshot(&self) -> Arc<CompiledPolicy> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Get the active policy document
    pub fn policy(&self) -> Arc<PolicyDocument> {
        self.snapshot().document.clone()
    }

    /// History field tracked by the duration analytics
    pub fn status_field(&self) -> String {
        self.snapshot().document.statistics.status_field.clone()
    }

    /// Whether the project is in the allowed project set
    pub fn is_project_allowed(&self, project: &ProjectKey) -> bool {
        let allowed = self.snapshot().is_project_allowed(project);
        if !allowed {
            debug!(project = %project, "Project denied by policy");
        }
        allowed
    }

    /// Whether the command may run, optionally in the context of a project.
    ///
    /// A project override with its own command set takes the place of the
    /// global set for that project.
    pub fn is_command_allowed(&self, command: &CommandName, project: Option<&ProjectKey>) -> bool {
        let allowed = self.snapshot().is_command_allowed(command, project);
        if !allowed {
            debug!(command = %command, project = ?project.map(ProjectKey::as_str), "Command denied by policy");
        }
        allowed
    }

    /// Whether every record filter of the issue's project accepts `user`.
    ///
    /// Projects without filters accept everyone. An empty user id is never
    /// accepted by a filter.
    pub fn validate_issue_against_filters(&self, issue: &Issue, user: &UserId) -> bool {
        let failed = self.snapshot().failed_filters(issue, user);
        if !failed.is_empty() {
            debug!(issue = %issue.key, filters = ?failed, "Issue rejected by project filters");
        }
        failed.is_empty()
    }

    /// Narrow a search query with the configured global filters.
    ///
    /// The caller's constraints are kept as they are and every filter is
    /// joined with `AND`. A filter already present in the query is not added
    /// again.
    pub fn apply_global_filters(&self, query: SearchQuery) -> SearchQuery {
        let policy = self.snapshot();

        policy
            .document
            .global_filters
            .iter()
            .fold(query, |query, filter| {
                let clause = filter.to_clause();
                if query.has_restriction(&clause) {
                    warn!(clause = %clause, "Global filter already applied to query, skipping");
                    query
                } else {
                    query.and(clause)
                }
            })
    }

    /// Keep only the allowed projects, preserving order
    pub fn allowed_projects(&self, projects: &[ProjectKey]) -> Vec<ProjectKey> {
        let policy = self.snapshot();
        projects
            .iter()
            .filter(|p| policy.is_project_allowed(p))
            .cloned()
            .collect()
    }

    /// Commands to show in help output: the globally allowed ones
    pub fn visible_commands(&self, commands: &[CommandName]) -> Vec<CommandName> {
        let policy = self.snapshot();
        commands
            .iter()
            .filter(|c| policy.is_command_allowed(c, None))
            .cloned()
            .collect()
    }

    /// Check that the project is allowed and the command is allowed for it
    pub fn authorize_project_command(
        &self,
        command: &CommandName,
        project: &ProjectKey,
    ) -> AccessDecision {
        let policy = self.snapshot();
        let mut reasons = Vec::new();

        if !policy.is_project_allowed(project) {
            reasons.push(DenyReason::ProjectNotAllowed {
                project: project.clone(),
            });
        }
        if !policy.is_command_allowed(command, Some(project)) {
            reasons.push(DenyReason::CommandNotAllowed {
                command: command.clone(),
                project: Some(project.clone()),
            });
        }

        let decision = AccessDecision::from_reasons(reasons);
        if !decision.is_allowed() {
            debug!(command = %command, project = %project, reasons = ?decision.reasons(), "Access denied");
        }
        decision
    }

    /// Full check for a command acting on one issue: project, command and
    /// record filters. Every failing check is reported.
    pub fn authorize_issue(
        &self,
        command: &CommandName,
        issue: &Issue,
        user: &UserId,
    ) -> AccessDecision {
        let policy = self.snapshot();
        let project = issue.project();
        let mut reasons = Vec::new();

        if !policy.is_project_allowed(&project) {
            reasons.push(DenyReason::ProjectNotAllowed {
                project: project.clone(),
            });
        }
        if !policy.is_command_allowed(command, Some(&project)) {
            reasons.push(DenyReason::CommandNotAllowed {
                command: command.clone(),
                project: Some(project.clone()),
            });
        }
        for filter in policy.failed_filters(issue, user) {
            reasons.push(DenyReason::FilteredOut {
                issue: issue.key.clone(),
                filter,
            });
        }

        let decision = AccessDecision::from_reasons(reasons);
        if !decision.is_allowed() {
            debug!(command = %command, issue = %issue.key, reasons = ?decision.reasons(), "Access denied");
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticketgate_api::UserRef;
    use ticketgate_config::{GlobalFilter, ProjectPolicy, Scope};
    use ticketgate_util::IssueKey;

    fn cmd(name: &str) -> CommandName {
        CommandName::new(name)
    }

    fn key(name: &str) -> ProjectKey {
        ProjectKey::new(name)
    }

    fn make_issue(key: &str, assignee: &str) -> Issue {
        Issue {
            key: IssueKey::new(key),
            summary: "Test".into(),
            status: "To Do".into(),
            created: "2024-01-01T10:00:00Z".into(),
            assignee: Some(UserRef::new(assignee)),
            reporter: Some(UserRef::new("reporter")),
            watchers: vec![],
            commenters: vec![],
            labels: vec![],
        }
    }

    fn make_test_policy() -> PolicyDocument {
        let mut project_overrides = BTreeMap::new();
        project_overrides.insert(
            key("OPS"),
            ProjectPolicy {
                allowed_commands: Some(Scope::only([cmd("task-with-details")])),
                issue_filters: vec!["participated".into()],
            },
        );

        PolicyDocument {
            allowed_commands: Scope::only([cmd("me"), cmd("projects"), cmd("list-colleagues")]),
            allowed_projects: Scope::only([key("BP"), key("OPS")]),
            project_overrides,
            ..PolicyDocument::default()
        }
    }

    fn engine(document: PolicyDocument) -> PolicyEngine {
        PolicyEngine::new(document, FilterRegistry::with_builtins()).unwrap()
    }

    #[test]
    fn test_project_allowed() {
        let engine = engine(make_test_policy());
        assert!(engine.is_project_allowed(&key("BP")));
        assert!(!engine.is_project_allowed(&key("bp")));
        assert!(!engine.is_project_allowed(&key("SEC")));
    }

    #[test]
    fn test_unloaded_engine_denies_everything() {
        let engine = PolicyEngine::unloaded(FilterRegistry::with_builtins());
        assert!(!engine.is_project_allowed(&key("BP")));
        assert!(!engine.is_command_allowed(&cmd("me"), None));
        assert!(!engine.is_command_allowed(&cmd("me"), Some(&key("BP"))));
        assert!(!engine.authorize_issue(&cmd("me"), &make_issue("BP-1", "u"), &UserId::new("u")).is_allowed());
    }

    #[test]
    fn test_command_global_fallback() {
        let engine = engine(make_test_policy());
        assert!(engine.is_command_allowed(&cmd("me"), None));
        assert!(engine.is_command_allowed(&cmd("me"), Some(&key("BP"))));
        assert!(!engine.is_command_allowed(&cmd("task-with-details"), None));
    }

    #[test]
    fn test_project_override_replaces_global_commands() {
        let engine = engine(make_test_policy());
        // Globally allowed, but OPS has its own set
        assert!(!engine.is_command_allowed(&cmd("me"), Some(&key("OPS"))));
        assert!(engine.is_command_allowed(&cmd("task-with-details"), Some(&key("OPS"))));
    }

    #[test]
    fn test_issue_filters() {
        let engine = engine(make_test_policy());
        let user = UserId::new("alice");

        // No filters configured for BP
        assert!(engine.validate_issue_against_filters(&make_issue("BP-1", "bob"), &user));

        assert!(engine.validate_issue_against_filters(&make_issue("OPS-1", "alice"), &user));
        assert!(!engine.validate_issue_against_filters(&make_issue("OPS-1", "bob"), &user));
    }

    #[test]
    fn test_empty_user_fails_filters() {
        let engine = engine(make_test_policy());
        assert!(!engine.validate_issue_against_filters(&make_issue("OPS-1", ""), &UserId::new("")));
    }

    #[test]
    fn test_unknown_filter_rejected() {
        let mut document = make_test_policy();
        document
            .project_overrides
            .get_mut(&key("OPS"))
            .unwrap()
            .issue_filters
            .push("mentioned".into());

        let result = PolicyEngine::new(document, FilterRegistry::with_builtins());
        assert!(matches!(
            result,
            Err(EngineError::UnknownFilter { ref filter, .. }) if filter == "mentioned"
        ));
    }

    #[test]
    fn test_reload_swaps_policy() {
        let engine = engine(make_test_policy());
        assert!(!engine.is_project_allowed(&key("SEC")));

        let mut document = make_test_policy();
        document.allowed_projects = Scope::Unrestricted;
        document.global_filters = vec![GlobalFilter::participated()];

        let event = engine.reload(document).unwrap();
        assert_eq!(
            event,
            CoreEvent::PolicyReloaded {
                override_count: 1,
                global_filter_count: 1,
            }
        );
        assert!(engine.is_project_allowed(&key("SEC")));
    }

    #[test]
    fn test_failed_reload_keeps_previous_policy() {
        let engine = engine(make_test_policy());

        let mut document = make_test_policy();
        document.allowed_projects = Scope::Unrestricted;
        document.project_overrides.insert(
            key("SEC"),
            ProjectPolicy {
                allowed_commands: None,
                issue_filters: vec!["no-such-filter".into()],
            },
        );

        assert!(engine.reload(document).is_err());
        assert!(!engine.is_project_allowed(&key("SEC")));
        assert!(engine.is_project_allowed(&key("BP")));
    }

    #[test]
    fn test_apply_global_filters() {
        let mut document = make_test_policy();
        document.global_filters = vec![
            GlobalFilter::participated(),
            GlobalFilter::Clause("statusCategory != Done".into()),
        ];
        let engine = engine(document);

        let query = engine.apply_global_filters(SearchQuery::parse("project = BP ORDER BY created"));
        assert_eq!(query.base(), "project = BP");
        assert_eq!(
            query.to_query_string(),
            "(project = BP) AND (assignee = currentUser() OR reporter = currentUser() OR watcher = currentUser()) \
             AND (statusCategory != Done) ORDER BY created"
        );
    }

    #[test]
    fn test_apply_global_filters_without_filters() {
        let engine = engine(make_test_policy());
        let query = SearchQuery::parse("project = BP OR project = OPS");
        assert_eq!(engine.apply_global_filters(query.clone()), query);
    }

    #[test]
    fn test_apply_global_filters_twice_is_idempotent() {
        let mut document = make_test_policy();
        document.global_filters = vec![GlobalFilter::AssignedToCurrentUser];
        let engine = engine(document);

        let once = engine.apply_global_filters(SearchQuery::parse("project = BP"));
        let twice = engine.apply_global_filters(once.clone());
        assert_eq!(once, twice);
        assert_eq!(twice.restrictions().len(), 1);
    }

    #[test]
    fn test_allowed_projects_and_visible_commands() {
        let engine = engine(make_test_policy());

        let projects = engine.allowed_projects(&[key("SEC"), key("OPS"), key("BP")]);
        assert_eq!(projects, vec![key("OPS"), key("BP")]);

        let visible = engine.visible_commands(&[cmd("auth"), cmd("me"), cmd("projects")]);
        assert_eq!(visible, vec![cmd("me"), cmd("projects")]);
    }

    #[test]
    fn test_authorize_project_command() {
        let engine = engine(make_test_policy());

        assert!(engine.authorize_project_command(&cmd("list-colleagues"), &key("BP")).is_allowed());

        let decision = engine.authorize_project_command(&cmd("list-colleagues"), &key("SEC"));
        assert_eq!(
            decision.reasons(),
            &[DenyReason::ProjectNotAllowed { project: key("SEC") }]
        );

        let decision = engine.authorize_project_command(&cmd("list-colleagues"), &key("OPS"));
        assert!(matches!(
            decision.reasons(),
            [DenyReason::CommandNotAllowed { project: Some(p), .. }] if p == &key("OPS")
        ));
    }

    #[test]
    fn test_authorize_issue_collects_reasons() {
        let engine = engine(make_test_policy());
        let user = UserId::new("alice");

        let allowed = engine.authorize_issue(&cmd("task-with-details"), &make_issue("OPS-3", "alice"), &user);
        assert!(allowed.is_allowed());

        let denied = engine.authorize_issue(&cmd("me"), &make_issue("OPS-3", "bob"), &user);
        assert_eq!(
            denied.reasons(),
            &[
                DenyReason::CommandNotAllowed {
                    command: cmd("me"),
                    project: Some(key("OPS")),
                },
                DenyReason::FilteredOut {
                    issue: IssueKey::new("OPS-3"),
                    filter: "participated".into(),
                },
            ]
        );
        assert!(denied.into_result().unwrap_err().is_permission_denied());
    }
}
