use serde::Serialize;

use super::actor::Actor;
use super::role::Role;

/// Requested operation. `Read` covers both list and retrieve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Read,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Read,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn is_safe(&self) -> bool {
        matches!(self, Operation::Read)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    User,
    Project,
    Task,
    Comment,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::User,
        ResourceKind::Project,
        ResourceKind::Task,
        ResourceKind::Comment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::User => "user",
            ResourceKind::Project => "project",
            ResourceKind::Task => "task",
            ResourceKind::Comment => "comment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    pub operation: Operation,
    pub resource: ResourceKind,
}

impl Action {
    pub fn new(operation: Operation, resource: ResourceKind) -> Self {
        Self { operation, resource }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    SafeOperation,
    RolePermitted,
    Authenticated,
    NotAuthenticated,
    RoleNotPermitted,
}

impl DecisionReason {
    pub fn code(&self) -> &'static str {
        match self {
            DecisionReason::SafeOperation => "safe_operation",
            DecisionReason::RolePermitted => "role_permitted",
            DecisionReason::Authenticated => "authenticated",
            DecisionReason::NotAuthenticated => "not_authenticated",
            DecisionReason::RoleNotPermitted => "role_not_permitted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PermissionDecision {
    pub allowed: bool,
    pub reason: DecisionReason,
}

impl PermissionDecision {
    pub fn allow(reason: DecisionReason) -> Self {
        Self { allowed: true, reason }
    }

    pub fn deny(reason: DecisionReason) -> Self {
        Self { allowed: false, reason }
    }
}

/// A single, pure rule set attached to a resource kind.
pub trait PolicyEvaluator: Send + Sync {
    fn name(&self) -> &'static str;

    fn evaluate(&self, actor: &Actor, operation: Operation) -> PermissionDecision;
}

/// Unsafe operations require an authenticated actor whose role is listed.
fn require_role(actor: &Actor, allowed: &[Role]) -> PermissionDecision {
    match actor.role() {
        None => PermissionDecision::deny(DecisionReason::NotAuthenticated),
        Some(role) if role.is_one_of(allowed) => PermissionDecision::allow(DecisionReason::RolePermitted),
        Some(_) => PermissionDecision::deny(DecisionReason::RoleNotPermitted),
    }
}

fn require_authenticated(actor: &Actor) -> PermissionDecision {
    if actor.is_authenticated() {
        PermissionDecision::allow(DecisionReason::Authenticated)
    } else {
        PermissionDecision::deny(DecisionReason::NotAuthenticated)
    }
}

const MANAGERS: &[Role] = &[Role::Admin, Role::ProjectManager];

/// Everyone may read; only Admins and Project Managers may write.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminOrProjectManager;

impl PolicyEvaluator for AdminOrProjectManager {
    fn name(&self) -> &'static str {
        "admin_or_project_manager"
    }

    fn evaluate(&self, actor: &Actor, operation: Operation) -> PermissionDecision {
        if operation.is_safe() {
            return PermissionDecision::allow(DecisionReason::SafeOperation);
        }
        require_role(actor, MANAGERS)
    }
}

/// Create, update and delete of projects are reserved to Admins and Project Managers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectEditors;

impl PolicyEvaluator for ProjectEditors {
    fn name(&self) -> &'static str {
        "project_editors"
    }

    fn evaluate(&self, actor: &Actor, operation: Operation) -> PermissionDecision {
        match operation {
            Operation::Read => PermissionDecision::allow(DecisionReason::SafeOperation),
            Operation::Create | Operation::Update | Operation::Delete => require_role(actor, MANAGERS),
        }
    }
}

/// Clients may not create or delete tasks.
///
/// Update only requires authentication, for every role including Client.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskEditors;

impl PolicyEvaluator for TaskEditors {
    fn name(&self) -> &'static str {
        "task_editors"
    }

    fn evaluate(&self, actor: &Actor, operation: Operation) -> PermissionDecision {
        match operation {
            Operation::Read => PermissionDecision::allow(DecisionReason::SafeOperation),
            Operation::Create | Operation::Delete => match actor.role() {
                None => PermissionDecision::deny(DecisionReason::NotAuthenticated),
                Some(Role::Client) => PermissionDecision::deny(DecisionReason::RoleNotPermitted),
                Some(_) => PermissionDecision::allow(DecisionReason::RolePermitted),
            },
            Operation::Update => require_authenticated(actor),
        }
    }
}

/// Any authenticated actor may write comments.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommentAuthors;

impl PolicyEvaluator for CommentAuthors {
    fn name(&self) -> &'static str {
        "comment_authors"
    }

    fn evaluate(&self, actor: &Actor, operation: Operation) -> PermissionDecision {
        if operation.is_safe() {
            return PermissionDecision::allow(DecisionReason::SafeOperation);
        }
        require_authenticated(actor)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AuthenticatedOrReadOnly;

impl PolicyEvaluator for AuthenticatedOrReadOnly {
    fn name(&self) -> &'static str {
        "authenticated_or_read_only"
    }

    fn evaluate(&self, actor: &Actor, operation: Operation) -> PermissionDecision {
        if operation.is_safe() {
            return PermissionDecision::allow(DecisionReason::SafeOperation);
        }
        require_authenticated(actor)
    }
}

static USER_POLICIES: [&dyn PolicyEvaluator; 1] = [&AdminOrProjectManager];
static PROJECT_POLICIES: [&dyn PolicyEvaluator; 2] = [&ProjectEditors, &AuthenticatedOrReadOnly];
static TASK_POLICIES: [&dyn PolicyEvaluator; 2] = [&TaskEditors, &AuthenticatedOrReadOnly];
static COMMENT_POLICIES: [&dyn PolicyEvaluator; 1] = [&CommentAuthors];

/// The ordered evaluators attached to a resource kind.
pub fn policies_for(resource: ResourceKind) -> &'static [&'static dyn PolicyEvaluator] {
    match resource {
        ResourceKind::User => &USER_POLICIES,
        ResourceKind::Project => &PROJECT_POLICIES,
        ResourceKind::Task => &TASK_POLICIES,
        ResourceKind::Comment => &COMMENT_POLICIES,
    }
}

/// Evaluates every policy attached to the action's resource kind.
///
/// Policies are combined with logical AND: the first denial is returned,
/// otherwise the decision of the last policy in the chain.
pub fn authorize(actor: &Actor, action: Action) -> PermissionDecision {
    let mut decision = PermissionDecision::allow(DecisionReason::SafeOperation);

    for policy in policies_for(action.resource) {
        decision = policy.evaluate(actor, action.operation);
        if !decision.allowed {
            tracing::debug!(
                user_id = ?actor.user_id(),
                resource = action.resource.as_str(),
                operation = ?action.operation,
                policy = policy.name(),
                reason = decision.reason.code(),
                "permission denied"
            );
            return decision;
        }
    }

    tracing::debug!(
        user_id = ?actor.user_id(),
        resource = action.resource.as_str(),
        operation = ?action.operation,
        reason = decision.reason.code(),
        "permission granted"
    );
    decision
}
