//! Authorization - roles, actors and the permission evaluators
//!
//! This module implements the declarative permission model:
//! - A closed set of roles with exact, case-sensitive labels
//! - One or more pure evaluators attached to each resource kind
//! - AND composition of every evaluator attached to a resource
//!
//! Row-level rules (ownership substitution, inactive users) live in the
//! gateway, not here.

mod actor;
mod evaluator;
mod role;

pub use actor::{Actor, Identity};
pub use evaluator::{
    authorize, policies_for, Action, AdminOrProjectManager, AuthenticatedOrReadOnly, CommentAuthors,
    DecisionReason, Operation, PermissionDecision, PolicyEvaluator, ProjectEditors, ResourceKind,
    TaskEditors,
};
pub use role::{Role, UnknownRole};
