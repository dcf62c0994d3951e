//! Resource access gateway.
//!
//! Every resource operation goes through a per-request [`Gateway`]: it runs
//! the evaluator chain for the resource kind, then the row-level rules
//! (identity substitution, inactive users, referential checks), then the
//! storage call. Task assignment notifications are emitted from here once the
//! mutation is stored.

mod comments;
mod projects;
mod tasks;
mod users;

use sqlx::sqlite::SqliteArguments;
use sqlx::query::QueryAs;
use sqlx::{Sqlite, SqlitePool};
use uuid::Uuid;

use crate::authz::{authorize, Action, Actor, DecisionReason, Identity, Operation, ResourceKind};
use crate::errors::{AppError, AppResult};
use crate::notifications::{NotificationDispatcher, NotificationRequest};
use crate::utils::search_terms;

pub(crate) const NOT_AUTHENTICATED: &str = "Authentication credentials were not provided.";
pub(crate) const NOT_PERMITTED: &str = "You do not have permission to perform this action.";

pub struct Gateway<'a> {
    pool: &'a SqlitePool,
    actor: &'a Actor,
    notifier: &'a NotificationDispatcher,
}

impl<'a> Gateway<'a> {
    pub fn new(pool: &'a SqlitePool, actor: &'a Actor, notifier: &'a NotificationDispatcher) -> Self {
        Self { pool, actor, notifier }
    }

    /// Runs the evaluator chain and maps a denial onto 401 or 403.
    fn authorize(&self, resource: ResourceKind, operation: Operation) -> AppResult<()> {
        let decision = authorize(self.actor, Action::new(operation, resource));
        if decision.allowed {
            return Ok(());
        }

        match decision.reason {
            DecisionReason::NotAuthenticated => Err(AppError::unauthorized(NOT_AUTHENTICATED)),
            _ => Err(AppError::permission_denied(NOT_PERMITTED)),
        }
    }

    /// The caller of an unsafe operation. Only anonymous actors fail here,
    /// and the evaluators already deny them every write.
    fn caller(&self) -> AppResult<&'a Identity> {
        self.actor
            .identity()
            .ok_or_else(|| AppError::unauthorized(NOT_AUTHENTICATED))
    }

    /// Sends the assignment email and drops the outcome.
    async fn notify_assignment(&self, recipient: &str, task_title: &str) {
        let assigned_by = self
            .actor
            .identity()
            .map(|identity| identity.username.as_str())
            .unwrap_or_default();

        let request = NotificationRequest::new(recipient, task_title, assigned_by);
        let outcome = self.notifier.dispatch(&request).await;

        tracing::debug!(
            succeeded = outcome.succeeded,
            status_code = outcome.status_code,
            "assignment notification finished"
        );
    }
}

pub(crate) fn invalid_pk(field: &str, id: Uuid) -> AppError {
    AppError::bad_request(format!("{field}: Invalid pk \"{id}\" - object does not exist."))
}

pub(crate) fn required_field(field: &str) -> AppError {
    AppError::bad_request(format!("{field}: This field is required."))
}

pub(crate) fn not_blank(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::bad_request(format!("{field}: This field may not be blank.")));
    }
    Ok(())
}

pub(crate) async fn row_exists(pool: &SqlitePool, table: &str, id: Uuid) -> AppResult<bool> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(1) FROM {table} WHERE id = ?"))
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

enum FilterValue {
    Text(String),
    Id(Uuid),
}

/// Accumulates `WHERE` conditions and their bind values in order.
#[derive(Default)]
pub(crate) struct Filters {
    conditions: Vec<String>,
    values: Vec<FilterValue>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Case-insensitive substring match.
    pub fn contains(&mut self, column: &str, needle: Option<&str>) {
        if let Some(needle) = needle.filter(|n| !n.is_empty()) {
            self.conditions.push(format!("instr(lower({column}), lower(?)) > 0"));
            self.values.push(FilterValue::Text(needle.to_string()));
        }
    }

    pub fn equals_id(&mut self, column: &str, id: Option<Uuid>) {
        if let Some(id) = id {
            self.conditions.push(format!("{column} = ?"));
            self.values.push(FilterValue::Id(id));
        }
    }

    /// Every term must match at least one of `columns`.
    pub fn search(&mut self, columns: &[&str], search: Option<&str>) {
        let Some(search) = search else { return };

        for term in search_terms(search) {
            let any = columns
                .iter()
                .map(|column| format!("instr(lower({column}), lower(?)) > 0"))
                .collect::<Vec<_>>()
                .join(" OR ");
            self.conditions.push(format!("({any})"));
            for _ in columns {
                self.values.push(FilterValue::Text(term.clone()));
            }
        }
    }

    pub fn where_clause(&self) -> String {
        let mut conditions = vec!["1=1".to_string()];
        conditions.extend(self.conditions.iter().cloned());
        conditions.join(" AND ")
    }

    pub fn bind_to<'q, O>(
        self,
        mut query: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    ) -> QueryAs<'q, Sqlite, O, SqliteArguments<'q>> {
        for value in self.values {
            query = match value {
                FilterValue::Text(text) => query.bind(text),
                FilterValue::Id(id) => query.bind(id),
            };
        }
        query
    }
}
