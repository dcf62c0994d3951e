use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub task: Uuid,
    pub project: Uuid,
    pub user: Uuid,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbComment {
    pub id: Uuid,
    pub content: String,
    pub task_id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<DbComment> for Comment {
    fn from(value: DbComment) -> Self {
        Comment {
            id: value.id,
            content: value.content,
            task: value.task_id,
            project: value.project_id,
            user: value.user_id,
            created_by: value.created_by,
            created_at: value.created_at,
        }
    }
}

/// `user` and `created_by` are read-only; supplied values are discarded.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CommentCreateRequest {
    #[schema(example = "Blocked on the design review")]
    pub content: String,
    pub task: Uuid,
    pub project: Uuid,
    pub user: Option<Uuid>,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CommentUpdateRequest {
    pub content: Option<String>,
    pub task: Option<Uuid>,
    pub project: Option<Uuid>,
    pub user: Option<Uuid>,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CommentQuery {
    /// Case-insensitive substring of the content
    pub content: Option<String>,
    /// Exact task id
    pub task: Option<String>,
    /// Exact author id
    pub user: Option<String>,
    /// Exact project id of the comment's task
    pub project: Option<String>,
    /// Terms matched against the content
    pub search: Option<String>,
}
