use uuid::Uuid;

use super::{invalid_pk, not_blank, required_field, row_exists, Filters, Gateway};
use crate::authz::{Operation, ResourceKind};
use crate::errors::{AppError, AppResult};
use crate::models::comment::{Comment, CommentCreateRequest, CommentQuery, CommentUpdateRequest, DbComment};
use crate::models::UpdateMode;
use crate::utils::{parse_filter_id, parse_path_id, utc_now};

const COMMENT_COLUMNS: &str = "c.id, c.content, c.task_id, c.project_id, c.user_id, c.created_by, c.created_at";

fn filter_id(field: &str, raw: Option<&str>) -> AppResult<Option<Uuid>> {
    raw.filter(|raw| !raw.trim().is_empty())
        .map(|raw| parse_filter_id(field, raw))
        .transpose()
}

impl Gateway<'_> {
    pub async fn list_comments(&self, query: CommentQuery) -> AppResult<Vec<Comment>> {
        self.authorize(ResourceKind::Comment, Operation::Read)?;

        let mut filters = Filters::new();
        filters.contains("c.content", query.content.as_deref());
        filters.equals_id("c.task_id", filter_id("task", query.task.as_deref())?);
        filters.equals_id("c.user_id", filter_id("user", query.user.as_deref())?);
        // Through the task, not the comment's own project column.
        filters.equals_id("t.project_id", filter_id("project", query.project.as_deref())?);
        filters.search(&["c.content"], query.search.as_deref());

        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments c JOIN tasks t ON t.id = c.task_id \
             WHERE {} ORDER BY c.created_at ASC, c.rowid ASC",
            filters.where_clause()
        );
        let rows = filters
            .bind_to(sqlx::query_as::<_, DbComment>(&sql))
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Comment::from).collect())
    }

    pub async fn get_comment(&self, id: &str) -> AppResult<Comment> {
        self.authorize(ResourceKind::Comment, Operation::Read)?;
        let id = parse_path_id(id)?;
        Ok(self.fetch_comment(id).await?.into())
    }

    /// Author and creator are always the caller, whatever the body says.
    pub async fn create_comment(&self, request: CommentCreateRequest) -> AppResult<Comment> {
        self.authorize(ResourceKind::Comment, Operation::Create)?;
        let caller = self.caller()?;

        not_blank("content", &request.content)?;
        self.check_comment_refs(Some(request.task), Some(request.project)).await?;

        let comment_id = Uuid::new_v4();

        sqlx::query(
            "INSERT INTO comments (id, content, task_id, project_id, user_id, created_by, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(comment_id)
        .bind(&request.content)
        .bind(request.task)
        .bind(request.project)
        .bind(caller.user_id)
        .bind(caller.user_id)
        .bind(utc_now())
        .execute(self.pool)
        .await?;

        tracing::info!(comment_id = %comment_id, task_id = %request.task, user_id = %caller.user_id, "comment created");
        Ok(self.fetch_comment(comment_id).await?.into())
    }

    /// Re-stamps author and creator with the caller.
    pub async fn update_comment(
        &self,
        id: &str,
        request: CommentUpdateRequest,
        mode: UpdateMode,
    ) -> AppResult<Comment> {
        self.authorize(ResourceKind::Comment, Operation::Update)?;
        let id = parse_path_id(id)?;
        let caller = self.caller()?;

        let mut comment: Comment = self.fetch_comment(id).await?.into();

        if mode == UpdateMode::Replace {
            for (field, present) in [
                ("content", request.content.is_some()),
                ("task", request.task.is_some()),
                ("project", request.project.is_some()),
            ] {
                if !present {
                    return Err(required_field(field));
                }
            }
        }

        if let Some(content) = request.content {
            not_blank("content", &content)?;
            comment.content = content;
        }
        self.check_comment_refs(request.task, request.project).await?;
        if let Some(task) = request.task {
            comment.task = task;
        }
        if let Some(project) = request.project {
            comment.project = project;
        }
        comment.user = caller.user_id;
        comment.created_by = caller.user_id;

        sqlx::query(
            "UPDATE comments SET content = ?, task_id = ?, project_id = ?, user_id = ?, created_by = ? WHERE id = ?",
        )
        .bind(&comment.content)
        .bind(comment.task)
        .bind(comment.project)
        .bind(comment.user)
        .bind(comment.created_by)
        .bind(id)
        .execute(self.pool)
        .await?;

        tracing::info!(comment_id = %id, user_id = %caller.user_id, "comment updated");
        Ok(comment)
    }

    pub async fn delete_comment(&self, id: &str) -> AppResult<()> {
        self.authorize(ResourceKind::Comment, Operation::Delete)?;
        let id = parse_path_id(id)?;

        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::missing());
        }

        tracing::info!(comment_id = %id, "comment deleted");
        Ok(())
    }

    async fn fetch_comment(&self, id: Uuid) -> AppResult<DbComment> {
        sqlx::query_as::<_, DbComment>(&format!("SELECT {COMMENT_COLUMNS} FROM comments c WHERE c.id = ?"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(AppError::missing)
    }

    async fn check_comment_refs(&self, task: Option<Uuid>, project: Option<Uuid>) -> AppResult<()> {
        if let Some(task) = task {
            if !row_exists(self.pool, "tasks", task).await? {
                return Err(invalid_pk("task", task));
            }
        }
        if let Some(project) = project {
            if !row_exists(self.pool, "projects", project).await? {
                return Err(invalid_pk("project", project));
            }
        }
        Ok(())
    }
}
