use uuid::Uuid;

use super::{invalid_pk, not_blank, required_field, row_exists, Filters, Gateway};
use crate::accounts;
use crate::authz::{Operation, ResourceKind};
use crate::errors::{AppError, AppResult};
use crate::models::task::{DbTask, Task, TaskCreateRequest, TaskQuery, TaskUpdateRequest};
use crate::models::user::DbUser;
use crate::models::UpdateMode;
use crate::utils::{parse_filter_id, parse_path_id, utc_now};

const TASK_COLUMNS: &str =
    "t.id, t.title, t.description, t.status, t.assigned_to, t.project_id, t.created_by, t.created_at";

impl Gateway<'_> {
    pub async fn list_tasks(&self, query: TaskQuery) -> AppResult<Vec<Task>> {
        self.authorize(ResourceKind::Task, Operation::Read)?;

        let project = query
            .project
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| parse_filter_id("project", raw))
            .transpose()?;

        let mut filters = Filters::new();
        filters.contains("t.title", query.title.as_deref());
        filters.contains("t.status", query.status.as_deref());
        filters.contains("a.username", query.assigned_to.as_deref());
        filters.equals_id("t.project_id", project);
        filters.search(&["t.title", "t.description"], query.search.as_deref());

        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks t LEFT JOIN users a ON a.id = t.assigned_to \
             WHERE {} ORDER BY t.created_at ASC, t.rowid ASC",
            filters.where_clause()
        );
        let rows = filters
            .bind_to(sqlx::query_as::<_, DbTask>(&sql))
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(Task::try_from).collect()
    }

    pub async fn get_task(&self, id: &str) -> AppResult<Task> {
        self.authorize(ResourceKind::Task, Operation::Read)?;
        let id = parse_path_id(id)?;
        self.fetch_task(id).await?.try_into()
    }

    /// The caller becomes the creator; an assignee with an email is notified.
    pub async fn create_task(&self, request: TaskCreateRequest) -> AppResult<Task> {
        self.authorize(ResourceKind::Task, Operation::Create)?;
        let caller = self.caller()?;

        not_blank("title", &request.title)?;
        self.check_project(request.project).await?;
        let assignee = self.assignee(request.assigned_to).await?;

        let task_id = Uuid::new_v4();
        let status = request.status.unwrap_or_default();

        sqlx::query(
            "INSERT INTO tasks (id, title, description, project_id, assigned_to, status, created_by, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(task_id)
        .bind(&request.title)
        .bind(request.description.as_deref().unwrap_or_default())
        .bind(request.project)
        .bind(request.assigned_to)
        .bind(status.as_str())
        .bind(caller.user_id)
        .bind(utc_now())
        .execute(self.pool)
        .await?;

        tracing::info!(task_id = %task_id, project_id = %request.project, created_by = %caller.user_id, "task created");

        if let Some(assignee) = assignee.filter(|user| !user.email.is_empty()) {
            self.notify_assignment(&assignee.email, &request.title).await;
        }

        self.fetch_task(task_id).await?.try_into()
    }

    /// Open to every authenticated role. The creator never changes; a change
    /// of assignee notifies the new one.
    pub async fn update_task(&self, id: &str, request: TaskUpdateRequest, mode: UpdateMode) -> AppResult<Task> {
        self.authorize(ResourceKind::Task, Operation::Update)?;
        let id = parse_path_id(id)?;

        let mut task: Task = self.fetch_task(id).await?.try_into()?;
        let previous_assignee = task.assigned_to;

        if mode == UpdateMode::Replace {
            if request.title.is_none() {
                return Err(required_field("title"));
            }
            if request.project.is_none() {
                return Err(required_field("project"));
            }
        }

        if let Some(title) = request.title {
            not_blank("title", &title)?;
            task.title = title;
        }
        if let Some(description) = request.description {
            task.description = description;
        }
        if let Some(status) = request.status {
            task.status = status;
        }
        if let Some(project) = request.project {
            self.check_project(project).await?;
            task.project = project;
        }

        let mut assignee = None;
        if let Some(assigned_to) = request.assigned_to {
            assignee = self.assignee(assigned_to).await?;
            task.assigned_to = assigned_to;
        }

        sqlx::query(
            "UPDATE tasks SET title = ?, description = ?, status = ?, project_id = ?, assigned_to = ? WHERE id = ?",
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.project)
        .bind(task.assigned_to)
        .bind(id)
        .execute(self.pool)
        .await?;

        tracing::info!(task_id = %id, status = task.status.as_str(), "task updated");

        if task.assigned_to.is_some() && task.assigned_to != previous_assignee {
            if let Some(assignee) = assignee.filter(|user| !user.email.is_empty()) {
                self.notify_assignment(&assignee.email, &task.title).await;
            }
        }

        Ok(task)
    }

    pub async fn delete_task(&self, id: &str) -> AppResult<()> {
        self.authorize(ResourceKind::Task, Operation::Delete)?;
        let id = parse_path_id(id)?;

        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::missing());
        }

        tracing::info!(task_id = %id, "task deleted");
        Ok(())
    }

    async fn fetch_task(&self, id: Uuid) -> AppResult<DbTask> {
        sqlx::query_as::<_, DbTask>(&format!("SELECT {TASK_COLUMNS} FROM tasks t WHERE t.id = ?"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(AppError::missing)
    }

    async fn check_project(&self, project: Uuid) -> AppResult<()> {
        if !row_exists(self.pool, "projects", project).await? {
            return Err(invalid_pk("project", project));
        }
        Ok(())
    }

    async fn assignee(&self, assigned_to: Option<Uuid>) -> AppResult<Option<DbUser>> {
        let Some(user_id) = assigned_to else {
            return Ok(None);
        };

        match accounts::fetch_user(self.pool, user_id).await {
            Ok(user) => Ok(Some(user)),
            Err(AppError::NotFound(_)) => Err(invalid_pk("assigned_to", user_id)),
            Err(err) => Err(err),
        }
    }
}
