use sqlx::{Sqlite, Transaction};
use uuid::Uuid;

use super::{invalid_pk, not_blank, required_field, row_exists, Filters, Gateway};
use crate::authz::{Operation, ResourceKind};
use crate::errors::{AppError, AppResult};
use crate::models::project::{DbProject, Project, ProjectCreateRequest, ProjectQuery, ProjectUpdateRequest};
use crate::models::user::{self, DbUser, User};
use crate::models::UpdateMode;
use crate::utils::{parse_path_id, utc_now};

const PROJECT_COLUMNS: &str = "p.id, p.name, p.description, p.created_at, p.created_by";

impl Gateway<'_> {
    pub async fn list_projects(&self, query: ProjectQuery) -> AppResult<Vec<Project>> {
        self.authorize(ResourceKind::Project, Operation::Read)?;

        let mut filters = Filters::new();
        filters.contains("p.name", query.name.as_deref());
        filters.contains("p.description", query.description.as_deref());
        filters.search(&["p.name", "p.description"], query.search.as_deref());

        let sql = format!(
            "SELECT {PROJECT_COLUMNS} FROM projects p WHERE {} ORDER BY p.created_at ASC, p.rowid ASC",
            filters.where_clause()
        );
        let rows = filters
            .bind_to(sqlx::query_as::<_, DbProject>(&sql))
            .fetch_all(self.pool)
            .await?;

        let mut projects = Vec::with_capacity(rows.len());
        for row in rows {
            let users = self.project_members(row.id).await?;
            projects.push(row.into_project(users));
        }
        Ok(projects)
    }

    pub async fn get_project(&self, id: &str) -> AppResult<Project> {
        self.authorize(ResourceKind::Project, Operation::Read)?;
        let id = parse_path_id(id)?;
        self.load_project(id).await
    }

    pub async fn create_project(&self, request: ProjectCreateRequest) -> AppResult<Project> {
        self.authorize(ResourceKind::Project, Operation::Create)?;
        let caller = self.caller()?;

        not_blank("name", &request.name)?;
        self.check_members(&request.user_ids).await?;

        let project_id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO projects (id, name, description, created_at, created_by) VALUES (?, ?, ?, ?, ?)")
            .bind(project_id)
            .bind(&request.name)
            .bind(request.description.as_deref().unwrap_or_default())
            .bind(utc_now())
            .bind(caller.user_id)
            .execute(&mut *tx)
            .await?;

        replace_members(&mut tx, project_id, &request.user_ids).await?;
        tx.commit().await?;

        tracing::info!(project_id = %project_id, created_by = %caller.user_id, "project created");
        self.load_project(project_id).await
    }

    pub async fn update_project(
        &self,
        id: &str,
        request: ProjectUpdateRequest,
        mode: UpdateMode,
    ) -> AppResult<Project> {
        self.authorize(ResourceKind::Project, Operation::Update)?;
        let id = parse_path_id(id)?;

        let mut project = self.fetch_project_row(id).await?;

        if mode == UpdateMode::Replace && request.name.is_none() {
            return Err(required_field("name"));
        }
        if let Some(name) = request.name {
            not_blank("name", &name)?;
            project.name = name;
        }
        if let Some(description) = request.description {
            project.description = description;
        }
        if let Some(user_ids) = request.user_ids.as_deref() {
            self.check_members(user_ids).await?;
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE projects SET name = ?, description = ? WHERE id = ?")
            .bind(&project.name)
            .bind(&project.description)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if let Some(user_ids) = request.user_ids.as_deref() {
            replace_members(&mut tx, id, user_ids).await?;
        }
        tx.commit().await?;

        tracing::info!(project_id = %id, "project updated");
        self.load_project(id).await
    }

    /// Tasks and comments go with the project.
    pub async fn delete_project(&self, id: &str) -> AppResult<()> {
        self.authorize(ResourceKind::Project, Operation::Delete)?;
        let id = parse_path_id(id)?;

        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::missing());
        }

        tracing::info!(project_id = %id, "project deleted");
        Ok(())
    }

    async fn fetch_project_row(&self, id: Uuid) -> AppResult<DbProject> {
        sqlx::query_as::<_, DbProject>(&format!("SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.id = ?"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(AppError::missing)
    }

    async fn load_project(&self, id: Uuid) -> AppResult<Project> {
        let row = self.fetch_project_row(id).await?;
        let users = self.project_members(id).await?;
        Ok(row.into_project(users))
    }

    async fn project_members(&self, project_id: Uuid) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, DbUser>(
            "SELECT u.id, u.username, u.email, u.password_hash, u.first_name, u.last_name, u.role, u.is_active, u.date_joined \
             FROM project_users pu JOIN users u ON u.id = pu.user_id \
             WHERE pu.project_id = ? ORDER BY u.date_joined ASC, u.rowid ASC",
        )
        .bind(project_id)
        .fetch_all(self.pool)
        .await?;

        Ok(user::listable(rows))
    }

    async fn check_members(&self, user_ids: &[Uuid]) -> AppResult<()> {
        for &user_id in user_ids {
            if !row_exists(self.pool, "users", user_id).await? {
                return Err(invalid_pk("user_ids", user_id));
            }
        }
        Ok(())
    }
}

async fn replace_members(tx: &mut Transaction<'_, Sqlite>, project_id: Uuid, user_ids: &[Uuid]) -> AppResult<()> {
    sqlx::query("DELETE FROM project_users WHERE project_id = ?")
        .bind(project_id)
        .execute(&mut **tx)
        .await?;

    for user_id in user_ids {
        sqlx::query("INSERT OR IGNORE INTO project_users (project_id, user_id) VALUES (?, ?)")
            .bind(project_id)
            .bind(user_id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}
