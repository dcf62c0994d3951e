use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::app::AppState;
use crate::authz::Actor;
use crate::errors::AppResult;
use crate::extract::ApiJson;
use crate::models::project::{Project, ProjectCreateRequest, ProjectQuery, ProjectUpdateRequest};
use crate::models::UpdateMode;

#[utoipa::path(
    get,
    path = "/projects/",
    tag = "Projects",
    params(ProjectQuery),
    responses((status = 200, description = "List projects", body = [Project]))
)]
pub async fn list_projects(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<ProjectQuery>,
) -> AppResult<Json<Vec<Project>>> {
    let projects = state.gateway(&actor).list_projects(query).await?;
    Ok(Json(projects))
}

#[utoipa::path(
    post,
    path = "/projects/",
    tag = "Projects",
    request_body = ProjectCreateRequest,
    responses(
        (status = 201, description = "Project created", body = Project),
        (status = 400, description = "Invalid payload or unknown member"),
        (status = 403, description = "Role may not create projects")
    ),
    security(("tokenAuth" = []))
)]
pub async fn create_project(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(payload): ApiJson<ProjectCreateRequest>,
) -> AppResult<(StatusCode, Json<Project>)> {
    let project = state.gateway(&actor).create_project(payload).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

#[utoipa::path(
    get,
    path = "/projects/{id}/",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 200, description = "Project detail", body = Project),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_project(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> AppResult<Json<Project>> {
    let project = state.gateway(&actor).get_project(&id).await?;
    Ok(Json(project))
}

#[utoipa::path(
    put,
    path = "/projects/{id}/",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    request_body = ProjectUpdateRequest,
    responses((status = 200, description = "Project replaced", body = Project)),
    security(("tokenAuth" = []))
)]
pub async fn replace_project(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<ProjectUpdateRequest>,
) -> AppResult<Json<Project>> {
    let project = state
        .gateway(&actor)
        .update_project(&id, payload, UpdateMode::Replace)
        .await?;
    Ok(Json(project))
}

#[utoipa::path(
    patch,
    path = "/projects/{id}/",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    request_body = ProjectUpdateRequest,
    responses((status = 200, description = "Project updated", body = Project)),
    security(("tokenAuth" = []))
)]
pub async fn update_project(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<ProjectUpdateRequest>,
) -> AppResult<Json<Project>> {
    let project = state
        .gateway(&actor)
        .update_project(&id, payload, UpdateMode::Partial)
        .await?;
    Ok(Json(project))
}

#[utoipa::path(
    delete,
    path = "/projects/{id}/",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    responses(
        (status = 204, description = "Project and its tasks deleted"),
        (status = 404, description = "Not found")
    ),
    security(("tokenAuth" = []))
)]
pub async fn delete_project(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.gateway(&actor).delete_project(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
