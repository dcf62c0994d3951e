use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::app::AppState;
use crate::authz::Actor;
use crate::errors::AppResult;
use crate::extract::ApiJson;
use crate::models::task::{Task, TaskCreateRequest, TaskQuery, TaskUpdateRequest};
use crate::models::UpdateMode;

#[utoipa::path(
    get,
    path = "/tasks/",
    tag = "Tasks",
    params(TaskQuery),
    responses(
        (status = 200, description = "List tasks", body = [Task]),
        (status = 400, description = "Malformed project id")
    )
)]
pub async fn list_tasks(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<TaskQuery>,
) -> AppResult<Json<Vec<Task>>> {
    let tasks = state.gateway(&actor).list_tasks(query).await?;
    Ok(Json(tasks))
}

#[utoipa::path(
    post,
    path = "/tasks/",
    tag = "Tasks",
    request_body = TaskCreateRequest,
    responses(
        (status = 201, description = "Task created; the assignee is emailed", body = Task),
        (status = 400, description = "Invalid payload or unknown project/assignee"),
        (status = 403, description = "Clients may not create tasks")
    ),
    security(("tokenAuth" = []))
)]
pub async fn create_task(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(payload): ApiJson<TaskCreateRequest>,
) -> AppResult<(StatusCode, Json<Task>)> {
    let task = state.gateway(&actor).create_task(payload).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

#[utoipa::path(
    get,
    path = "/tasks/{id}/",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task detail", body = Task),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_task(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> AppResult<Json<Task>> {
    let task = state.gateway(&actor).get_task(&id).await?;
    Ok(Json(task))
}

#[utoipa::path(
    put,
    path = "/tasks/{id}/",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    request_body = TaskUpdateRequest,
    responses((status = 200, description = "Task replaced", body = Task)),
    security(("tokenAuth" = []))
)]
pub async fn replace_task(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<TaskUpdateRequest>,
) -> AppResult<Json<Task>> {
    let task = state
        .gateway(&actor)
        .update_task(&id, payload, UpdateMode::Replace)
        .await?;
    Ok(Json(task))
}

#[utoipa::path(
    patch,
    path = "/tasks/{id}/",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    request_body = TaskUpdateRequest,
    responses((status = 200, description = "Task updated; a new assignee is emailed", body = Task)),
    security(("tokenAuth" = []))
)]
pub async fn update_task(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<TaskUpdateRequest>,
) -> AppResult<Json<Task>> {
    let task = state
        .gateway(&actor)
        .update_task(&id, payload, UpdateMode::Partial)
        .await?;
    Ok(Json(task))
}

#[utoipa::path(
    delete,
    path = "/tasks/{id}/",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 404, description = "Not found")
    ),
    security(("tokenAuth" = []))
)]
pub async fn delete_task(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.gateway(&actor).delete_task(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
