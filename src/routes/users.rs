use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::app::AppState;
use crate::authz::Actor;
use crate::errors::AppResult;
use crate::extract::ApiJson;
use crate::models::user::{User, UserCreateRequest, UserUpdateRequest};
use crate::models::UpdateMode;

#[utoipa::path(
    get,
    path = "/users/",
    tag = "Users",
    responses((status = 200, description = "List users", body = [User]))
)]
pub async fn list_users(State(state): State<AppState>, actor: Actor) -> AppResult<Json<Vec<User>>> {
    let users = state.gateway(&actor).list_users().await?;
    Ok(Json(users))
}

#[utoipa::path(
    post,
    path = "/users/",
    tag = "Users",
    request_body = UserCreateRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid or duplicate username"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Role may not manage users")
    ),
    security(("tokenAuth" = []))
)]
pub async fn create_user(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(payload): ApiJson<UserCreateRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = state.gateway(&actor).create_user(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    get,
    path = "/users/{id}/",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User detail", body = User),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> AppResult<Json<User>> {
    let user = state.gateway(&actor).get_user(&id).await?;
    Ok(Json(user))
}

#[utoipa::path(
    put,
    path = "/users/{id}/",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UserUpdateRequest,
    responses((status = 200, description = "User replaced", body = User)),
    security(("tokenAuth" = []))
)]
pub async fn replace_user(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UserUpdateRequest>,
) -> AppResult<Json<User>> {
    let user = state
        .gateway(&actor)
        .update_user(&id, payload, UpdateMode::Replace)
        .await?;
    Ok(Json(user))
}

#[utoipa::path(
    patch,
    path = "/users/{id}/",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UserUpdateRequest,
    responses((status = 200, description = "User updated", body = User)),
    security(("tokenAuth" = []))
)]
pub async fn update_user(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UserUpdateRequest>,
) -> AppResult<Json<User>> {
    let user = state
        .gateway(&actor)
        .update_user(&id, payload, UpdateMode::Partial)
        .await?;
    Ok(Json(user))
}

#[utoipa::path(
    delete,
    path = "/users/{id}/",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 401, description = "Target user is inactive"),
        (status = 404, description = "Not found")
    ),
    security(("tokenAuth" = []))
)]
pub async fn delete_user(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.gateway(&actor).delete_user(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
