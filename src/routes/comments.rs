use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::app::AppState;
use crate::authz::Actor;
use crate::errors::AppResult;
use crate::extract::ApiJson;
use crate::models::comment::{Comment, CommentCreateRequest, CommentQuery, CommentUpdateRequest};
use crate::models::UpdateMode;

#[utoipa::path(
    get,
    path = "/comments/",
    tag = "Comments",
    params(CommentQuery),
    responses((status = 200, description = "List comments", body = [Comment]))
)]
pub async fn list_comments(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<CommentQuery>,
) -> AppResult<Json<Vec<Comment>>> {
    let comments = state.gateway(&actor).list_comments(query).await?;
    Ok(Json(comments))
}

#[utoipa::path(
    post,
    path = "/comments/",
    tag = "Comments",
    request_body = CommentCreateRequest,
    responses(
        (status = 201, description = "Comment created by the caller", body = Comment),
        (status = 401, description = "Not authenticated")
    ),
    security(("tokenAuth" = []))
)]
pub async fn create_comment(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(payload): ApiJson<CommentCreateRequest>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    let comment = state.gateway(&actor).create_comment(payload).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

#[utoipa::path(
    get,
    path = "/comments/{id}/",
    tag = "Comments",
    params(("id" = Uuid, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Comment detail", body = Comment),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_comment(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> AppResult<Json<Comment>> {
    let comment = state.gateway(&actor).get_comment(&id).await?;
    Ok(Json(comment))
}

#[utoipa::path(
    put,
    path = "/comments/{id}/",
    tag = "Comments",
    params(("id" = Uuid, Path, description = "Comment id")),
    request_body = CommentUpdateRequest,
    responses((status = 200, description = "Comment replaced", body = Comment)),
    security(("tokenAuth" = []))
)]
pub async fn replace_comment(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<CommentUpdateRequest>,
) -> AppResult<Json<Comment>> {
    let comment = state
        .gateway(&actor)
        .update_comment(&id, payload, UpdateMode::Replace)
        .await?;
    Ok(Json(comment))
}

#[utoipa::path(
    patch,
    path = "/comments/{id}/",
    tag = "Comments",
    params(("id" = Uuid, Path, description = "Comment id")),
    request_body = CommentUpdateRequest,
    responses((status = 200, description = "Comment updated", body = Comment)),
    security(("tokenAuth" = []))
)]
pub async fn update_comment(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<CommentUpdateRequest>,
) -> AppResult<Json<Comment>> {
    let comment = state
        .gateway(&actor)
        .update_comment(&id, payload, UpdateMode::Partial)
        .await?;
    Ok(Json(comment))
}

#[utoipa::path(
    delete,
    path = "/comments/{id}/",
    tag = "Comments",
    params(("id" = Uuid, Path, description = "Comment id")),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 404, description = "Not found")
    ),
    security(("tokenAuth" = []))
)]
pub async fn delete_comment(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.gateway(&actor).delete_comment(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
