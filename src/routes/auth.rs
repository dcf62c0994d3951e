use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::accounts;
use crate::app::AppState;
use crate::authz::Actor;
use crate::errors::AppResult;
use crate::extract::ApiJson;
use crate::models::user::{LoginRequest, MessageResponse, Profile, RegisterRequest, TokenResponse};

#[utoipa::path(
    post,
    path = "/auth/register/",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = MessageResponse),
        (status = 400, description = "Field errors keyed by field name")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    accounts::register(&state.pool, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User registered successfully.".to_string(),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/auth/login/",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token for the account", body = TokenResponse),
        (status = 400, description = "Missing fields or bad credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let token = accounts::login(&state.pool, payload).await?;
    Ok(Json(TokenResponse { token }))
}

#[utoipa::path(
    get,
    path = "/auth/profile/",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = Profile),
        (status = 401, description = "Not authenticated")
    ),
    security(("tokenAuth" = []))
)]
pub async fn profile(State(state): State<AppState>, actor: Actor) -> AppResult<Json<Profile>> {
    let profile = accounts::profile(&state.pool, &actor).await?;
    Ok(Json(profile))
}
