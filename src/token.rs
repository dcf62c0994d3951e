use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::Actor;
use crate::errors::{AppError, AppResult};
use crate::models::user::DbUser;
use crate::utils::{random_hex, utc_now};

const TOKEN_BYTES: usize = 20;
const SCHEMES: [&str; 2] = ["Token", "Bearer"];

/// Returns the account's token, creating it on first use.
///
/// The unique constraint on `auth_tokens.user_id` keeps this idempotent even
/// when two requests race: the losing insert is ignored and both read the
/// surviving row.
pub async fn get_or_create(pool: &SqlitePool, user_id: Uuid) -> AppResult<String> {
    sqlx::query("INSERT INTO auth_tokens (key, user_id, created_at) VALUES (?, ?, ?) ON CONFLICT(user_id) DO NOTHING")
        .bind(random_hex(TOKEN_BYTES))
        .bind(user_id)
        .bind(utc_now())
        .execute(pool)
        .await?;

    let key: String = sqlx::query_scalar("SELECT key FROM auth_tokens WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    Ok(key)
}

pub async fn count_for_user(pool: &SqlitePool, user_id: Uuid) -> AppResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM auth_tokens WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Resolves a token key to the actor it authenticates.
pub async fn authenticate(pool: &SqlitePool, key: &str) -> AppResult<Actor> {
    let user = sqlx::query_as::<_, DbUser>(
        "SELECT u.id, u.username, u.email, u.password_hash, u.first_name, u.last_name, u.role, u.is_active, u.date_joined \
         FROM auth_tokens t JOIN users u ON u.id = t.user_id WHERE t.key = ?",
    )
    .bind(key)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::unauthorized("Invalid token."))?;

    if !user.is_active {
        return Err(AppError::unauthorized("User inactive or deleted."));
    }

    let role = user.parsed_role()?;
    Ok(Actor::authenticated(user.id, user.username, role))
}

/// Extracts the key from an `Authorization` header value.
///
/// `Ok(None)` means the header uses some other scheme and the request stays anonymous.
fn parse_authorization(value: &str) -> AppResult<Option<&str>> {
    let mut parts = value.split_whitespace();
    let scheme = match parts.next() {
        Some(scheme) if SCHEMES.iter().any(|s| s.eq_ignore_ascii_case(scheme)) => scheme,
        _ => return Ok(None),
    };

    let key = parts
        .next()
        .ok_or_else(|| AppError::unauthorized("Invalid token header. No credentials provided."))?;

    if parts.next().is_some() {
        return Err(AppError::unauthorized(
            "Invalid token header. Token string should not contain spaces.",
        ));
    }

    tracing::trace!(scheme, "token credentials supplied");
    Ok(Some(key))
}

#[async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = match parts.headers.get(axum::http::header::AUTHORIZATION) {
            Some(value) => value
                .to_str()
                .map_err(|_| AppError::unauthorized("Invalid token header. Token string should not contain invalid characters."))?,
            None => return Ok(Actor::Anonymous),
        };

        match parse_authorization(header)? {
            Some(key) => authenticate(&state.pool, key).await,
            None => Ok(Actor::Anonymous),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_scheme_is_parsed() {
        assert_eq!(parse_authorization("Token abc123").unwrap(), Some("abc123"));
        assert_eq!(parse_authorization("token abc123").unwrap(), Some("abc123"));
        assert_eq!(parse_authorization("Bearer abc123").unwrap(), Some("abc123"));
    }

    #[test]
    fn other_schemes_stay_anonymous() {
        assert_eq!(parse_authorization("Basic dXNlcjpwYXNz").unwrap(), None);
        assert_eq!(parse_authorization("").unwrap(), None);
    }

    #[test]
    fn malformed_token_headers_are_rejected() {
        assert!(matches!(parse_authorization("Token"), Err(AppError::Unauthorized(_))));
        assert!(matches!(parse_authorization("Token a b"), Err(AppError::Unauthorized(_))));
    }
}
