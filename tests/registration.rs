mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use common::{error_message, setup, PASSWORD};
use tms_api::accounts::{self, NewAccount};
use tms_api::authz::Role;
use tms_api::errors::AppError;
use tms_api::models::user::RegisterRequest;
use tms_api::token;

fn registration(username: &str) -> Value {
    json!({
        "username": username,
        "email": format!("{username}@example.com"),
        "password": PASSWORD,
        "password2": PASSWORD,
        "first_name": "Ada",
        "last_name": "Lovelace",
        "role": "Developer"
    })
}

#[tokio::test]
async fn register_then_login_keeps_a_single_token() -> Result<()> {
    let t = setup().await?;

    let (status, body) = t.post("/auth/register/", None, registration("ada")).await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["message"], "User registered successfully.");

    let user_id: Uuid = sqlx::query_scalar("SELECT id FROM users WHERE username = ?")
        .bind("ada")
        .fetch_one(&t.pool)
        .await?;
    assert_eq!(token::count_for_user(&t.pool, user_id).await?, 1);

    let credentials = json!({ "username": "ada", "password": PASSWORD });
    let (status, first) = t.post("/auth/login/", None, credentials.clone()).await?;
    assert_eq!(status, StatusCode::OK, "{first}");
    let (status, second) = t.post("/auth/login/", None, credentials).await?;
    assert_eq!(status, StatusCode::OK);

    let key = first["token"].as_str().unwrap_or_default();
    assert_eq!(key.len(), 40);
    assert_eq!(first["token"], second["token"]);
    assert_eq!(token::count_for_user(&t.pool, user_id).await?, 1);

    let (status, profile) = t.get("/auth/profile/", Some(key)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["username"], "ada");
    assert_eq!(profile["role"], "Developer");
    assert_eq!(profile["first_name"], "Ada");

    Ok(())
}

#[tokio::test]
async fn duplicate_username_reports_a_field_error() -> Result<()> {
    let t = setup().await?;
    t.account("ada", Role::Developer).await?;

    let mut body = registration("ada");
    body["email"] = json!("other@example.com");

    let (status, body) = t.post("/auth/register/", None, body).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["username"][0], "A user with that username already exists.");

    Ok(())
}

#[tokio::test]
async fn duplicate_email_reports_a_field_error() -> Result<()> {
    let t = setup().await?;
    t.account("ada", Role::Developer).await?;

    let (status, body) = t
        .post(
            "/auth/register/",
            None,
            json!({
                "username": "ada2",
                "email": "ada@example.com",
                "password": PASSWORD,
                "password2": PASSWORD
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["email"][0], "This field must be unique.");

    Ok(())
}

fn register_request(username: &str, email: &str) -> RegisterRequest {
    RegisterRequest {
        username: Some(username.to_string()),
        email: Some(email.to_string()),
        password: Some(PASSWORD.to_string()),
        password2: Some(PASSWORD.to_string()),
        ..RegisterRequest::default()
    }
}

fn field_message(err: &AppError, field: &str) -> Option<String> {
    match err {
        AppError::Validation(errors) => serde_json::to_value(errors).ok()?[field][0].as_str().map(str::to_string),
        _ => None,
    }
}

#[tokio::test]
async fn racing_registrations_claim_an_email_once() -> Result<()> {
    let t = setup().await?;

    let (first, second) = tokio::join!(
        accounts::register(&t.pool, register_request("ada", "shared@example.com")),
        accounts::register(&t.pool, register_request("grace", "shared@example.com")),
    );

    let (won, lost) = match (first, second) {
        (Ok(user), Err(err)) | (Err(err), Ok(user)) => (user, err),
        other => panic!("expected exactly one registration to succeed: {other:?}"),
    };
    assert_eq!(won.email, "shared@example.com");
    assert_eq!(field_message(&lost, "email").as_deref(), Some("This field must be unique."));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE email = ?")
        .bind("shared@example.com")
        .fetch_one(&t.pool)
        .await?;
    assert_eq!(count, 1);

    Ok(())
}

#[tokio::test]
async fn racing_registrations_claim_a_username_once() -> Result<()> {
    let t = setup().await?;

    let (first, second) = tokio::join!(
        accounts::register(&t.pool, register_request("ada", "ada@example.com")),
        accounts::register(&t.pool, register_request("ada", "other@example.com")),
    );

    let lost = match (first, second) {
        (Ok(_), Err(err)) | (Err(err), Ok(_)) => err,
        other => panic!("expected exactly one registration to succeed: {other:?}"),
    };
    assert_eq!(
        field_message(&lost, "username").as_deref(),
        Some("A user with that username already exists.")
    );

    Ok(())
}

#[tokio::test]
async fn duplicate_username_insert_is_a_field_error() -> Result<()> {
    let t = setup().await?;
    t.account("ada", Role::Developer).await?;

    let err = accounts::create_account(
        &t.pool,
        NewAccount {
            username: "ada".to_string(),
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            role: Role::Client,
            password_hash: String::new(),
        },
    )
    .await
    .expect_err("username is already taken");

    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        field_message(&err, "username").as_deref(),
        Some("A user with that username already exists.")
    );

    Ok(())
}

#[tokio::test]
async fn mismatched_passwords_are_reported_on_password() -> Result<()> {
    let t = setup().await?;
    let mut body = registration("ada");
    body["password2"] = json!("Different-P@ssw0rd");

    let (status, body) = t.post("/auth/register/", None, body).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "password": ["Passwords didn't match."] }));

    Ok(())
}

#[tokio::test]
async fn missing_fields_and_bad_role_are_collected() -> Result<()> {
    let t = setup().await?;

    let (status, body) = t
        .post("/auth/register/", None, json!({ "username": "ada", "role": "Owner" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["email"][0], "This field is required.");
    assert_eq!(body["password"][0], "This field is required.");
    assert_eq!(body["password2"][0], "This field is required.");
    assert_eq!(body["role"][0], "\"Owner\" is not a valid choice.");
    assert!(body.get("username").is_none());

    Ok(())
}

#[tokio::test]
async fn weak_passwords_fail_registration() -> Result<()> {
    let t = setup().await?;
    let mut body = registration("ada");
    body["password"] = json!("12345678");
    body["password2"] = json!("12345678");

    let (status, body) = t.post("/auth/register/", None, body).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let problems = body["password"].as_array().cloned().unwrap_or_default();
    assert!(problems.iter().any(|p| p == "This password is entirely numeric."), "{body}");

    Ok(())
}

#[tokio::test]
async fn bad_credentials_and_inactive_accounts_cannot_log_in() -> Result<()> {
    let t = setup().await?;
    let dev = t.account("dev", Role::Developer).await?;

    let (status, body) = t
        .post("/auth/login/", None, json!({ "username": "dev", "password": "wrong-password" }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["non_field_errors"][0], "Unable to log in with provided credentials.");

    let (status, body) = t
        .post("/auth/login/", None, json!({ "username": "nobody", "password": PASSWORD }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("non_field_errors").is_some());

    sqlx::query("UPDATE users SET is_active = 0 WHERE id = ?")
        .bind(dev.id)
        .execute(&t.pool)
        .await?;
    let (status, _) = t
        .post("/auth/login/", None, json!({ "username": "dev", "password": PASSWORD }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = t.post("/auth/login/", None, json!({})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["username"][0], "This field is required.");

    Ok(())
}

#[tokio::test]
async fn profile_requires_authentication() -> Result<()> {
    let t = setup().await?;

    let (status, body) = t.get("/auth/profile/", None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(&body), "Authentication credentials were not provided.");

    let (status, _) = t.request("GET", "/auth/profile/", Some("a b"), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    Ok(())
}
