#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};
use tower::util::ServiceExt; // for `oneshot`
use uuid::Uuid;

use tms_api::accounts::{create_account, NewAccount};
use tms_api::authz::Role;
use tms_api::create_app_with_transport;
use tms_api::notifications::{MailTransport, NotificationRequest, NotifyError};
use tms_api::token;
use tms_api::utils::hash_password;

pub const PASSWORD: &str = "S3cur3P@ssword!";

/// Records every request instead of sending it.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<NotificationRequest>>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<NotificationRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, request: &NotificationRequest) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(request.clone());
        Ok(())
    }
}

/// Fails like a misconfigured SMTP relay.
pub struct FailingTransport;

#[async_trait]
impl MailTransport for FailingTransport {
    async fn send(&self, _request: &NotificationRequest) -> Result<(), NotifyError> {
        Err(NotifyError::Smtp("Connection refused (os error 111)".to_string()))
    }
}

pub struct PanickingTransport;

#[async_trait]
impl MailTransport for PanickingTransport {
    async fn send(&self, _request: &NotificationRequest) -> Result<(), NotifyError> {
        panic!("mail transport blew up");
    }
}

pub struct TestApp {
    pub app: Router,
    pub pool: SqlitePool,
    pub mail: Arc<RecordingTransport>,
    _dir: TempDir,
}

pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub token: String,
}

async fn migrated_pool(dir: &TempDir) -> Result<SqlitePool> {
    let opts = SqliteConnectOptions::new()
        .filename(dir.path().join("test.db"))
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"))
        .await?;
    migrator.run(&pool).await?;

    Ok(pool)
}

pub async fn setup() -> Result<TestApp> {
    let dir = tempdir().context("failed to create tempdir")?;
    let pool = migrated_pool(&dir).await?;
    let mail = Arc::new(RecordingTransport::default());
    let app = create_app_with_transport(pool.clone(), mail.clone());

    Ok(TestApp {
        app,
        pool,
        mail,
        _dir: dir,
    })
}

/// Same as [`setup`] but with a caller-supplied transport; `mail` stays empty.
pub async fn setup_with_transport(transport: Arc<dyn MailTransport>) -> Result<TestApp> {
    let dir = tempdir().context("failed to create tempdir")?;
    let pool = migrated_pool(&dir).await?;
    let app = create_app_with_transport(pool.clone(), transport);

    Ok(TestApp {
        app,
        pool,
        mail: Arc::new(RecordingTransport::default()),
        _dir: dir,
    })
}

impl TestApp {
    /// Creates an account directly in storage and returns its token.
    pub async fn account(&self, username: &str, role: Role) -> Result<Account> {
        self.account_with_email(username, role, &format!("{username}@example.com")).await
    }

    pub async fn account_with_email(&self, username: &str, role: Role, email: &str) -> Result<Account> {
        let user = create_account(
            &self.pool,
            NewAccount {
                username: username.to_string(),
                email: email.to_string(),
                first_name: String::new(),
                last_name: String::new(),
                role,
                password_hash: hash_password(PASSWORD)?,
            },
        )
        .await?;
        let token = token::get_or_create(&self.pool, user.id).await?;

        Ok(Account {
            id: user.id,
            username: user.username,
            token,
        })
    }

    pub async fn request(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Token {}", token));
        }

        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let resp = self.app.clone().oneshot(req).await?;
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .with_context(|| format!("non-JSON body: {}", String::from_utf8_lossy(&bytes)))?
        };

        Ok((status, value))
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.request("GET", uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.request("POST", uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.request("PATCH", uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.request("PUT", uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.request("DELETE", uri, token, None).await
    }

    pub async fn create_project(&self, token: &str, name: &str) -> Result<String> {
        let (status, body) = self
            .post("/projects/", Some(token), serde_json::json!({ "name": name, "description": format!("{name} description") }))
            .await?;
        assert_eq!(status, StatusCode::CREATED, "project create failed: {body}");
        id_of(&body)
    }

    pub async fn create_task(&self, token: &str, body: Value) -> Result<String> {
        let (status, body) = self.post("/tasks/", Some(token), body).await?;
        assert_eq!(status, StatusCode::CREATED, "task create failed: {body}");
        id_of(&body)
    }
}

pub fn id_of(body: &Value) -> Result<String> {
    body.get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .context("missing id")
}

pub fn error_message(body: &Value) -> &str {
    body["error"]["message"].as_str().unwrap_or_default()
}
