use std::sync::Arc;

use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::Actor;
use crate::errors::AppError;
use crate::gateway::Gateway;
use crate::notifications::{MailTransport, NotificationDispatcher, SmtpConfig, SmtpMailer};
use crate::routes::{auth, comments, projects, tasks, users};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub notifier: Arc<NotificationDispatcher>,
}

impl AppState {
    pub fn new(pool: SqlitePool, transport: Arc<dyn MailTransport>) -> Self {
        Self {
            pool,
            notifier: Arc::new(NotificationDispatcher::new(transport)),
        }
    }

    /// Request-scoped access to the resources on behalf of `actor`.
    pub fn gateway<'a>(&'a self, actor: &'a Actor) -> Gateway<'a> {
        Gateway::new(&self.pool, actor, &self.notifier)
    }
}

/// Builds the router with the SMTP mailer configured from the environment.
pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let mailer = SmtpMailer::new(SmtpConfig::from_env()?);
    Ok(create_app_with_transport(pool, Arc::new(mailer)))
}

pub fn create_app_with_transport(pool: SqlitePool, transport: Arc<dyn MailTransport>) -> Router {
    let state = AppState::new(pool, transport);

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/auth/register/", post(auth::register))
        .route("/auth/login/", post(auth::login))
        .route("/auth/profile/", get(auth::profile))
        .route("/users/", get(users::list_users).post(users::create_user))
        .route(
            "/users/:id/",
            get(users::get_user)
                .put(users::replace_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .route("/projects/", get(projects::list_projects).post(projects::create_project))
        .route(
            "/projects/:id/",
            get(projects::get_project)
                .put(projects::replace_project)
                .patch(projects::update_project)
                .delete(projects::delete_project),
        )
        .route("/tasks/", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/tasks/:id/",
            get(tasks::get_task)
                .put(tasks::replace_task)
                .patch(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route("/comments/", get(comments::list_comments).post(comments::create_comment))
        .route(
            "/comments/:id/",
            get(comments::get_comment)
                .put(comments::replace_comment)
                .patch(comments::update_comment)
                .delete(comments::delete_comment),
        )
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
