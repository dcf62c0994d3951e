use std::sync::Arc;

use axum::{routing::get, Json, Router};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::openapi::server::Server;
use utoipa::openapi::{Components, OpenApi as OpenApiDoc};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::authz::Role;
use crate::models::{comment, project, task, user};
use crate::routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::auth::register,
        routes::auth::login,
        routes::auth::profile,
        routes::users::list_users,
        routes::users::create_user,
        routes::users::get_user,
        routes::users::replace_user,
        routes::users::update_user,
        routes::users::delete_user,
        routes::projects::list_projects,
        routes::projects::create_project,
        routes::projects::get_project,
        routes::projects::replace_project,
        routes::projects::update_project,
        routes::projects::delete_project,
        routes::tasks::list_tasks,
        routes::tasks::create_task,
        routes::tasks::get_task,
        routes::tasks::replace_task,
        routes::tasks::update_task,
        routes::tasks::delete_task,
        routes::comments::list_comments,
        routes::comments::create_comment,
        routes::comments::get_comment,
        routes::comments::replace_comment,
        routes::comments::update_comment,
        routes::comments::delete_comment
    ),
    components(
        schemas(
            Role,
            user::User,
            user::Profile,
            user::UserCreateRequest,
            user::UserUpdateRequest,
            user::RegisterRequest,
            user::LoginRequest,
            user::TokenResponse,
            user::MessageResponse,
            project::Project,
            project::ProjectCreateRequest,
            project::ProjectUpdateRequest,
            task::TaskStatus,
            task::Task,
            task::TaskCreateRequest,
            task::TaskUpdateRequest,
            comment::Comment,
            comment::CommentCreateRequest,
            comment::CommentUpdateRequest
        )
    ),
    modifiers(&TokenAuthAddon),
    tags(
        (name = "Auth", description = "Registration, login and profile"),
        (name = "Users", description = "Account management (Admin and Project Manager)"),
        (name = "Projects", description = "Project management"),
        (name = "Tasks", description = "Task management and assignment"),
        (name = "Comments", description = "Task discussion")
    )
)]
pub struct ApiDoc;

/// Registers the `Authorization: Token <key>` scheme referenced by the write endpoints.
struct TokenAuthAddon;

impl Modify for TokenAuthAddon {
    fn modify(&self, openapi: &mut OpenApiDoc) {
        let components = openapi.components.get_or_insert_with(Components::new);
        components.add_security_scheme(
            "tokenAuth",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                "Authorization",
                "Token authentication: `Token <key>`",
            ))),
        );
    }
}

pub fn build_openapi(port: u16) -> OpenApiDoc {
    let mut doc = ApiDoc::openapi();
    doc.servers = Some(vec![Server::new(format!("http://localhost:{port}"))]);
    doc
}

pub fn swagger_routes(doc: OpenApiDoc) -> Router {
    let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
        .try_it_out_enabled(true)
        .with_credentials(true)
        .persist_authorization(true);

    let doc = Arc::new(doc);

    Router::new()
        .route(
            "/api-docs/openapi.json",
            get(move || {
                let doc = Arc::clone(&doc);
                async move { Json((*doc).clone()) }
            }),
        )
        .merge(SwaggerUi::new("/docs").config(swagger_config))
}
