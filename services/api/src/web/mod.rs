pub mod access;
pub mod activities;
pub mod analytics;
pub mod auth;
pub mod comments;
pub mod dto;
pub mod events;
pub mod extract;
pub mod middleware;
pub mod notifications;
pub mod projects;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod tasks;
pub mod ws_handler;

pub use middleware::require_auth;
pub use ws_handler::ws_handler;

use crate::config::ConfigError;
use crate::error::ApiResult;
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use rest::ApiDoc;
use state::AppState;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Builds the complete application: public auth routes, session-protected API
/// routes, the realtime socket and the Swagger UI.
pub fn build_router(app_state: Arc<AppState>) -> ApiResult<Router> {
    let origin = app_state
        .config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ConfigError::InvalidValue("CORS_ORIGIN".to_string(), e.to_string()))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/api/auth/signup", post(auth::signup_handler))
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/auth/logout", post(auth::logout_handler))
        .route("/api/auth/forgot-password", post(auth::forgot_password_handler))
        .route("/api/auth/reset-password", post(auth::reset_password_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/api/auth/me", get(auth::me_handler))
        .route(
            "/api/projects",
            get(projects::list_projects_handler).post(projects::create_project_handler),
        )
        .route(
            "/api/projects/{id}",
            put(projects::update_project_handler).delete(projects::delete_project_handler),
        )
        .route("/api/projects/{id}/membership", get(projects::membership_handler))
        .route(
            "/api/projects/{id}/members",
            get(projects::list_members_handler).post(projects::add_member_handler),
        )
        .route(
            "/api/projects/{id}/members/{member_id}",
            delete(projects::remove_member_handler),
        )
        .route(
            "/api/tasks",
            get(tasks::list_tasks_handler).post(tasks::create_task_handler),
        )
        .route(
            "/api/tasks/{id}",
            get(tasks::get_task_handler)
                .patch(tasks::patch_task_handler)
                .delete(tasks::delete_task_handler),
        )
        .route(
            "/api/comments",
            get(comments::list_comments_handler).post(comments::create_comment_handler),
        )
        .route("/api/activities", get(activities::list_activities_handler))
        .route(
            "/api/notifications",
            get(notifications::list_notifications_handler).patch(notifications::mark_read_handler),
        )
        .route("/api/analytics", get(analytics::analytics_handler))
        .route("/ws", get(ws_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state);

    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())))
}
