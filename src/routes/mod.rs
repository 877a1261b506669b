pub mod auth;
pub mod docs;
pub mod export;
pub mod extract;
pub mod health;
pub mod jobs;
pub mod settings;
pub mod tickets;
pub mod users;

use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::middleware::{
    auth::{require_admin, require_session, require_staff},
    cors::permissive_cors,
    rate_limit::{new_rps_state, rps_middleware},
};
use crate::AppState;

/// Assembles the full HTTP surface: the public group (health, login,
/// registration, API docs) and the session-protected group, each behind its
/// own rate limiter.
pub fn build_router(state: AppState, config: &Config) -> Router {
    let public_api = Router::new()
        .route("/health", get(health::health))
        .route("/api/health", get(health::health))
        .route("/api/openapi.json", get(docs::openapi_json))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .layer(from_fn_with_state(
            new_rps_state(config.public_rps),
            rps_middleware,
        ));

    let protected_api = Router::new()
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route(
            "/api/tickets",
            get(tickets::list_tickets).post(tickets::create_ticket),
        )
        .route("/api/tickets/stats", get(tickets::ticket_stats))
        .route("/api/tickets/export", get(export::export_tickets))
        .route(
            "/api/tickets/:id",
            get(tickets::get_ticket)
                .put(tickets::update_ticket)
                .delete(tickets::delete_ticket),
        )
        .route("/api/tickets/:id/status", post(tickets::change_status))
        .route("/api/tickets/:id/assign", post(tickets::assign_ticket))
        .route("/api/tickets/:id/comments", post(tickets::add_comment))
        .route("/api/tickets/:id/rating", post(tickets::rate_ticket))
        .route(
            "/api/users",
            get(users::list_users).route_layer(from_fn(require_staff)),
        )
        .route(
            "/api/users/:id",
            get(users::get_user).put(users::update_user),
        )
        .route(
            "/api/users/:id/role",
            put(users::update_user_role).route_layer(from_fn(require_admin)),
        )
        .route("/api/jobs", get(jobs::list_jobs).post(jobs::create_job))
        .route("/api/jobs/:id", get(jobs::get_job).put(jobs::update_job))
        .route(
            "/api/applications",
            get(jobs::list_applications).post(jobs::create_application),
        )
        .route(
            "/api/applications/:id/status",
            put(jobs::update_application_status),
        )
        .route("/api/settings", get(settings::list_settings))
        .route(
            "/api/settings/:key",
            put(settings::put_setting).route_layer(from_fn(require_admin)),
        )
        .layer(from_fn_with_state(state.clone(), require_session))
        .layer(from_fn_with_state(
            new_rps_state(config.api_rps),
            rps_middleware,
        ));

    Router::new()
        .merge(public_api)
        .merge(protected_api)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(permissive_cors())
        .with_state(state)
}
