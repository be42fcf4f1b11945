//! Defines every HTTP route of the service.
//!
//! ## Structure
//! - **Public**
//!   - `GET  /api/health`: health report
//!   - `GET  /api/tools`: enabled tools
//!   - `GET  /api/tools/settings`: public settings
//!   - `POST /api/auth/login`: admin login
//!   - `POST /api/pdf/{operation}`: run one conversion on a multipart upload
//!   - `GET  /uploads/{filename}`: download a produced artifact
//!
//! - **Admin** (bearer token)
//!   - `GET  /api/admin/tools`, `PUT /api/admin/tools/{id}`
//!   - `GET  /api/admin/settings`, `PUT /api/admin/settings`
//!   - `GET  /api/admin/logs`

use crate::{
    handlers::{
        admin_handlers::{get_settings, list_all_tools, recent_logs, update_settings, update_tool},
        artifact_handlers::download_artifact,
        auth_handlers::login,
        health_handlers::health,
        pdf_handlers::run_operation,
        tool_handlers::{list_tools, public_settings},
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the router. `max_request_bytes` caps a whole upload request; the
/// per-file cap comes from the live settings.
pub fn routes(max_request_bytes: usize) -> Router<AppState> {
    let pdf = Router::new()
        .route("/{operation}", post(run_operation))
        .layer(DefaultBodyLimit::max(max_request_bytes));

    let admin = Router::new()
        .route("/tools", get(list_all_tools))
        .route("/tools/{id}", put(update_tool))
        .route("/settings", get(get_settings).put(update_settings))
        .route("/logs", get(recent_logs));

    Router::new()
        .route("/api/health", get(health))
        .route("/api/tools", get(list_tools))
        .route("/api/tools/settings", get(public_settings))
        .route("/api/auth/login", post(login))
        .nest("/api/pdf", pdf)
        .nest("/api/admin", admin)
        .route("/uploads/{filename}", get(download_artifact))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
