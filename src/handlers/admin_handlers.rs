//! Admin endpoints. Every handler takes [`AdminClaims`], so a request
//! without a valid bearer token never reaches the registry.

use crate::{
    errors::AppError,
    models::{
        log::Log,
        settings::{Settings, SettingsUpdate},
        tool::{Tool, ToolUpdate},
    },
    services::auth::AdminClaims,
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
};

/// `GET /api/admin/tools`: every tool, enabled or not.
pub async fn list_all_tools(
    _admin: AdminClaims,
    State(state): State<AppState>,
) -> Result<Json<Vec<Tool>>, AppError> {
    Ok(Json(state.registry.list_all_tools().await?))
}

/// `PUT /api/admin/tools/{id}`
pub async fn update_tool(
    admin: AdminClaims,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<ToolUpdate>,
) -> Result<Json<Tool>, AppError> {
    let tool = state.registry.update_tool(&id, update).await?;
    tracing::info!(
        "{} updated tool {} (enabled: {})",
        admin.email,
        tool.slug,
        tool.enabled
    );
    Ok(Json(tool))
}

/// `GET /api/admin/settings`
pub async fn get_settings(
    _admin: AdminClaims,
    State(state): State<AppState>,
) -> Json<Settings> {
    Json(state.registry.settings().await.as_ref().clone())
}

/// `PUT /api/admin/settings`
pub async fn update_settings(
    admin: AdminClaims,
    State(state): State<AppState>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<Settings>, AppError> {
    let settings = state.registry.update_settings(update).await?;
    tracing::info!("{} updated settings", admin.email);
    Ok(Json(settings.as_ref().clone()))
}

/// `GET /api/admin/logs`: the 100 most recent entries.
pub async fn recent_logs(
    _admin: AdminClaims,
    State(state): State<AppState>,
) -> Result<Json<Vec<Log>>, AppError> {
    Ok(Json(state.usage.recent().await?))
}
