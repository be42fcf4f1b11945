//! Public registry endpoints.

use crate::{
    errors::AppError,
    models::{settings::Settings, tool::Tool},
    state::AppState,
};
use axum::{Json, extract::State};

/// `GET /api/tools`: enabled tools ordered for display.
pub async fn list_tools(State(state): State<AppState>) -> Result<Json<Vec<Tool>>, AppError> {
    Ok(Json(state.registry.list_enabled_tools().await?))
}

/// `GET /api/tools/settings`
pub async fn public_settings(State(state): State<AppState>) -> Json<Settings> {
    Json(state.registry.settings().await.as_ref().clone())
}
