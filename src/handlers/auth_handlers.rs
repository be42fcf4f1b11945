use crate::{errors::AppError, services::auth::LoginResponse, state::AppState};
use axum::{Json, extract::State};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let resp = state.auth.login(req.email.trim(), &req.password).await?;
    Ok(Json(resp))
}
