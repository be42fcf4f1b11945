//! Shared application state handed to every handler.

use axum::extract::FromRef;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::{
    config::AppConfig,
    handlers::pdf_handlers::ProxyTrust,
    services::{
        artifact_store::ArtifactStore, auth::AuthService, registry::Registry,
        upload::UploadReceiver, usage_log::UsageLogger,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<SqlitePool>,
    pub registry: Registry,
    pub artifacts: ArtifactStore,
    pub usage: UsageLogger,
    pub auth: AuthService,
    pub uploads: UploadReceiver,
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

impl FromRef<AppState> for ProxyTrust {
    fn from_ref(state: &AppState) -> Self {
        ProxyTrust(state.config.trust_proxy)
    }
}
