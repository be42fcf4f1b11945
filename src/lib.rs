//! PDF Tools Hub: HTTP backend for merging, splitting, protecting and
//! converting documents.

pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    services::{
        artifact_store::ArtifactStore, auth::AuthService, registry::Registry,
        upload::UploadReceiver, usage_log::UsageLogger,
    },
    state::AppState,
};

/// Open the database, run migrations, seed defaults and recover artifacts
/// left by a previous process.
pub async fn bootstrap(config: AppConfig) -> Result<AppState> {
    for dir in [&config.uploads_dir, &config.temp_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating directory {}", dir.display()))?;
    }

    let pool = db::connect(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    let db = Arc::new(pool);

    let registry = Registry::load(db.clone())
        .await
        .context("seeding tools and settings")?;

    let auth = AuthService::new(db.clone(), &config.jwt_secret);
    if config.uses_dev_secret() {
        warn!("PDFHUB_JWT_SECRET is not set; using the development secret");
    }
    match (&config.admin_email, &config.admin_password) {
        (Some(email), Some(password)) => {
            auth.upsert_admin(email, password)
                .await
                .context("seeding admin account")?;
        }
        (None, None) => info!("No admin credentials configured; admin login disabled"),
        _ => warn!("Admin seeding needs both PDFHUB_ADMIN_EMAIL and PDFHUB_ADMIN_PASSWORD"),
    }

    let artifacts = ArtifactStore::new(db.clone(), &config.uploads_dir, config.artifact_ttl);
    artifacts
        .recover()
        .await
        .context("recovering artifacts")?;

    Ok(AppState {
        usage: UsageLogger::new(db.clone()),
        uploads: UploadReceiver::new(&config.temp_dir),
        config: Arc::new(config),
        db,
        registry,
        artifacts,
        auth,
    })
}

/// The complete HTTP application.
pub fn build_app(state: AppState) -> Router {
    routes::routes::routes(state.config.max_request_bytes).with_state(state)
}
