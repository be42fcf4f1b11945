//! Health report.
//!
//! - GET /api/health -> database connectivity and uploads-dir I/O, always 200

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::fs;
use uuid::Uuid;

/// `GET /api/health`
///
/// Runs `SELECT 1` against SQLite and a write/read/delete probe in the
/// uploads directory. The body reports each check; the status code stays
/// 200 so the report itself is always readable.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let database = match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&*state.db)
        .await
    {
        Ok(1) => (true, None::<String>),
        Ok(v) => (false, Some(format!("unexpected result: {}", v))),
        Err(e) => (false, Some(format!("error: {}", e))),
    };

    let probe = state
        .artifacts
        .dir()
        .join(format!(".health-{}", Uuid::new_v4()));
    let uploads = match fs::write(&probe, b"health").await {
        Ok(_) => {
            let read_back = fs::read(&probe).await;
            let _ = fs::remove_file(&probe).await;
            match read_back {
                Ok(bytes) if bytes == b"health" => (true, None::<String>),
                Ok(_) => (false, Some("file content mismatch".to_string())),
                Err(e) => (false, Some(format!("could not read probe file: {}", e))),
            }
        }
        Err(e) => (false, Some(format!("could not write probe file: {}", e))),
    };

    let body = HealthResponse {
        status: if database.0 && uploads.0 { "ok" } else { "degraded" },
        timestamp: Utc::now(),
        database: if database.0 {
            "connected"
        } else {
            "disconnected"
        },
        error: database.1,
        uploads: CheckStatus {
            ok: uploads.0,
            error: uploads.1,
        },
        env: EnvReport {
            database_configured: !state.config.database_url.is_empty(),
            port: state.config.port,
        },
    };

    (StatusCode::OK, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: DateTime<Utc>,
    database: &'static str,
    error: Option<String>,
    uploads: CheckStatus,
    env: EnvReport,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvReport {
    database_configured: bool,
    port: u16,
}
