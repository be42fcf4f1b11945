//! Append-only usage log, written after each successful operation.

use crate::models::log::Log;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::warn;
use uuid::Uuid;

/// How many entries the admin view returns.
pub const RECENT_LOG_LIMIT: i64 = 100;

const SUCCESS: &str = "success";

#[derive(Clone)]
pub struct UsageLogger {
    db: Arc<SqlitePool>,
}

impl UsageLogger {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Fire and forget: the insert runs on its own task and a failure is only
    /// logged. The returned handle exists for tests that need to wait.
    pub fn record(&self, tool_used: &str, ip: Option<String>) -> JoinHandle<()> {
        let db = self.db.clone();
        let tool_used = tool_used.to_string();
        tokio::spawn(async move {
            if let Err(err) = insert(&db, &tool_used, ip.as_deref(), Utc::now()).await {
                warn!("failed to record usage of {}: {}", tool_used, err);
            }
        })
    }

    /// Most recent entries first, capped at [`RECENT_LOG_LIMIT`].
    pub async fn recent(&self) -> Result<Vec<Log>, sqlx::Error> {
        sqlx::query_as::<_, Log>(
            r#"
            SELECT id, tool_used, timestamp, ip, status, details
            FROM logs
            ORDER BY timestamp DESC
            LIMIT ?
            "#,
        )
        .bind(RECENT_LOG_LIMIT)
        .fetch_all(&*self.db)
        .await
    }
}

async fn insert(
    db: &SqlitePool,
    tool_used: &str,
    ip: Option<&str>,
    timestamp: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO logs (id, tool_used, timestamp, ip, status, details)
        VALUES (?, ?, ?, ?, ?, NULL)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(tool_used)
    .bind(timestamp)
    .bind(ip)
    .bind(SUCCESS)
    .execute(db)
    .await?;
    Ok(())
}
