//! A produced output file awaiting download.

use serde::Serialize;
use sqlx::FromRow;

/// Durable expiry record for one artifact on disk.
///
/// Times are unix milliseconds so that expiry comparisons stay numeric in
/// SQLite.
#[derive(Serialize, Clone, FromRow, Debug, PartialEq, Eq)]
pub struct Artifact {
    /// File name inside the uploads directory; also the URL segment.
    pub filename: String,

    /// Operation slug that produced it.
    pub operation: String,

    pub size_bytes: i64,

    pub created_at_ms: i64,

    pub expires_at_ms: i64,
}

impl Artifact {
    /// Public path the file is served from.
    pub fn download_url(&self) -> String {
        format!("/uploads/{}", self.filename)
    }

    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expires_at_ms <= now_ms
    }
}
