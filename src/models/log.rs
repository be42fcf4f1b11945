//! Usage log entries, one per successful operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    #[serde(rename = "_id")]
    pub id: Uuid,

    /// Human readable tool name, e.g. "Split PDF".
    pub tool_used: String,

    pub timestamp: DateTime<Utc>,

    /// Caller address as seen by the server.
    pub ip: Option<String>,

    /// Always "success": failed requests are not logged.
    pub status: String,

    pub details: Option<String>,
}
