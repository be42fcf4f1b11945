//! The singleton site configuration record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const DEFAULT_SITE_NAME: &str = "PDF Tools Hub";
pub const DEFAULT_MAX_FILE_SIZE: i64 = 10 * 1024 * 1024;
pub const DEFAULT_CONTACT_EMAIL: &str = "admin@pdftoolshub.com";

/// Global settings. Exactly one row exists; `version` increases on every
/// admin write so readers can tell snapshots apart.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub site_name: String,

    /// Per-file upload cap in bytes.
    pub max_file_size: i64,

    /// When set, conversion routes answer 503.
    pub maintenance_mode: bool,

    pub contact_email: String,

    pub version: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Settings {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size.max(0) as u64
    }
}

/// Fields accepted by `PUT /api/admin/settings`. Absent fields keep their
/// stored value.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub site_name: Option<String>,
    pub max_file_size: Option<i64>,
    pub maintenance_mode: Option<bool>,
    pub contact_email: Option<String>,
}
