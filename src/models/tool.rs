//! A user-facing capability advertised by the tool listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One entry of the tool registry.
///
/// Tools are mutated only through the admin endpoints; the public listing
/// shows the enabled ones ordered by `order`.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    #[serde(rename = "_id")]
    pub id: Uuid,

    /// Display name, e.g. "Merge PDF".
    pub name: String,

    /// Unique slug used by the frontend router and by boot seeding.
    pub slug: String,

    /// Icon identifier understood by the frontend.
    pub icon: String,

    pub description: String,

    pub enabled: bool,

    pub category: String,

    /// Position in the listing.
    #[sqlx(rename = "sort_order")]
    pub order: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update accepted by `PUT /api/admin/tools/{id}`.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ToolUpdate {
    pub name: Option<String>,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub enabled: Option<bool>,
    pub category: Option<String>,
    pub order: Option<i64>,
}
