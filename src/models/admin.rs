//! Admin credentials. Never serialized to clients.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Clone, FromRow, Debug)]
pub struct Admin {
    pub id: Uuid,
    pub email: String,
    /// bcrypt hash.
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}
