//! Core data models for the PDF tools service.
//!
//! These entities map to SQLite tables via `sqlx::FromRow` and serialize
//! as JSON via `serde`, keeping the field names the web client expects.

pub mod admin;
pub mod artifact;
pub mod log;
pub mod settings;
pub mod tool;
