pub mod artifact_store;
pub mod auth;
pub mod convert;
pub mod registry;
pub mod upload;
pub mod usage_log;
