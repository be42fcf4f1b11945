pub mod admin_handlers;
pub mod artifact_handlers;
pub mod auth_handlers;
pub mod health_handlers;
pub mod pdf_handlers;
pub mod tool_handlers;
