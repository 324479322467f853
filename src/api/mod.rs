//! HTTP API module for the contracts endpoint, health, metrics and static files.

pub mod handlers;
pub mod routes;

pub use handlers::{ApiError, AppState};
pub use routes::create_router;
