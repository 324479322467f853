//! HTTP API route definitions.

use std::path::Path;

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use super::handlers::{contracts, health, metrics_text, AppState};
use crate::sienge::RecordSource;

/// Create the API router.
///
/// Paths without a route are served from `static_dir`; unknown paths fall
/// back to its `index.html` so client-side routes resolve.
pub fn create_router<S>(state: AppState<S>, static_dir: impl AsRef<Path>) -> Router
where
    S: RecordSource + 'static,
{
    let static_dir = static_dir.as_ref();
    let assets = ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        // Health endpoints
        .route("/health", get(health))
        .route("/metrics", get(metrics_text::<S>))
        // Contracts endpoint
        .route("/api/contracts", get(contracts::<S>))
        .fallback_service(assets)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
