//! HTTP API handlers.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tracing::{error, info};

use crate::contracts::ContractAggregator;
use crate::error::UpstreamError;
use crate::metrics;
use crate::sienge::{ContractRecord, RecordSource};

/// Application state shared with handlers.
pub struct AppState<S> {
    /// Contract aggregator.
    pub aggregator: Arc<ContractAggregator<S>>,
    /// Prometheus render handle, when metrics are enabled.
    pub metrics: Option<PrometheusHandle>,
}

impl<S> AppState<S> {
    /// Create new app state.
    pub fn new(aggregator: ContractAggregator<S>) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
            metrics: None,
        }
    }

    /// Attach a Prometheus handle.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            aggregator: Arc::clone(&self.aggregator),
            metrics: self.metrics.clone(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Error envelope returned by the API.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable message.
    pub error: String,
    /// Upstream response body, for upstream status errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Upstream failure rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub UpstreamError);

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        let body = ErrorResponse {
            error: format!("failed to fetch contracts: {}", self.0),
            details: self.0.details().map(str::to_string),
        };
        (status, Json(body)).into_response()
    }
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Contracts handler - drains the upstream and returns every contract.
pub async fn contracts<S>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<ContractRecord>>, ApiError>
where
    S: RecordSource + 'static,
{
    match state.aggregator.fetch_configured().await {
        Ok(contracts) => {
            info!(count = contracts.len(), "Serving contracts");
            metrics::add_contracts_served(contracts.len());
            Ok(Json(contracts))
        }
        Err(e) => {
            error!(error = %e, kind = %e.kind(), "Contract aggregation failed");
            metrics::inc_request_failures(e.kind());
            Err(ApiError(e))
        }
    }
}

/// Metrics handler - Prometheus text exposition, 404 when disabled.
pub async fn metrics_text<S>(State(state): State<AppState<S>>) -> Response {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
