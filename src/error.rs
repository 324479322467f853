//! Unified error types for the contracts relay.

use reqwest::StatusCode;
use strum::{Display, IntoStaticStr};
use thiserror::Error;

use crate::sienge::Listing;

/// Unified error type for the contracts relay.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration loaded but failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// HTTP client construction error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Credentials produced an unusable header value.
    #[error("invalid authorization header: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

/// Errors raised while draining the upstream listing endpoints.
///
/// Any of these aborts the whole aggregation; no partial results are kept.
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// The upstream answered with a non-success status.
    #[error("upstream returned HTTP {status}")]
    Status {
        /// Status code returned by the upstream.
        status: u16,
        /// Response body text, possibly empty.
        body: String,
    },

    /// Connection, DNS, TLS or timeout failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Body was not the expected JSON shape.
    #[error("malformed upstream response: {0}")]
    Malformed(String),

    /// A value field could not be coerced to a number.
    #[error("record {index}: field {field} is not numeric: {value}")]
    NonNumeric {
        /// Position of the record in the aggregated sequence.
        index: usize,
        /// Offending field name.
        field: &'static str,
        /// Raw JSON text of the value.
        value: String,
    },

    /// The upstream never returned an empty page.
    #[error("pagination did not terminate after {max_pages} pages")]
    PageLimitExceeded {
        /// Configured page cap.
        max_pages: u32,
    },

    /// A listing was requested that has no configured URL.
    #[error("no endpoint configured for {0} listing")]
    EndpointNotConfigured(Listing),
}

/// Failure class of an [`UpstreamError`], used for metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Upstream status error.
    UpstreamStatus,
    /// Transport failure.
    Transport,
    /// Malformed body or non-numeric value.
    Malformed,
    /// Page cap reached.
    PageLimit,
    /// Missing endpoint.
    NotConfigured,
}

impl UpstreamError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            UpstreamError::Status { .. } => ErrorKind::UpstreamStatus,
            UpstreamError::Transport(_) => ErrorKind::Transport,
            UpstreamError::Malformed(_) | UpstreamError::NonNumeric { .. } => ErrorKind::Malformed,
            UpstreamError::PageLimitExceeded { .. } => ErrorKind::PageLimit,
            UpstreamError::EndpointNotConfigured(_) => ErrorKind::NotConfigured,
        }
    }

    /// HTTP status to report to the caller.
    ///
    /// Upstream status codes pass through; everything else is a 500.
    pub fn status_code(&self) -> StatusCode {
        match self {
            UpstreamError::Status { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Upstream body text, when the upstream produced one.
    pub fn details(&self) -> Option<&str> {
        match self {
            UpstreamError::Status { body, .. } => Some(body.as_str()),
            _ => None,
        }
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, RelayError>;
