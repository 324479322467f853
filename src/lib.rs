//! Sienge supply contracts relay.
//!
//! Drains the paginated Sienge supply-contracts listing with Basic-Auth,
//! adds a derived `valorTotal` to every contract and republishes the whole
//! collection as one JSON array on `GET /api/contracts`, next to a static
//! front-end bundle.
//!
//! # Aggregation
//!
//! ```text
//! GET ...?limit=200&offset=0    -> 200 records
//! GET ...?limit=200&offset=200  -> 200 records
//! GET ...?limit=200&offset=400  -> 0 records (stop)
//! ─────────────────────────────────────────────
//! 400 contracts, valorTotal = totalLaborValue + totalMaterialValue
//! ```
//!
//! Any failure along the way fails the whole request; partial collections
//! are never returned.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`sienge`]: Upstream client, wire types and mock source
//! - [`contracts`]: Pagination, valuation and measurement enrichment
//! - [`api`]: HTTP routes, static files and error envelope
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod config;
pub mod contracts;
pub mod error;
pub mod metrics;
pub mod sienge;
pub mod utils;

pub use config::Config;
pub use error::{RelayError, Result, UpstreamError};
