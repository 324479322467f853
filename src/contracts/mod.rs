//! Contract aggregation module.
//!
//! This module handles:
//! - Offset pagination over the upstream listings
//! - Value derivation (`valorTotal`)
//! - Optional measurement enrichment
//! - The aggregator that ties them together per request

pub mod aggregator;
pub mod measurements;
pub mod pagination;
pub mod valuation;

pub use aggregator::ContractAggregator;
pub use measurements::{enrich_with_measurements, MeasurementSummary};
pub use pagination::{drain_pages, PageOptions};
pub use valuation::{apply_valor_total, coerce_amount};
