//! Sienge upstream API module.
//!
//! This module handles:
//! - Wire types for the listing endpoints
//! - Basic-Auth credentials
//! - The HTTP client and the page source abstraction
//! - Mock source for testing

pub mod client;
pub mod credentials;
pub mod mock;
pub mod source;
pub mod types;

pub use client::SiengeClient;
pub use credentials::Credentials;
pub use mock::{MockRecordSource, MockResponse};
pub use source::RecordSource;
pub use types::{
    ContractRecord, DateRange, Listing, MeasurementRecord, PageRequest, RecordPage,
    ResultSetMetadata, SiengeRecord,
};
