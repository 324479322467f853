//! Page source abstraction over the upstream listing endpoints.

use std::future::Future;

use crate::error::UpstreamError;

use super::types::{Listing, PageRequest, RecordPage};

/// Anything that can serve one page of an upstream listing.
///
/// Implemented by [`super::SiengeClient`] for the real API and by
/// [`super::MockRecordSource`] for tests.
pub trait RecordSource: Send + Sync {
    /// Fetch a single page.
    fn fetch_page(
        &self,
        listing: Listing,
        request: &PageRequest,
    ) -> impl Future<Output = Result<RecordPage, UpstreamError>> + Send;
}
