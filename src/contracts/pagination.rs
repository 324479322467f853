//! Offset pagination over an upstream listing.

use tracing::{debug, instrument};

use crate::error::UpstreamError;
use crate::metrics;
use crate::sienge::{DateRange, Listing, PageRequest, RecordSource, SiengeRecord};

/// Page size and loop bound for draining a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOptions {
    /// Records requested per page.
    pub limit: u32,
    /// Pages fetched before the listing is considered runaway.
    pub max_pages: u32,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            limit: crate::config::MAX_PAGE_LIMIT,
            max_pages: 1000,
        }
    }
}

/// Fetch pages with increasing offsets until one comes back empty.
///
/// Records are concatenated in upstream order. The first error discards
/// everything accumulated so far. Fails with `PageLimitExceeded` when
/// `max_pages` non-empty pages were served, and with `Malformed` when the
/// upstream serves more records than its own reported total.
#[instrument(skip(source, options), fields(limit = options.limit))]
pub async fn drain_pages<S: RecordSource>(
    source: &S,
    listing: Listing,
    date_range: Option<DateRange>,
    options: PageOptions,
) -> Result<Vec<SiengeRecord>, UpstreamError> {
    let mut records = Vec::new();
    let mut offset = 0u64;

    for page_number in 1..=options.max_pages {
        let request = PageRequest {
            date_range,
            limit: options.limit,
            offset,
        };

        let page = source.fetch_page(listing, &request).await?;
        metrics::inc_upstream_pages(listing);

        let reported = page.reported_count();
        let batch = page.into_records();
        debug!(page = page_number, offset, records = batch.len(), "Page received");

        if batch.is_empty() {
            return Ok(records);
        }

        records.extend(batch);

        if let Some(total) = reported {
            if records.len() as u64 > total {
                return Err(UpstreamError::Malformed(format!(
                    "{} listing served {} records but reported a total of {}",
                    listing,
                    records.len(),
                    total
                )));
            }
        }

        offset += u64::from(options.limit);
    }

    Err(UpstreamError::PageLimitExceeded {
        max_pages: options.max_pages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sienge::mock::{numbered_page, page};
    use crate::sienge::{MockRecordSource, MockResponse, RecordPage, ResultSetMetadata};
    use serde_json::json;

    fn options(max_pages: u32) -> PageOptions {
        PageOptions {
            limit: 200,
            max_pages,
        }
    }

    #[tokio::test]
    async fn three_pages_yield_400_records_in_three_calls() {
        let source = MockRecordSource::new();
        source
            .push_contracts(MockResponse::Page(numbered_page(0, 200)))
            .push_contracts(MockResponse::Page(numbered_page(200, 200)))
            .push_contracts(MockResponse::Page(RecordPage::from_records(Vec::new())));

        let records = drain_pages(&source, Listing::Contracts, Some(DateRange::DEFAULT), options(10))
            .await
            .unwrap();

        assert_eq!(records.len(), 400);
        assert_eq!(source.offsets(Listing::Contracts), vec![0, 200, 400]);
        assert_eq!(records[0].get("id"), Some(&json!(0)));
        assert_eq!(records[399].get("id"), Some(&json!(399)));
    }

    #[tokio::test]
    async fn every_request_carries_range_and_limit() {
        let source = MockRecordSource::new();
        source.push_contracts(MockResponse::Page(numbered_page(0, 3)));

        drain_pages(&source, Listing::Contracts, Some(DateRange::DEFAULT), options(10))
            .await
            .unwrap();

        for (listing, request) in source.requests() {
            assert_eq!(listing, Listing::Contracts);
            assert_eq!(request.limit, 200);
            assert_eq!(request.date_range, Some(DateRange::DEFAULT));
        }
    }

    #[tokio::test]
    async fn short_pages_do_not_stop_the_loop() {
        let source = MockRecordSource::new();
        source
            .push_contracts(MockResponse::Page(numbered_page(0, 5)))
            .push_contracts(MockResponse::Page(numbered_page(5, 2)));

        let records = drain_pages(&source, Listing::Contracts, None, options(10))
            .await
            .unwrap();

        assert_eq!(records.len(), 7);
        assert_eq!(source.offsets(Listing::Contracts), vec![0, 200, 400]);
    }

    #[tokio::test]
    async fn endless_upstream_hits_page_limit() {
        let source = MockRecordSource::new();
        source.repeat_contracts(numbered_page(0, 1));

        let err = drain_pages(&source, Listing::Contracts, None, options(4))
            .await
            .unwrap_err();

        assert!(matches!(err, UpstreamError::PageLimitExceeded { max_pages: 4 }));
        assert_eq!(source.requests().len(), 4);
    }

    #[tokio::test]
    async fn error_mid_listing_discards_accumulated_pages() {
        let source = MockRecordSource::new();
        source
            .push_contracts(MockResponse::Page(numbered_page(0, 200)))
            .push_contracts(MockResponse::Status {
                status: 503,
                body: "maintenance".to_string(),
            });

        let err = drain_pages(&source, Listing::Contracts, None, options(10))
            .await
            .unwrap_err();

        assert!(matches!(err, UpstreamError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn more_records_than_reported_is_malformed() {
        let mut first = page(vec![json!({ "id": 1 }), json!({ "id": 2 })]);
        first.result_set_metadata = Some(ResultSetMetadata {
            count: Some(1),
            offset: Some(0),
            limit: Some(200),
        });

        let source = MockRecordSource::new();
        source.push_contracts(MockResponse::Page(first));

        let err = drain_pages(&source, Listing::Contracts, None, options(10))
            .await
            .unwrap_err();

        assert!(matches!(err, UpstreamError::Malformed(_)));
    }
}
