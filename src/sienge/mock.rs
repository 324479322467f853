//! Mock record source for unit testing.
//!
//! Serves scripted pages per listing and records every request, so the
//! pagination and enrichment logic can be exercised without a network.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::error::UpstreamError;

use super::source::RecordSource;
use super::types::{Listing, PageRequest, RecordPage, SiengeRecord};

/// Scripted response for one page request.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Serve this page.
    Page(RecordPage),
    /// Fail with an upstream status.
    Status {
        /// Status code.
        status: u16,
        /// Body text.
        body: String,
    },
    /// Fail as if the body could not be parsed.
    Malformed(String),
}

#[derive(Debug, Default)]
struct ListingScript {
    queue: VecDeque<MockResponse>,
    /// Served forever once the queue is drained.
    repeat: Option<RecordPage>,
}

#[derive(Debug, Default)]
struct MockState {
    contracts: ListingScript,
    measurements: ListingScript,
    requests: Vec<(Listing, PageRequest)>,
}

/// Mock record source for testing.
#[derive(Debug, Clone, Default)]
pub struct MockRecordSource {
    state: Arc<Mutex<MockState>>,
}

/// Build a page from JSON objects; non-object values are skipped.
pub fn page(records: Vec<Value>) -> RecordPage {
    RecordPage::from_records(
        records
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(map) => Some(SiengeRecord::from_map(map)),
                _ => None,
            })
            .collect(),
    )
}

/// Build a page of `count` contracts with ids starting at `first_id`.
pub fn numbered_page(first_id: u64, count: u64) -> RecordPage {
    page(
        (first_id..first_id + count)
            .map(|id| serde_json::json!({ "id": id, "totalLaborValue": 1.0 }))
            .collect(),
    )
}

impl MockRecordSource {
    /// Create an empty mock; every listing is drained immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a contracts response.
    pub fn push_contracts(&self, response: MockResponse) -> &Self {
        self.state.lock().unwrap().contracts.queue.push_back(response);
        self
    }

    /// Queue a measurements response.
    pub fn push_measurements(&self, response: MockResponse) -> &Self {
        self.state.lock().unwrap().measurements.queue.push_back(response);
        self
    }

    /// Serve `page` for every contracts request after the queue drains.
    pub fn repeat_contracts(&self, page: RecordPage) -> &Self {
        self.state.lock().unwrap().contracts.repeat = Some(page);
        self
    }

    /// All requests received so far.
    pub fn requests(&self) -> Vec<(Listing, PageRequest)> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Offsets requested for a listing, in order.
    pub fn offsets(&self, listing: Listing) -> Vec<u64> {
        self.requests()
            .into_iter()
            .filter(|(l, _)| *l == listing)
            .map(|(_, r)| r.offset)
            .collect()
    }

    fn next_response(&self, listing: Listing, request: &PageRequest) -> Result<RecordPage, UpstreamError> {
        let mut state = self.state.lock().unwrap();
        state.requests.push((listing, *request));

        let script = match listing {
            Listing::Contracts => &mut state.contracts,
            Listing::Measurements => &mut state.measurements,
        };

        match script.queue.pop_front() {
            Some(MockResponse::Page(page)) => Ok(page),
            Some(MockResponse::Status { status, body }) => Err(UpstreamError::Status { status, body }),
            Some(MockResponse::Malformed(reason)) => Err(UpstreamError::Malformed(reason)),
            None => Ok(script.repeat.clone().unwrap_or_default()),
        }
    }
}

impl RecordSource for MockRecordSource {
    fn fetch_page(
        &self,
        listing: Listing,
        request: &PageRequest,
    ) -> impl Future<Output = Result<RecordPage, UpstreamError>> + Send {
        let result = self.next_response(listing, request);
        async move { result }
    }
}
