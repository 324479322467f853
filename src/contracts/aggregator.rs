//! Contract aggregation: drain every page, then derive per-record totals.

use tracing::{info, instrument};

use crate::config::Config;
use crate::error::UpstreamError;
use crate::metrics;
use crate::sienge::{ContractRecord, DateRange, Listing, RecordSource};

use super::measurements::enrich_with_measurements;
use super::pagination::{drain_pages, PageOptions};
use super::valuation::apply_valor_total;

/// Builds the full contract collection for one inbound request.
///
/// Holds no per-request state: every call starts from offset zero with a
/// fresh accumulator.
#[derive(Debug)]
pub struct ContractAggregator<S> {
    source: S,
    date_range: DateRange,
    options: PageOptions,
    measurements: bool,
}

impl<S: RecordSource> ContractAggregator<S> {
    /// Create an aggregator over `source`.
    pub fn new(source: S, date_range: DateRange, options: PageOptions) -> Self {
        Self {
            source,
            date_range,
            options,
            measurements: false,
        }
    }

    /// Create an aggregator configured from `config`.
    pub fn from_config(source: S, config: &Config) -> Result<Self, String> {
        let options = PageOptions {
            limit: config.page_limit,
            max_pages: config.max_pages,
        };
        Ok(Self::new(source, config.date_range()?, options)
            .with_measurements(config.measurements_enabled()))
    }

    /// Enable or disable measurement enrichment.
    pub fn with_measurements(mut self, enabled: bool) -> Self {
        self.measurements = enabled;
        self
    }

    /// Configured date window.
    pub fn date_range(&self) -> DateRange {
        self.date_range
    }

    /// Paging options.
    pub fn options(&self) -> PageOptions {
        self.options
    }

    /// Underlying record source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch every contract in `range` and add `valorTotal` to each.
    ///
    /// All-or-nothing: any upstream or valuation failure is returned and the
    /// records gathered so far are dropped.
    #[instrument(skip(self), fields(start = %range.start, end = %range.end))]
    pub async fn fetch_all_contracts(
        &self,
        range: DateRange,
    ) -> Result<Vec<ContractRecord>, UpstreamError> {
        let timer = metrics::timer_aggregation();

        let mut contracts =
            drain_pages(&self.source, Listing::Contracts, Some(range), self.options).await?;
        apply_valor_total(&mut contracts)?;

        if self.measurements {
            enrich_with_measurements(&self.source, &mut contracts, self.options).await;
        }

        info!(
            count = contracts.len(),
            elapsed_ms = timer.elapsed_ms(),
            "Contracts aggregated"
        );

        Ok(contracts)
    }

    /// Fetch every contract in the configured window.
    pub async fn fetch_configured(&self) -> Result<Vec<ContractRecord>, UpstreamError> {
        self.fetch_all_contracts(self.date_range).await
    }
}
