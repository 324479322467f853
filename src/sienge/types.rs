//! Wire types for the Sienge listing endpoints.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, IntoStaticStr};
use time::macros::{date, format_description};
use time::Date;

/// Date format used by the upstream query string (`YYYY-MM-DD`).
const DATE_FORMAT: &[time::format_description::FormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// Upstream listing endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Listing {
    /// Supply contracts.
    Contracts,
    /// Contract measurements.
    Measurements,
}

/// Inclusive contract date window sent with every contracts page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// First contract start date.
    pub start: Date,
    /// Last contract end date.
    pub end: Date,
}

impl DateRange {
    /// Default window used when nothing is configured.
    pub const DEFAULT: DateRange = DateRange {
        start: date!(2020 - 01 - 01),
        end: date!(2030 - 12 - 31),
    };

    /// Parse a range from two `YYYY-MM-DD` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self, String> {
        let start = parse_date(start)?;
        let end = parse_date(end)?;
        if start > end {
            return Err(format!("start date {} is after end date {}", start, end));
        }
        Ok(Self { start, end })
    }

    /// Start date formatted for the query string.
    pub fn start_param(&self) -> String {
        format_date(self.start)
    }

    /// End date formatted for the query string.
    pub fn end_param(&self) -> String {
        format_date(self.end)
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self::DEFAULT
    }
}

fn parse_date(value: &str) -> Result<Date, String> {
    Date::parse(value.trim(), DATE_FORMAT).map_err(|e| format!("invalid date {:?}: {}", value, e))
}

fn format_date(date: Date) -> String {
    // The format only has numeric components, so formatting cannot fail.
    date.format(DATE_FORMAT).unwrap_or_default()
}

/// One page request against a listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Contract date window, only sent for the contracts listing.
    pub date_range: Option<DateRange>,
    /// Page size.
    pub limit: u32,
    /// Number of records to skip.
    pub offset: u64,
}

impl PageRequest {
    /// Query string pairs in the order the upstream documents them.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(4);
        if let Some(range) = &self.date_range {
            pairs.push(("contractStartDate", range.start_param()));
            pairs.push(("contractEndDate", range.end_param()));
        }
        pairs.push(("limit", self.limit.to_string()));
        pairs.push(("offset", self.offset.to_string()));
        pairs
    }
}

/// An upstream record: an open mapping of field names to JSON values.
///
/// Contracts and measurements share this shape; only a handful of fields are
/// ever read, everything else is passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiengeRecord(Map<String, Value>);

/// A supply contract record.
pub type ContractRecord = SiengeRecord;

/// A measurement record.
pub type MeasurementRecord = SiengeRecord;

impl SiengeRecord {
    /// Wrap an existing JSON object.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Field value, if present.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Field value, treating explicit `null` as absent.
    pub fn get_non_null(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| !v.is_null())
    }

    /// Set a field, replacing any previous value.
    pub fn insert(&mut self, field: &str, value: impl Into<Value>) {
        self.0.insert(field.to_string(), value.into());
    }

    /// Underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Paging metadata some upstream endpoints attach to a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ResultSetMetadata {
    /// Total number of records matching the query.
    #[serde(default)]
    pub count: Option<u64>,
    /// Offset echoed back.
    #[serde(default)]
    pub offset: Option<u64>,
    /// Limit echoed back.
    #[serde(default)]
    pub limit: Option<u64>,
}

/// Body of one listing page.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPage {
    /// Records of this page; absent or `null` means the listing is drained.
    #[serde(default)]
    pub results: Option<Vec<SiengeRecord>>,
    /// Optional paging metadata.
    #[serde(default)]
    pub result_set_metadata: Option<ResultSetMetadata>,
}

impl RecordPage {
    /// Build a page from records without metadata.
    pub fn from_records(records: Vec<SiengeRecord>) -> Self {
        Self {
            results: Some(records),
            result_set_metadata: None,
        }
    }

    /// Total count reported by the upstream, if any.
    pub fn reported_count(&self) -> Option<u64> {
        self.result_set_metadata.and_then(|m| m.count)
    }

    /// Consume the page, yielding its records.
    pub fn into_records(self) -> Vec<SiengeRecord> {
        self.results.unwrap_or_default()
    }
}
