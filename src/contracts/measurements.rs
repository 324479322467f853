//! Measurement enrichment: measured value and remaining balance per contract.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::error::UpstreamError;
use crate::metrics;
use crate::sienge::{ContractRecord, Listing, MeasurementRecord, RecordSource};

use super::pagination::{drain_pages, PageOptions};
use super::valuation::{coerce_amount, record_total, TOTAL_FIELD};

/// Measured value field.
pub const MEASURED_FIELD: &str = "valorMedido";
/// Remaining balance field.
pub const BALANCE_FIELD: &str = "saldoContrato";
/// Measurement count field.
pub const COUNT_FIELD: &str = "numeroMedicoes";

/// Fields tried, in order, to find the contract a measurement belongs to.
const MEASUREMENT_KEYS: [&str; 6] = [
    "contractId",
    "supplyContractId",
    "contract_id",
    "id",
    "contractNumber",
    "contract_number",
];

/// Fields tried, in order, to look a contract up among the groups.
const CONTRACT_KEYS: [&str; 5] = [
    "id",
    "contractId",
    "contract_id",
    "contractNumber",
    "contract_number",
];

/// Measurement figures for one contract.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementSummary {
    /// Sum of labor and material value over the matched measurements.
    pub measured: f64,
    /// Number of matched measurements.
    pub count: usize,
}

/// Text form of a scalar key; `None` for null and structured values.
fn key_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn is_blank_key(key: &str) -> bool {
    key.is_empty() || key == "0" || key == "false"
}

/// A measurement with its position in the listing.
type Indexed<'a> = (usize, &'a MeasurementRecord);

/// Measurements grouped by contract key, in first-seen order.
struct MeasurementGroups<'a> {
    order: Vec<String>,
    groups: HashMap<String, Vec<Indexed<'a>>>,
}

impl<'a> MeasurementGroups<'a> {
    fn build(measurements: &'a [MeasurementRecord]) -> Self {
        let mut order = Vec::new();
        let mut groups: HashMap<String, Vec<Indexed<'a>>> = HashMap::new();

        for (index, measurement) in measurements.iter().enumerate() {
            let key = MEASUREMENT_KEYS
                .iter()
                .find_map(|field| measurement.get_non_null(field))
                .and_then(key_text);

            let Some(key) = key.filter(|k| !is_blank_key(k)) else {
                continue;
            };

            groups
                .entry(key.clone())
                .or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                })
                .push((index, measurement));
        }

        Self { order, groups }
    }

    fn len(&self) -> usize {
        self.groups.len()
    }

    fn matching(&self, contract: &ContractRecord) -> Vec<Indexed<'a>> {
        let by_key = CONTRACT_KEYS
            .iter()
            .filter_map(|field| contract.get_non_null(field))
            .filter_map(key_text)
            .find_map(|key| self.groups.get(&key));

        if let Some(found) = by_key {
            return found.clone();
        }

        let Some(number) = contract.get_non_null("contractNumber") else {
            return Vec::new();
        };

        for key in &self.order {
            let matched: Vec<_> = self.groups[key]
                .iter()
                .copied()
                .filter(|(_, m)| {
                    m.get("contractNumber") == Some(number)
                        || m.get("contract_number") == Some(number)
                })
                .collect();
            if !matched.is_empty() {
                return matched;
            }
        }

        Vec::new()
    }
}

/// Compute the measurement summary of every contract, in contract order.
pub fn summarize(
    contracts: &[ContractRecord],
    measurements: &[MeasurementRecord],
) -> Result<Vec<MeasurementSummary>, UpstreamError> {
    let groups = MeasurementGroups::build(measurements);
    info!(
        contracts = contracts.len(),
        measurements = measurements.len(),
        groups = groups.len(),
        "Matching measurements to contracts"
    );

    contracts
        .iter()
        .map(|contract| -> Result<MeasurementSummary, UpstreamError> {
            let matched = groups.matching(contract);
            let measured = matched
                .iter()
                .map(|(index, m)| record_total(m, *index))
                .sum::<Result<f64, _>>()?;
            Ok(MeasurementSummary {
                measured,
                count: matched.len(),
            })
        })
        .collect()
}

fn write_summary(contract: &mut ContractRecord, summary: MeasurementSummary) {
    let total = coerce_amount(contract.get(TOTAL_FIELD)).unwrap_or(0.0);
    contract.insert(MEASURED_FIELD, summary.measured);
    contract.insert(BALANCE_FIELD, total - summary.measured);
    contract.insert(COUNT_FIELD, summary.count as u64);
}

/// Add measured value, balance and measurement count to every contract.
///
/// Contracts must already carry `valorTotal`. A failure while fetching or
/// valuing measurements is logged and every contract gets the unmeasured
/// defaults instead; it never fails the contract listing.
#[instrument(skip_all, fields(contracts = contracts.len()))]
pub async fn enrich_with_measurements<S: RecordSource>(
    source: &S,
    contracts: &mut [ContractRecord],
    options: PageOptions,
) {
    let summaries = match drain_pages(source, Listing::Measurements, None, options).await {
        Ok(measurements) => summarize(contracts, &measurements),
        Err(e) => Err(e),
    };

    match summaries {
        Ok(summaries) => {
            let measured = summaries.iter().filter(|s| s.count > 0).count();
            for (contract, summary) in contracts.iter_mut().zip(summaries) {
                write_summary(contract, summary);
            }
            info!(measured, "Measurement enrichment complete");
        }
        Err(e) => {
            warn!(error = %e, "Measurement enrichment failed, using defaults");
            metrics::inc_enrichment_failures();
            let unmeasured = MeasurementSummary {
                measured: 0.0,
                count: 0,
            };
            for contract in contracts.iter_mut() {
                write_summary(contract, unmeasured);
            }
        }
    }
}
