//! Value derivation for contract and measurement records.

use serde_json::Value;

use crate::error::UpstreamError;
use crate::sienge::SiengeRecord;

/// Labor component field.
pub const LABOR_FIELD: &str = "totalLaborValue";
/// Material component field.
pub const MATERIAL_FIELD: &str = "totalMaterialValue";
/// Derived total field added to every contract.
pub const TOTAL_FIELD: &str = "valorTotal";

/// Coerce an optional JSON value to `f64`.
///
/// Absent, `null` and blank (or whitespace-only) strings are `0.0`; numbers
/// and numeric strings are taken as-is. Booleans, arrays and objects are
/// `None` regardless of truthiness, as is any non-finite result.
pub fn coerce_amount(value: Option<&Value>) -> Option<f64> {
    let amount = match value {
        None | Some(Value::Null) => 0.0,
        Some(Value::Number(n)) => n.as_f64()?,
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse::<f64>().ok()?
            }
        }
        Some(_) => return None,
    };

    amount.is_finite().then_some(amount)
}

fn field_amount(record: &SiengeRecord, index: usize, field: &'static str) -> Result<f64, UpstreamError> {
    let value = record.get(field);
    coerce_amount(value).ok_or_else(|| UpstreamError::NonNumeric {
        index,
        field,
        value: value.map(Value::to_string).unwrap_or_default(),
    })
}

/// Labor plus material value of one record.
pub fn record_total(record: &SiengeRecord, index: usize) -> Result<f64, UpstreamError> {
    Ok(field_amount(record, index, LABOR_FIELD)? + field_amount(record, index, MATERIAL_FIELD)?)
}

/// Set `valorTotal` on every record.
///
/// The first record that cannot be valued fails the whole batch; records are
/// only written once every total has been computed.
pub fn apply_valor_total(records: &mut [SiengeRecord]) -> Result<(), UpstreamError> {
    let totals = records
        .iter()
        .enumerate()
        .map(|(index, record)| record_total(record, index))
        .collect::<Result<Vec<_>, _>>()?;

    for (record, total) in records.iter_mut().zip(totals) {
        record.insert(TOTAL_FIELD, total);
    }

    Ok(())
}
