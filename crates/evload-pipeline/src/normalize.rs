//! Pure scalar normalization
//!
//! Converts extended-JSON encoded scalars and loosely-typed values into
//! the types the destination schema expects. Lenient operations default
//! unrecognized shapes to null; strict ones (the order-identifier path)
//! surface a normalization error instead of silently defaulting.

use crate::extended::ExtendedScalar;
use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use evload_common::{EvloadError, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// Wire format for local_time values.
pub const LOCAL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Integer-or-decimal numeric for fields where `$numberDouble` must not
/// round-trip through a binary float (order identifiers).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Numeric {
    Int(i64),
    Decimal(BigDecimal),
}

/// Lenient extended-int decode: null/absent and unrecognized shapes
/// both read as `None`.
pub fn decode_extended_int(value: Option<&Value>) -> Option<i64> {
    match ExtendedScalar::classify(value?) {
        Some(ExtendedScalar::Int(n)) => Some(n),
        _ => None,
    }
}

/// Strict extended-int decode: an unrecognized shape is a normalization
/// error rather than a silent null.
pub fn decode_extended_int_strict(value: Option<&Value>, field: &str) -> Result<Option<i64>> {
    let Some(value) = value else {
        return Ok(None);
    };
    match ExtendedScalar::classify(value) {
        Some(ExtendedScalar::Int(n)) => Ok(Some(n)),
        _ => Err(EvloadError::normalize(
            field,
            format!("expected a {} wrapper, got {}", crate::extended::TAG_INT, value),
        )),
    }
}

/// Strict integer-or-decimal decode for the order-identifier field.
///
/// Prefers `$numberInt`; falls back to `$numberDouble` parsed as an
/// arbitrary-precision decimal. Any other non-null shape is an error:
/// an unrecognized order-id encoding must fail loudly, never default.
pub fn decode_extended_numeric(value: Option<&Value>, field: &str) -> Result<Option<Numeric>> {
    let Some(value) = value else {
        return Ok(None);
    };
    match ExtendedScalar::classify(value) {
        Some(ExtendedScalar::Int(n)) => Ok(Some(Numeric::Int(n))),
        Some(ExtendedScalar::Double(d)) => Ok(Some(Numeric::Decimal(d))),
        _ => Err(EvloadError::normalize(
            field,
            format!("unrecognized numeric encoding: {}", value),
        )),
    }
}

/// Parse and re-emit a local time as `YYYY-MM-DD HH:MM:SS`.
///
/// A parse failure is surfaced as a warning and substitutes null; it is
/// non-fatal to the record.
pub fn normalize_local_time(value: Option<&Value>) -> Option<String> {
    let s = value?.as_str()?;
    if s.is_empty() {
        return None;
    }
    match NaiveDateTime::parse_from_str(s, LOCAL_TIME_FORMAT) {
        Ok(parsed) => Some(parsed.format(LOCAL_TIME_FORMAT).to_string()),
        Err(err) => {
            warn!(value = %s, error = %err, "unparseable local_time, substituting null");
            None
        },
    }
}

/// Small-int normalization: accepts a decimal string, a bare integer, or
/// an extended-int wrapper.
///
/// Empty and non-numeric strings normalize to null rather than erroring:
/// an empty string is indistinguishable from "field not provided"
/// upstream, and that lenient policy is deliberately preserved.
pub fn normalize_small_int(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::String(s) => {
            if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
                s.parse().ok()
            } else {
                None
            }
        },
        Value::Number(n) => n.as_i64(),
        wrapped @ Value::Object(_) => decode_extended_int(Some(wrapped)),
        _ => None,
    }
}
