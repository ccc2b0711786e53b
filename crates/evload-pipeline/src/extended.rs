//! MongoDB extended-JSON scalar wrappers
//!
//! The export encodes typed scalars as single-key wrapper objects:
//! `{"$numberInt": "<decimal>"}`, `{"$numberDouble": "<decimal>"}`,
//! `{"$oid": "<24-hex>"}`. These three tags are the only recognized
//! shapes; everything else wrapper-shaped classifies as `Unrecognized`.

use bigdecimal::BigDecimal;
use serde_json::Value;
use std::str::FromStr;

/// Wire tag for decimal-string-encoded 64-bit integers.
pub const TAG_INT: &str = "$numberInt";
/// Wire tag for decimal-string-encoded floating values.
pub const TAG_DOUBLE: &str = "$numberDouble";
/// Wire tag for 24-hex-character object identifiers.
pub const TAG_OID: &str = "$oid";

/// A classified extended-JSON scalar.
///
/// `$numberDouble` payloads are kept as arbitrary-precision decimals
/// rather than binary floats, so money and identifier fields never pick
/// up rounding drift.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtendedScalar {
    Int(i64),
    Double(BigDecimal),
    ObjectId(String),
    /// Wrapper-shaped value with no recognized tag, or a tag whose
    /// payload does not parse.
    Unrecognized,
}

impl ExtendedScalar {
    /// Classify a JSON value as an extended-JSON wrapper.
    ///
    /// Returns `None` for anything that is not an object. Classification
    /// happens once at this boundary; the row builder matches on the
    /// variants instead of re-inspecting tag keys ad hoc.
    pub fn classify(value: &Value) -> Option<ExtendedScalar> {
        let map = value.as_object()?;
        if let Some(tagged) = map.get(TAG_INT) {
            return Some(parse_int(tagged).map_or(ExtendedScalar::Unrecognized, ExtendedScalar::Int));
        }
        if let Some(tagged) = map.get(TAG_DOUBLE) {
            return Some(
                parse_decimal(tagged).map_or(ExtendedScalar::Unrecognized, ExtendedScalar::Double),
            );
        }
        if let Some(tagged) = map.get(TAG_OID) {
            return Some(match tagged.as_str() {
                Some(oid) => ExtendedScalar::ObjectId(oid.to_string()),
                None => ExtendedScalar::Unrecognized,
            });
        }
        Some(ExtendedScalar::Unrecognized)
    }
}

fn parse_int(tagged: &Value) -> Option<i64> {
    match tagged {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

fn parse_decimal(tagged: &Value) -> Option<BigDecimal> {
    match tagged {
        Value::String(s) => BigDecimal::from_str(s.trim()).ok(),
        Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_int_wrapper() {
        let value = json!({"$numberInt": "42"});
        assert_eq!(ExtendedScalar::classify(&value), Some(ExtendedScalar::Int(42)));
    }

    #[test]
    fn test_classify_int_wrapper_with_bare_number_payload() {
        let value = json!({"$numberInt": 42});
        assert_eq!(ExtendedScalar::classify(&value), Some(ExtendedScalar::Int(42)));
    }

    #[test]
    fn test_classify_double_wrapper_keeps_precision() {
        let value = json!({"$numberDouble": "1234567890.0000001"});
        let expected = BigDecimal::from_str("1234567890.0000001").unwrap();
        assert_eq!(ExtendedScalar::classify(&value), Some(ExtendedScalar::Double(expected)));
    }

    #[test]
    fn test_classify_object_id() {
        let value = json!({"$oid": "507f1f77bcf86cd799439011"});
        assert_eq!(
            ExtendedScalar::classify(&value),
            Some(ExtendedScalar::ObjectId("507f1f77bcf86cd799439011".to_string()))
        );
    }

    #[test]
    fn test_classify_untagged_object_is_unrecognized() {
        let value = json!({"foo": "bar"});
        assert_eq!(ExtendedScalar::classify(&value), Some(ExtendedScalar::Unrecognized));
    }

    #[test]
    fn test_classify_unparseable_payload_is_unrecognized() {
        let value = json!({"$numberInt": "forty-two"});
        assert_eq!(ExtendedScalar::classify(&value), Some(ExtendedScalar::Unrecognized));
    }

    #[test]
    fn test_classify_non_object_is_none() {
        assert_eq!(ExtendedScalar::classify(&json!("42")), None);
        assert_eq!(ExtendedScalar::classify(&json!(42)), None);
        assert_eq!(ExtendedScalar::classify(&json!(null)), None);
    }
}
