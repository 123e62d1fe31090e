use std::collections::BTreeMap;

use serde_json::json;

use super::*;

#[test]
fn test_json_numbers_keep_integer_and_float_variants() {
    assert_eq!(PropertyValue::from(json!(5000)), PropertyValue::Integer(5000));
    assert_eq!(PropertyValue::from(json!(21.5)), PropertyValue::Float(21.5));
}

#[test]
fn test_deserialize_nested_document() {
    let value: PropertyValue =
        serde_json::from_str(r#"{"targetTemperatureRange": {"min": 18, "max": 24}, "enabled": true, "tags": ["a", null]}"#)
            .unwrap();

    let range = value.get("targetTemperatureRange").unwrap();
    assert_eq!(range.get("min"), Some(&PropertyValue::Integer(18)));
    assert_eq!(range.get("max"), Some(&PropertyValue::Integer(24)));
    assert_eq!(value.get("enabled"), Some(&PropertyValue::Bool(true)));
    assert_eq!(
        value.get("tags"),
        Some(&PropertyValue::Array(vec![PropertyValue::from("a"), PropertyValue::Null]))
    );
}

#[test]
fn test_serialize_round_trips_through_serde_json_value() {
    let mut map = BTreeMap::new();
    map.insert("min".to_string(), PropertyValue::Integer(18));
    map.insert("max".to_string(), PropertyValue::Float(24.5));
    let value = PropertyValue::Map(map);

    assert_eq!(serde_json::to_value(&value).unwrap(), json!({"min": 18, "max": 24.5}));
    assert_eq!(value.to_json_string(), r#"{"max":24.5,"min":18}"#);
}

#[test]
fn test_to_i64_accepts_integral_shapes() {
    assert_eq!(PropertyValue::Integer(42).to_i64(), Ok(42));
    assert_eq!(PropertyValue::Float(3000.0).to_i64(), Ok(3000));
    assert_eq!(PropertyValue::from(" 1500 ").to_i64(), Ok(1500));
}

#[test]
fn test_to_i64_rejects_fractional_and_foreign_shapes() {
    assert!(matches!(
        PropertyValue::Float(1.5).to_i64(),
        Err(HandlerError::OutOfRange(_))
    ));
    // 2^63 is the first float past i64::MAX
    assert!(matches!(
        PropertyValue::Float(9.223372036854775808e18).to_i64(),
        Err(HandlerError::OutOfRange(_))
    ));
    assert_eq!(PropertyValue::Float(-9.223372036854775808e18).to_i64(), Ok(i64::MIN));
    assert!(matches!(
        PropertyValue::from("fast").to_i64(),
        Err(HandlerError::InvalidPayload(_))
    ));
    assert_eq!(
        PropertyValue::Bool(true).to_i64(),
        Err(HandlerError::TypeMismatch {
            expected: "integer",
            found: "boolean"
        })
    );
}

#[test]
fn test_to_f64_widens_integers() {
    assert_eq!(PropertyValue::Integer(7).to_f64(), Ok(7.0));
    assert_eq!(PropertyValue::from("2.25").to_f64(), Ok(2.25));
    assert!(PropertyValue::Null.to_f64().is_err());
}

#[test]
fn test_accessors_report_found_kind() {
    let err = PropertyValue::Integer(1).as_map().unwrap_err();
    assert_eq!(
        err,
        HandlerError::TypeMismatch {
            expected: "map",
            found: "integer"
        }
    );
    assert_eq!(PropertyValue::from("x").as_str(), Ok("x"));
    assert!(PropertyValue::Null.is_null());
}

#[test]
fn test_non_finite_float_serializes_as_null() {
    let json: serde_json::Value = PropertyValue::Float(f64::NAN).into();
    assert_eq!(json, serde_json::Value::Null);
}

#[test]
fn test_from_json_str_reports_invalid_payload() {
    assert!(matches!(
        PropertyValue::from_json_str("{not json"),
        Err(HandlerError::InvalidPayload(_))
    ));
    assert_eq!(PropertyValue::from_json_str("{}").unwrap(), PropertyValue::Map(BTreeMap::new()));
}
