//! Tagged property value carried end-to-end through twin reconciliation.
//!
//! Desired and reported properties are arbitrary structured values. Instead of
//! implicit runtime coercions, handlers pull the shape they accept out of a
//! [`PropertyValue`] with one of the fallible accessors, which fail with a
//! [`HandlerError`] describing the mismatch.

#[cfg(test)]
mod value_test;

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::HandlerError;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<PropertyValue>),
    Map(BTreeMap<String, PropertyValue>),
}

impl PropertyValue {
    /// Human readable variant name, used in mismatch errors and logs
    pub fn kind(&self) -> &'static str {
        match self {
            PropertyValue::Null => "null",
            PropertyValue::Bool(_) => "boolean",
            PropertyValue::Integer(_) => "integer",
            PropertyValue::Float(_) => "float",
            PropertyValue::String(_) => "string",
            PropertyValue::Array(_) => "array",
            PropertyValue::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    pub fn as_bool(&self) -> Result<bool, HandlerError> {
        match self {
            PropertyValue::Bool(b) => Ok(*b),
            other => Err(mismatch("boolean", other)),
        }
    }

    /// Parses the value as a signed integer.
    ///
    /// Accepts integers, floats without a fractional part, and strings holding
    /// a decimal integer. Everything else is rejected.
    pub fn to_i64(&self) -> Result<i64, HandlerError> {
        match self {
            PropertyValue::Integer(i) => Ok(*i),
            PropertyValue::Float(f) => {
                if f.is_finite() && f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 {
                    Ok(*f as i64)
                } else {
                    Err(HandlerError::OutOfRange(format!("{f} is not an integer")))
                }
            }
            PropertyValue::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|e| HandlerError::InvalidPayload(format!("{s:?} is not an integer: {e}"))),
            other => Err(mismatch("integer", other)),
        }
    }

    /// Parses the value as a double. Integers widen, numeric strings parse.
    pub fn to_f64(&self) -> Result<f64, HandlerError> {
        match self {
            PropertyValue::Integer(i) => Ok(*i as f64),
            PropertyValue::Float(f) => Ok(*f),
            PropertyValue::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| HandlerError::InvalidPayload(format!("{s:?} is not a number: {e}"))),
            other => Err(mismatch("number", other)),
        }
    }

    pub fn as_str(&self) -> Result<&str, HandlerError> {
        match self {
            PropertyValue::String(s) => Ok(s),
            other => Err(mismatch("string", other)),
        }
    }

    pub fn as_array(&self) -> Result<&[PropertyValue], HandlerError> {
        match self {
            PropertyValue::Array(items) => Ok(items),
            other => Err(mismatch("array", other)),
        }
    }

    pub fn as_map(&self) -> Result<&BTreeMap<String, PropertyValue>, HandlerError> {
        match self {
            PropertyValue::Map(map) => Ok(map),
            other => Err(mismatch("map", other)),
        }
    }

    /// Looks up a member of a map value; `None` for missing keys and non-maps
    pub fn get(
        &self,
        key: &str,
    ) -> Option<&PropertyValue> {
        match self {
            PropertyValue::Map(map) => map.get(key),
            _ => None,
        }
    }

    /// Parses a JSON text into a value
    pub fn from_json_str(json: &str) -> Result<Self, HandlerError> {
        serde_json::from_str(json).map_err(|e| HandlerError::InvalidPayload(e.to_string()))
    }

    pub fn to_json_string(&self) -> String {
        serde_json::Value::from(self.clone()).to_string()
    }
}

fn mismatch(
    expected: &'static str,
    found: &PropertyValue,
) -> HandlerError {
    HandlerError::TypeMismatch {
        expected,
        found: found.kind(),
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.to_json_string())
    }
}

impl From<serde_json::Value> for PropertyValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => PropertyValue::Null,
            serde_json::Value::Bool(b) => PropertyValue::Bool(b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(PropertyValue::Integer)
                .or_else(|| n.as_f64().map(PropertyValue::Float))
                .unwrap_or(PropertyValue::Null),
            serde_json::Value::String(s) => PropertyValue::String(s),
            serde_json::Value::Array(items) => PropertyValue::Array(items.into_iter().map(Into::into).collect()),
            serde_json::Value::Object(map) => PropertyValue::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect()),
        }
    }
}

impl From<PropertyValue> for serde_json::Value {
    fn from(value: PropertyValue) -> Self {
        match value {
            PropertyValue::Null => serde_json::Value::Null,
            PropertyValue::Bool(b) => serde_json::Value::Bool(b),
            PropertyValue::Integer(i) => serde_json::Value::from(i),
            // NaN and infinities have no JSON representation
            PropertyValue::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            PropertyValue::String(s) => serde_json::Value::String(s),
            PropertyValue::Array(items) => serde_json::Value::Array(items.into_iter().map(Into::into).collect()),
            PropertyValue::Map(map) => serde_json::Value::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect()),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<i32> for PropertyValue {
    fn from(i: i32) -> Self {
        PropertyValue::Integer(i as i64)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<u32> for PropertyValue {
    fn from(i: u32) -> Self {
        PropertyValue::Integer(i as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<Vec<PropertyValue>> for PropertyValue {
    fn from(items: Vec<PropertyValue>) -> Self {
        PropertyValue::Array(items)
    }
}

impl From<BTreeMap<String, PropertyValue>> for PropertyValue {
    fn from(map: BTreeMap<String, PropertyValue>) -> Self {
        PropertyValue::Map(map)
    }
}
