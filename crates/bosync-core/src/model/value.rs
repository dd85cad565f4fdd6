// ── Runtime values ──
//
// Live data and property values arrive as arbitrary JSON. The codec works
// over this closed variant instead of `serde_json::Value` so nested objects
// are always ordered maps and the terminal/branch split is explicit.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// A live or property value: a scalar, an array, or a nested object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum DataValue {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    Array(Vec<DataValue>),
    Object(BTreeMap<String, DataValue>),
}

impl DataValue {
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, DataValue>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Value> for DataValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::Text(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<DataValue> for Value {
    fn from(value: DataValue) -> Self {
        match value {
            DataValue::Null => Value::Null,
            DataValue::Bool(b) => Value::Bool(b),
            DataValue::Number(n) => Value::Number(n),
            DataValue::Text(s) => Value::String(s),
            DataValue::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            DataValue::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<i64> for DataValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<bool> for DataValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for DataValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            other => write!(f, "{}", Value::from(other.clone())),
        }
    }
}

/// Flat, dot-path addressed values (`"temperature.value" -> 21.5`).
pub type FlatValues = BTreeMap<String, DataValue>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_objects_become_ordered_maps() {
        let value: DataValue = serde_json::from_value(json!({ "b": 1, "a": [true, null] })).unwrap();
        let map = value.as_object().unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(
            map["a"],
            DataValue::Array(vec![DataValue::Bool(true), DataValue::Null])
        );
    }

    #[test]
    fn display_keeps_text_unquoted() {
        assert_eq!(DataValue::from("on").to_string(), "on");
        assert_eq!(DataValue::from(21_i64).to_string(), "21");
    }
}
