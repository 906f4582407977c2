//! Scalar values bridging entity fields and document fields

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// A scalar attribute value.
///
/// The interchange document carries these as plain JSON scalars; entity
/// accessors convert between the typed fields and this enum so the mapping
/// engine never touches field names directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Value {
    /// Convert a JSON scalar into a `Value`. Arrays, objects, and nulls
    /// have no scalar form and produce `None`.
    pub fn from_json(json: &Json) -> Option<Self> {
        match json {
            Json::String(s) => Some(Value::Text(s.clone())),
            Json::Bool(b) => Some(Value::Bool(*b)),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Value::Int(i))
                } else {
                    n.as_f64().map(Value::Float)
                }
            }
            _ => None,
        }
    }

    /// Convert back to a JSON scalar.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Text(s) => Json::String(s.clone()),
            Value::Int(i) => Json::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Bool(b) => Json::Bool(*b),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_conversion() {
        assert_eq!(Value::from_json(&json!("hi")), Some(Value::Text("hi".into())));
        assert_eq!(Value::from_json(&json!(5)), Some(Value::Int(5)));
        assert_eq!(Value::from_json(&json!(true)), Some(Value::Bool(true)));
        assert_eq!(Value::from_json(&json!(1.5)), Some(Value::Float(1.5)));
    }

    #[test]
    fn test_non_scalars_have_no_value() {
        assert_eq!(Value::from_json(&json!(null)), None);
        assert_eq!(Value::from_json(&json!([1, 2])), None);
        assert_eq!(Value::from_json(&json!({"a": 1})), None);
    }

    #[test]
    fn test_json_round_trip() {
        for v in [
            Value::Text("name".into()),
            Value::Int(-3),
            Value::Bool(false),
        ] {
            assert_eq!(Value::from_json(&v.to_json()), Some(v));
        }
    }
}
