//! Field access helpers for raw source definitions

use serde_json::{Map, Value};

pub(crate) fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

pub(crate) fn object_field<'a>(value: &'a Value, key: &str) -> Option<&'a Map<String, Value>> {
    value.get(key).and_then(Value::as_object)
}

pub(crate) fn array_field<'a>(value: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    value.get(key).and_then(Value::as_array)
}

/// Present and not JSON null
pub(crate) fn present<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.get(key).filter(|v| !v.is_null())
}

/// Unsigned integer given as a number or a numeric string
pub(crate) fn u64_field(value: &Value, key: &str) -> Option<u64> {
    match value.get(key)? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Look in `properties` first, then at the top level
pub(crate) fn lookup<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value
        .get("properties")
        .and_then(|p| present(p, key))
        .or_else(|| present(value, key))
}

/// Render a scalar the way it should appear in a generated option or parameter
pub(crate) fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_u64_field_accepts_strings() {
        let value = json!({"a": 3, "b": "4", "c": "x", "d": -1});
        assert_eq!(u64_field(&value, "a"), Some(3));
        assert_eq!(u64_field(&value, "b"), Some(4));
        assert_eq!(u64_field(&value, "c"), None);
        assert_eq!(u64_field(&value, "d"), None);
        assert_eq!(u64_field(&value, "missing"), None);
    }

    #[test]
    fn test_lookup_prefers_properties() {
        let value = json!({"encoding_name": "UTF-16", "properties": {"encoding_name": "UTF-8"}});
        assert_eq!(lookup(&value, "encoding_name"), Some(&json!("UTF-8")));
        let value = json!({"encoding_name": "UTF-16", "properties": {"encoding_name": null}});
        assert_eq!(lookup(&value, "encoding_name"), Some(&json!("UTF-16")));
    }

    #[test]
    fn test_scalar_to_string() {
        assert_eq!(scalar_to_string(&json!("x")), "x");
        assert_eq!(scalar_to_string(&json!(true)), "true");
        assert_eq!(scalar_to_string(&json!(10)), "10");
        assert_eq!(scalar_to_string(&Value::Null), "");
    }
}
