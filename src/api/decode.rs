//! Lenient decoding of Foreman responses.
//!
//! Foreman is not consistent about JSON types: ids arrive as numbers or as
//! strings, optional strings arrive as `null`, and association lists arrive
//! either as `[{"id": 1, "name": ".."}]` or as plain id arrays. Every API
//! model decodes through [`Fields`] so that a mismatched field falls back to
//! its zero value instead of failing the whole response.

use serde_json::{Map, Value};

/// Read an integer from a JSON number or numeric string.
pub fn to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read a boolean from a JSON bool or a `"true"`/`"false"` string.
pub fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

/// Render any JSON value as text: strings verbatim, `null` as empty,
/// everything else as its JSON encoding.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Canonical form of a free-form setting.
///
/// Scalars become text so `2` and `"2"` compare equal; arrays and objects
/// are kept as JSON. Returns `None` for `null`.
pub fn to_setting(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Array(_) | Value::Object(_) => Some(value.clone()),
        scalar => Some(Value::String(to_text(scalar))),
    }
}

/// Collect ids from an association list.
///
/// Accepts objects carrying an `id` and bare ids. Entries without a usable
/// id are skipped. The result is sorted and deduplicated.
pub fn to_ids(value: &Value) -> Vec<i64> {
    let mut ids: Vec<i64> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(obj) => obj.get("id").and_then(to_i64),
                other => to_i64(other),
            })
            .collect(),
        _ => Vec::new(),
    };
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Field accessor over a decoded JSON object with zero-value fallbacks.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    obj: Option<&'a Map<String, Value>>,
}

impl<'a> Fields<'a> {
    /// Wrap a JSON value. Anything other than an object reads as empty.
    pub fn new(value: &'a Value) -> Self {
        Self {
            obj: value.as_object(),
        }
    }

    /// Raw access to a field.
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.obj.and_then(|obj| obj.get(key))
    }

    /// Integer field, `0` when absent or mistyped.
    pub fn i64(&self, key: &str) -> i64 {
        self.opt_i64(key).unwrap_or_default()
    }

    /// Integer field, `None` when absent, null or mistyped.
    pub fn opt_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(to_i64)
    }

    /// String field, empty when absent or not a string.
    pub fn string(&self, key: &str) -> String {
        self.opt_string(key).unwrap_or_default()
    }

    /// String field, `None` when absent or not a string.
    pub fn opt_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(Value::as_str).map(str::to_string)
    }

    /// Free-form value rendered as text (see [`to_text`]).
    pub fn text(&self, key: &str) -> String {
        self.get(key).map(to_text).unwrap_or_default()
    }

    /// Boolean field, `false` when absent or mistyped.
    pub fn bool(&self, key: &str) -> bool {
        self.get(key).and_then(to_bool).unwrap_or_default()
    }

    /// Id list read from the first of `keys` that is present.
    ///
    /// Foreman writes associations as `realm_ids` but reads them back as
    /// `realms: [{id, name}]`, so both spellings are accepted.
    pub fn ids(&self, keys: &[&str]) -> Vec<i64> {
        keys.iter()
            .find_map(|key| self.get(key).filter(|v| v.is_array()))
            .map(to_ids)
            .unwrap_or_default()
    }

    /// Nested object field.
    pub fn object(&self, key: &str) -> Option<&'a Map<String, Value>> {
        self.get(key).and_then(Value::as_object)
    }
}
