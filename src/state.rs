//! Typed access to flat resource state.
//!
//! The host hands the provider planned and prior state as JSON objects.
//! [`StateReader`] pulls typed values out of them, treating `null` the same
//! as an absent attribute. Required attributes that are missing become
//! [`ProviderError::InvalidRequest`].

use std::collections::BTreeMap;

use serde_json::Value;

use crate::api::decode::{to_i64, to_setting, to_text};
use crate::error::ProviderError;
use crate::reconcile::AttributeSet;

/// Read-only view over a resource state object.
#[derive(Debug, Clone, Copy)]
pub struct StateReader<'a> {
    value: &'a Value,
}

impl<'a> StateReader<'a> {
    /// Wrap a state value. Anything other than an object reads as empty.
    pub fn new(value: &'a Value) -> Self {
        Self { value }
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.value.get(key).filter(|v| !v.is_null())
    }

    /// Whether the attribute is set to a non-null value.
    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Optional string attribute.
    pub fn string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(Value::as_str).map(str::to_string)
    }

    /// Required string attribute.
    pub fn required_string(&self, key: &str) -> Result<String, ProviderError> {
        self.string(key).ok_or_else(|| missing(key))
    }

    /// Optional integer attribute.
    pub fn i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(to_i64)
    }

    /// Required integer attribute.
    pub fn required_i64(&self, key: &str) -> Result<i64, ProviderError> {
        self.i64(key).ok_or_else(|| missing(key))
    }

    /// Boolean attribute, `false` when unset.
    pub fn bool(&self, key: &str) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or_default()
    }

    /// Set of integers; `None` when the attribute is unset.
    pub fn int_set(&self, key: &str) -> Option<Vec<i64>> {
        let items = self.get(key)?.as_array()?;
        let mut ids: Vec<i64> = items.iter().filter_map(to_i64).collect();
        ids.sort_unstable();
        ids.dedup();
        Some(ids)
    }

    /// Map of free-form settings. Scalars are read as text, nested values
    /// are kept as JSON and nulls are dropped.
    pub fn settings(&self, key: &str) -> BTreeMap<String, Value> {
        self.get(key)
            .and_then(Value::as_object)
            .into_iter()
            .flatten()
            .filter_map(|(k, v)| Some((k.clone(), to_setting(v)?)))
            .collect()
    }

    /// Set of records, e.g. network interfaces.
    pub fn record_set(&self, key: &str) -> AttributeSet {
        self.get(key)
            .map(AttributeSet::from_config)
            .unwrap_or_default()
    }

    /// The server-assigned id, stored as a string but tolerated as a number.
    pub fn id(&self) -> Result<i64, ProviderError> {
        let raw = self.get("id").ok_or_else(|| missing("id"))?;
        to_i64(raw).ok_or_else(|| {
            ProviderError::InvalidRequest(format!("id '{}' is not numeric", to_text(raw)))
        })
    }
}

fn missing(key: &str) -> ProviderError {
    ProviderError::InvalidRequest(format!("missing required attribute '{}'", key))
}

/// Render an id list as a JSON array.
pub fn int_set_value(ids: &[i64]) -> Value {
    Value::Array(ids.iter().map(|id| Value::from(*id)).collect())
}

/// Render a settings map as a JSON object.
pub fn settings_value(map: &BTreeMap<String, Value>) -> Value {
    Value::Object(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
}
