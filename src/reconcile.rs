//! Reconciliation of set-typed child collections.
//!
//! Some Foreman collections (the network interfaces and volumes of a compute
//! attribute, for instance) have no stable per-element identifier. The API
//! replaces elements it is sent and removes the ones it is told to remove,
//! but it never infers removal from omission. To converge on the declared
//! set, every element that disappeared from configuration has to be sent
//! back once more, flagged for removal.
//!
//! Records compare structurally over all of their fields. Scalar fields are
//! held as text and nested fields as JSON. The removal flag is a wire
//! concern only: it is added when a [`Patch`] is rendered and stripped
//! whenever records are read back.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::api::decode::{to_bool, to_i64, to_setting};

/// Field that flags a record for removal on the wire.
pub const REMOVAL_MARKER: &str = "_destroy";

/// One element of a set-typed collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AttributeRecord(BTreeMap<String, Value>);

impl AttributeRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field. Scalars are stored as text, `null` is ignored.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Some(value) = to_setting(&value.into()) {
            self.0.insert(name.into(), value);
        }
        self
    }

    /// Look up a field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode a record reported by Foreman.
    ///
    /// Returns `None` for entries the server reports as pending removal.
    pub fn from_response(obj: &Map<String, Value>) -> Option<Self> {
        if obj.get(REMOVAL_MARKER).is_some_and(is_truthy) {
            return None;
        }
        Some(Self::from_config(obj))
    }

    /// Decode a record from configuration or state. A removal flag in the
    /// input is dropped and the rest of the record kept.
    pub fn from_config(obj: &Map<String, Value>) -> Self {
        Self(
            obj.iter()
                .filter(|(name, _)| name.as_str() != REMOVAL_MARKER)
                .filter_map(|(name, value)| Some((name.clone(), to_setting(value)?)))
                .collect(),
        )
    }

    /// Encode the record as a JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        )
    }

    fn to_wire(&self, removed: bool) -> Value {
        let mut value = self.to_value();
        if removed {
            if let Value::Object(obj) = &mut value {
                obj.insert(REMOVAL_MARKER.to_string(), Value::Bool(true));
            }
        }
        value
    }
}

impl Ord for AttributeRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        let key = |(name, value): (&String, &Value)| (name.clone(), value.to_string());
        self.0.iter().map(key).cmp(other.0.iter().map(key))
    }
}

impl PartialOrd for AttributeRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for AttributeRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |record, (k, v)| record.with_field(k, v))
    }
}

fn is_truthy(value: &Value) -> bool {
    to_bool(value).unwrap_or(false)
        || to_i64(value).is_some_and(|n| n != 0)
}

/// A set of records deduplicated by structural equality.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSet(BTreeSet<AttributeRecord>);

impl AttributeSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record. Returns `false` if an equal record was present.
    pub fn insert(&mut self, record: AttributeRecord) -> bool {
        self.0.insert(record)
    }

    /// Whether an equal record is present.
    pub fn contains(&self, record: &AttributeRecord) -> bool {
        self.0.contains(record)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate records in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &AttributeRecord> {
        self.0.iter()
    }

    /// Records in `self` that are not in `other`.
    pub fn difference(&self, other: &AttributeSet) -> AttributeSet {
        self.0.difference(&other.0).cloned().collect()
    }

    /// Decode a collection reported by Foreman.
    ///
    /// Accepts a JSON array of objects or Foreman's index-keyed form
    /// (`{"0": {..}, "1": {..}}`). Entries that are not objects, and entries
    /// marked for removal, are skipped.
    pub fn from_value(value: &Value) -> Self {
        entries(value)
            .filter_map(AttributeRecord::from_response)
            .collect()
    }

    /// Decode a collection from configuration or state. Every object entry
    /// is kept, minus any removal flag.
    pub fn from_config(value: &Value) -> Self {
        entries(value).map(AttributeRecord::from_config).collect()
    }

    /// Encode the set as a JSON array for state.
    pub fn to_value(&self) -> Value {
        Value::Array(self.0.iter().map(AttributeRecord::to_value).collect())
    }
}

fn entries(value: &Value) -> impl Iterator<Item = &Map<String, Value>> {
    let items: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(obj) => obj.values().collect(),
        _ => Vec::new(),
    };
    items.into_iter().filter_map(Value::as_object)
}

impl FromIterator<AttributeRecord> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = AttributeRecord>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One element of a [`Patch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchEntry {
    /// The record as declared or as last read.
    pub record: AttributeRecord,
    /// Whether the record is to be removed remotely.
    pub removed: bool,
}

/// The collection to submit on update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patch {
    entries: Vec<PatchEntry>,
}

impl Patch {
    /// All entries, desired records first, then removals.
    pub fn entries(&self) -> &[PatchEntry] {
        &self.entries
    }

    /// Whether there is nothing to submit.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records submitted unmarked.
    pub fn retained(&self) -> impl Iterator<Item = &AttributeRecord> {
        self.entries.iter().filter(|e| !e.removed).map(|e| &e.record)
    }

    /// Records submitted with the removal flag.
    pub fn removals(&self) -> impl Iterator<Item = &AttributeRecord> {
        self.entries.iter().filter(|e| e.removed).map(|e| &e.record)
    }

    /// Render as a JSON array.
    pub fn to_list(&self) -> Value {
        Value::Array(
            self.entries
                .iter()
                .map(|e| e.record.to_wire(e.removed))
                .collect(),
        )
    }

    /// Render in Foreman's nested-attributes form, keyed by position.
    pub fn to_indexed(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .enumerate()
                .map(|(i, e)| (i.to_string(), e.record.to_wire(e.removed)))
                .collect(),
        )
    }
}

/// Compute the patch that moves a remote collection from `prior` to `desired`.
///
/// Every desired record appears once unmarked and every record of
/// `prior - desired` appears once marked for removal. An empty `desired`
/// still yields a non-empty patch when `prior` had records, and the caller
/// must submit it.
pub fn reconcile(prior: &AttributeSet, desired: &AttributeSet) -> Patch {
    let retained = desired.iter().map(|record| PatchEntry {
        record: record.clone(),
        removed: false,
    });
    let removed = prior.0.difference(&desired.0).map(|record| PatchEntry {
        record: record.clone(),
        removed: true,
    });
    Patch {
        entries: retained.chain(removed).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nic(name: &str) -> AttributeRecord {
        AttributeRecord::new()
            .with_field("name", name)
            .with_field("network", "VM Network")
    }

    fn set(records: &[AttributeRecord]) -> AttributeSet {
        records.iter().cloned().collect()
    }

    fn removed_set(patch: &Patch) -> AttributeSet {
        patch.removals().cloned().collect()
    }

    fn retained_set(patch: &Patch) -> AttributeSet {
        patch.retained().cloned().collect()
    }

    #[test]
    fn test_replaced_element_is_marked_for_removal() {
        let (a, b, c) = (nic("eth0"), nic("eth1"), nic("eth2"));
        let patch = reconcile(&set(&[a.clone(), b.clone()]), &set(&[b.clone(), c.clone()]));

        assert_eq!(patch.entries().len(), 3);
        assert_eq!(retained_set(&patch), set(&[b, c]));
        assert_eq!(removed_set(&patch), set(&[a]));
    }

    #[test]
    fn test_removals_are_prior_minus_desired() {
        let prior = set(&[nic("a"), nic("b"), nic("c")]);
        let desired = set(&[nic("b"), nic("d")]);
        let patch = reconcile(&prior, &desired);

        let removed = removed_set(&patch);
        assert_eq!(removed, prior.difference(&desired));
        assert!(removed.iter().all(|r| !desired.contains(r)));
    }

    #[test]
    fn test_unchanged_collection_has_no_removals() {
        let prior = set(&[nic("a"), nic("b")]);
        let patch = reconcile(&prior, &prior);

        assert_eq!(patch.removals().count(), 0);
        assert_eq!(retained_set(&patch), prior);
    }

    #[test]
    fn test_empty_prior_yields_desired_unmarked() {
        let desired = set(&[nic("a"), nic("b")]);
        let patch = reconcile(&AttributeSet::new(), &desired);

        assert_eq!(patch.removals().count(), 0);
        assert_eq!(retained_set(&patch), desired);
    }

    #[test]
    fn test_empty_desired_marks_everything() {
        let prior = set(&[nic("a"), nic("b")]);
        let patch = reconcile(&prior, &AttributeSet::new());

        assert!(!patch.is_empty());
        assert_eq!(patch.retained().count(), 0);
        assert_eq!(removed_set(&patch), prior);
    }

    #[test]
    fn test_both_empty() {
        assert!(reconcile(&AttributeSet::new(), &AttributeSet::new()).is_empty());
    }

    #[test]
    fn test_structural_equality_ignores_insertion_order() {
        let left = AttributeRecord::new()
            .with_field("size_gb", "20")
            .with_field("datastore", "ssd");
        let right = AttributeRecord::new()
            .with_field("datastore", "ssd")
            .with_field("size_gb", "20");
        assert_eq!(left, right);

        let mut records = AttributeSet::new();
        assert!(records.insert(left));
        assert!(!records.insert(right));
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_record_decodes_independent_of_key_order() {
        let first = json!({"name": "eth0", "network": "VM Network", "mtu": 1500});
        let second = json!({"mtu": "1500", "network": "VM Network", "name": "eth0"});

        let a = AttributeRecord::from_response(first.as_object().unwrap()).unwrap();
        let b = AttributeRecord::from_response(second.as_object().unwrap()).unwrap();
        assert_eq!(a, b);

        let encoded = a.to_value();
        let decoded = AttributeRecord::from_response(encoded.as_object().unwrap()).unwrap();
        assert_eq!(decoded, a);
        assert_eq!(decoded.get("mtu"), Some(&json!("1500")));
    }

    #[test]
    fn test_nested_fields_stay_json() {
        let value = json!({
            "size_gb": 20,
            "disk_mode": "persistent",
            "tags": ["ssd", "fast"],
            "options": {"thin": true}
        });
        let record = AttributeRecord::from_response(value.as_object().unwrap()).unwrap();

        assert_eq!(record.get("size_gb"), Some(&json!("20")));
        assert_eq!(record.get("tags"), Some(&json!(["ssd", "fast"])));
        assert_eq!(
            record.to_value(),
            json!({
                "size_gb": "20",
                "disk_mode": "persistent",
                "tags": ["ssd", "fast"],
                "options": {"thin": true}
            })
        );

        let other = AttributeRecord::new()
            .with_field("size_gb", "20")
            .with_field("disk_mode", "persistent")
            .with_field("tags", json!(["ssd", "fast"]))
            .with_field("options", json!({"thin": true}));
        assert_eq!(record, other);
        assert_eq!(record.cmp(&other), std::cmp::Ordering::Equal);

        let mut records = AttributeSet::new();
        records.insert(record);
        assert!(!records.insert(other));
        assert!(records.insert(AttributeRecord::new().with_field("tags", json!(["hdd"]))));
    }

    #[test]
    fn test_configured_marker_is_stripped_not_honoured() {
        let value = json!([
            {"network": "VM Network", "_destroy": "true"},
            {"network": "Backup"}
        ]);
        let configured = AttributeSet::from_config(&value);

        assert_eq!(configured.len(), 2);
        assert!(configured.contains(&AttributeRecord::new().with_field("network", "VM Network")));
        assert!(configured.iter().all(|r| r.get("_destroy").is_none()));

        // The same entries coming back from Foreman are pending removal.
        let reported = AttributeSet::from_value(&value);
        assert_eq!(reported.len(), 1);
        assert!(reported.contains(&AttributeRecord::new().with_field("network", "Backup")));
    }

    #[test]
    fn test_marker_is_never_read_back() {
        let value = json!({
            "0": {"name": "eth0"},
            "1": {"name": "eth1", "_destroy": true},
            "2": {"name": "eth2", "_destroy": "false"},
            "3": {"name": "eth3", "_destroy": "1"}
        });
        let records = AttributeSet::from_value(&value);

        assert_eq!(records.len(), 2);
        assert!(records.contains(&AttributeRecord::new().with_field("name", "eth0")));
        assert!(records.contains(&AttributeRecord::new().with_field("name", "eth2")));
        assert!(records.iter().all(|r| r.get("_destroy").is_none()));
    }

    #[test]
    fn test_wire_rendering() {
        let prior = set(&[nic("eth0")]);
        let desired = set(&[nic("eth1")]);
        let patch = reconcile(&prior, &desired);

        assert_eq!(
            patch.to_indexed(),
            json!({
                "0": {"name": "eth1", "network": "VM Network"},
                "1": {"name": "eth0", "network": "VM Network", "_destroy": true}
            })
        );
        assert_eq!(
            patch.to_list(),
            json!([
                {"name": "eth1", "network": "VM Network"},
                {"name": "eth0", "network": "VM Network", "_destroy": true}
            ])
        );
    }

    #[test]
    fn test_state_encoding_has_no_marker() {
        let records = set(&[nic("eth0"), nic("eth1")]);
        let value = records.to_value();
        assert_eq!(value.as_array().map(Vec::len), Some(2));
        assert_eq!(AttributeSet::from_value(&value), records);
        assert!(!value.to_string().contains(REMOVAL_MARKER));
    }
}
