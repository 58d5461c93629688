//! Plan, import and metadata types exchanged between the provider and the
//! server layer.
//!
//! These wrap the raw protobuf messages with `serde_json::Value` payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A change to a single attribute during a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// The path to the attribute that changed.
    pub path: String,
    /// The value before the change (None if creating).
    pub before: Option<Value>,
    /// The value after the change (None if deleting).
    pub after: Option<Value>,
}

impl AttributeChange {
    /// Create a new attribute change.
    pub fn new(path: impl Into<String>, before: Option<Value>, after: Option<Value>) -> Self {
        Self {
            path: path.into(),
            before,
            after,
        }
    }

    /// Create a change for a new attribute.
    pub fn added(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, None, Some(value))
    }

    /// Create a change for a removed attribute.
    pub fn removed(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, Some(value), None)
    }

    /// Compare two attribute values; `None` when they are equal.
    ///
    /// A null on either side counts as an absent value.
    pub fn between(path: &str, before: &Value, after: &Value) -> Option<Self> {
        if before == after {
            return None;
        }
        let present = |v: &Value| (!v.is_null()).then(|| v.clone());
        Some(Self::new(path, present(before), present(after)))
    }
}

fn decode_side(bytes: &[u8]) -> Option<Value> {
    if bytes.is_empty() {
        None
    } else {
        serde_json::from_slice(bytes).ok()
    }
}

fn encode_side(value: Option<Value>) -> Vec<u8> {
    value
        .and_then(|v| serde_json::to_vec(&v).ok())
        .unwrap_or_default()
}

impl From<crate::generated::AttributeChange> for AttributeChange {
    fn from(proto: crate::generated::AttributeChange) -> Self {
        Self {
            path: proto.path,
            before: decode_side(&proto.before),
            after: decode_side(&proto.after),
        }
    }
}

impl From<AttributeChange> for crate::generated::AttributeChange {
    fn from(change: AttributeChange) -> Self {
        Self {
            path: change.path,
            before: encode_side(change.before),
            after: encode_side(change.after),
        }
    }
}

/// The result of a plan operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// The planned state after the operation (null when destroying).
    pub planned_state: Value,
    /// The list of attribute changes.
    pub changes: Vec<AttributeChange>,
    /// Whether the resource requires replacement.
    pub requires_replace: bool,
}

impl PlanResult {
    /// Create a plan result with no changes.
    pub fn no_change(state: Value) -> Self {
        Self {
            planned_state: state,
            changes: Vec::new(),
            requires_replace: false,
        }
    }

    /// Create a plan result with changes.
    pub fn with_changes(
        planned_state: Value,
        changes: Vec<AttributeChange>,
        requires_replace: bool,
    ) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace,
        }
    }

    /// Whether applying the plan would touch the resource at all.
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// A resource brought under management by ImportResourceState.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// The resource type.
    pub resource_type: String,
    /// The imported state.
    pub state: Value,
}

impl ImportedResource {
    /// Create a new imported resource.
    pub fn new(resource_type: impl Into<String>, state: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

/// Provider metadata returned by GetMetadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// Resource type names.
    pub resources: Vec<String>,
    /// Data source type names.
    pub data_sources: Vec<String>,
    /// Server capabilities.
    pub capabilities: ServerCapabilities,
}

/// Server capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServerCapabilities {
    /// Whether the provider supports planning destroy operations.
    pub plan_destroy: bool,
}

/// The protocol version for the handshake.
pub const PROTOCOL_VERSION: u32 = 1;

/// The handshake prefix output by providers.
pub const HANDSHAKE_PREFIX: &str = "HEMMER_PROVIDER";

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_change_between() {
        assert!(AttributeChange::between("name", &json!("lyon"), &json!("lyon")).is_none());

        let added = AttributeChange::between("description", &Value::Null, &json!("HQ")).unwrap();
        assert!(added.before.is_none());
        assert_eq!(added.after, Some(json!("HQ")));

        let removed = AttributeChange::between("parent_id", &json!(3), &Value::Null).unwrap();
        assert_eq!(removed.before, Some(json!(3)));
        assert!(removed.after.is_none());

        let modified = AttributeChange::between("domain_ids", &json!([1]), &json!([1, 2])).unwrap();
        assert_eq!(modified.before, Some(json!([1])));
        assert_eq!(modified.after, Some(json!([1, 2])));
    }

    #[test]
    fn test_attribute_change_conversion() {
        let change = AttributeChange::new("name", Some(json!("old")), Some(json!("new")));

        let proto: crate::generated::AttributeChange = change.clone().into();
        assert_eq!(proto.path, "name");
        assert_eq!(proto.before, br#""old""#.to_vec());

        let back: AttributeChange = proto.into();
        assert_eq!(back, change);

        let added: crate::generated::AttributeChange =
            AttributeChange::added("name", json!("new")).into();
        assert!(added.before.is_empty());
    }

    #[test]
    fn test_plan_result() {
        let no_change = PlanResult::no_change(json!({"id": "3"}));
        assert!(!no_change.has_changes());
        assert!(!no_change.requires_replace);

        let with_changes = PlanResult::with_changes(
            Value::Null,
            vec![AttributeChange::removed("name", json!("lyon"))],
            false,
        );
        assert!(with_changes.has_changes());
    }

    #[test]
    fn test_imported_resource() {
        let imported = ImportedResource::new("foreman_location", json!({"id": "3"}));
        assert_eq!(imported.resource_type, "foreman_location");
        assert_eq!(imported.state["id"], "3");
    }
}
