//! Schema validation helpers.
//!
//! Checks a `serde_json::Value` configuration against a [`Schema`] and
//! returns one [`Diagnostic`] per problem, each pointing at the attribute
//! path (`interface.0.network`) it concerns.
//!
//! # Example
//!
//! ```
//! use hemmer_provider_foreman::schema::{Schema, Attribute};
//! use hemmer_provider_foreman::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute("parent_id", Attribute::optional_int64().with_min_value(1));
//!
//! assert!(validate(&schema, &json!({"name": "lyon", "parent_id": 3})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "lyon", "parent_id": "3"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("parent_id".to_string()));
//! ```

use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};
use serde_json::Value;

/// Validate a JSON value against a schema.
///
/// Returns a list of diagnostics for any validation errors found.
/// An empty list means the value is valid.
///
/// # Validation Rules
///
/// - Required attributes must be present and non-null
/// - Optional attributes may be absent or null
/// - Computed-only attributes are skipped (Foreman sets these)
/// - Attribute types must match the schema, element by element; dynamic
///   values accept anything
/// - Integers must not be below the attribute's `min_value`
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let empty = serde_json::Map::new();

    let obj = match value {
        Value::Object(map) => map,
        // An empty configuration block.
        Value::Null => &empty,
        _ => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(value))),
            );
            return diagnostics;
        },
    };

    for (name, attr) in schema.sorted_attributes() {
        validate_attribute(attr, obj.get(name), name, &mut diagnostics);
    }
    diagnostics
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.is_computed_only() {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        },
        Some(v) => {
            validate_attribute_type(&attr.attr_type, v, path, diagnostics);
            if let (Some(min), Some(n)) = (attr.min_value, v.as_i64()) {
                if n < min {
                    diagnostics.push(
                        Diagnostic::error(format!("Value of '{}' is out of range", path))
                            .with_detail(format!("Expected at least {}, got {}", min, n))
                            .with_attribute(path),
                    );
                }
            }
        },
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        },
        AttributeType::Int64 => {
            if !is_int64(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        },
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        },
        AttributeType::List(element_type) | AttributeType::Set(element_type) => {
            let Some(arr) = value.as_array() else {
                let expected = if matches!(attr_type, AttributeType::Set(_)) { "set" } else { "list" };
                diagnostics.push(type_error(path, expected, value));
                return;
            };
            for (i, elem) in arr.iter().enumerate() {
                let elem_path = format!("{}.{}", path, i);
                validate_attribute_type(element_type, elem, &elem_path, diagnostics);
            }
        },
        AttributeType::Map(value_type) => {
            let Some(obj) = value.as_object() else {
                diagnostics.push(type_error(path, "map", value));
                return;
            };
            for (key, val) in obj {
                let key_path = format!("{}.{}", path, key);
                validate_attribute_type(value_type, val, &key_path, diagnostics);
            }
        },
        AttributeType::Dynamic => {},
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    value.as_i64().is_some()
}

fn type_error(path: &str, expected: &str, value: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, value_type_name(value)))
        .with_attribute(path)
}
