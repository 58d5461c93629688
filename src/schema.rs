//! Schema types for the provider configuration, resources and data sources.
//!
//! Schemas drive configuration validation, planning (which attributes are
//! computed, which force replacement) and the GetSchema response sent to the
//! engine. Foreman objects are flat, so a schema is a single block of
//! attributes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The type of an attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// A string value.
    String,
    /// A 64-bit integer.
    Int64,
    /// A boolean value.
    Bool,
    /// An ordered list of values of a single type.
    List(Box<AttributeType>),
    /// A set of unique values of a single type; order is not significant.
    Set(Box<AttributeType>),
    /// A map from string keys to values of a single type.
    Map(Box<AttributeType>),
    /// Any JSON value, for free-form settings such as VM attributes.
    Dynamic,
}

impl AttributeType {
    /// Create a list type.
    pub fn list(element_type: AttributeType) -> Self {
        Self::List(Box::new(element_type))
    }

    /// Create a set type.
    pub fn set(element_type: AttributeType) -> Self {
        Self::Set(Box::new(element_type))
    }

    /// Create a map type.
    pub fn map(element_type: AttributeType) -> Self {
        Self::Map(Box::new(element_type))
    }
}

/// Describes how an attribute can be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AttributeFlags {
    /// The attribute is required in configuration.
    pub required: bool,
    /// The attribute is optional in configuration.
    pub optional: bool,
    /// The attribute is computed by the provider.
    pub computed: bool,
    /// The attribute is hidden in plan output and logs.
    pub sensitive: bool,
}

impl AttributeFlags {
    /// Flags for a required attribute.
    pub fn required() -> Self {
        Self {
            required: true,
            ..Default::default()
        }
    }

    /// Flags for an optional attribute.
    pub fn optional() -> Self {
        Self {
            optional: true,
            ..Default::default()
        }
    }

    /// Flags for a read-only attribute set by the provider.
    pub fn computed() -> Self {
        Self {
            computed: true,
            ..Default::default()
        }
    }

    /// Flags for an attribute that may be configured and otherwise keeps
    /// whatever Foreman reports.
    pub fn optional_computed() -> Self {
        Self {
            optional: true,
            computed: true,
            ..Default::default()
        }
    }
}

/// Describes a single attribute in a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// The type of the attribute.
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    /// Flags describing how the attribute can be used.
    #[serde(flatten)]
    pub flags: AttributeFlags,
    /// Human-readable description of the attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// If set, changing this attribute forces resource replacement.
    #[serde(default)]
    pub force_new: bool,
    /// Value planned when the configuration leaves the attribute out.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Smallest accepted value for integer attributes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_value: Option<i64>,
}

impl Attribute {
    /// Create a new attribute with the given type and flags.
    pub fn new(attr_type: AttributeType, flags: AttributeFlags) -> Self {
        Self {
            attr_type,
            flags,
            description: None,
            force_new: false,
            default: None,
            min_value: None,
        }
    }

    /// Create a required string attribute.
    pub fn required_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::required())
    }

    /// Create an optional string attribute.
    pub fn optional_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::optional())
    }

    /// Create a computed string attribute.
    pub fn computed_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::computed())
    }

    /// Create a required int64 attribute.
    pub fn required_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::required())
    }

    /// Create an optional int64 attribute.
    pub fn optional_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::optional())
    }

    /// Create an optional bool attribute.
    pub fn optional_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::optional())
    }

    /// Set the description for this attribute.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark this attribute as forcing resource replacement when changed.
    pub fn with_force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Set a default value for this attribute.
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Reject integer values below `min`.
    pub fn with_min_value(mut self, min: i64) -> Self {
        self.min_value = Some(min);
        self
    }

    /// Mark this attribute as sensitive.
    pub fn sensitive(mut self) -> Self {
        self.flags.sensitive = true;
        self
    }

    /// Whether the provider alone sets this attribute.
    pub fn is_computed_only(&self) -> bool {
        self.flags.computed && !self.flags.optional && !self.flags.required
    }
}

/// The attributes of a resource, data source or provider block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Block {
    /// The attributes within this block.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, Attribute>,
    /// Human-readable description of the block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Schema for a resource or data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// The version of this schema (for state upgrades).
    #[serde(default)]
    pub version: u64,
    /// The root block containing all attributes.
    #[serde(flatten)]
    pub block: Block,
}

impl Schema {
    /// Create a schema at version 0.
    pub fn v0() -> Self {
        Self {
            version: 0,
            block: Block::default(),
        }
    }

    /// Add an attribute to the schema.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.block.attributes.insert(name.into(), attr);
        self
    }

    /// Set the description of the root block.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.block.description = Some(description.into());
        self
    }

    /// Look up a top-level attribute.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.block.attributes.get(name)
    }

    /// Top-level attributes sorted by name.
    pub fn sorted_attributes(&self) -> Vec<(&str, &Attribute)> {
        let mut attributes: Vec<_> = self
            .block
            .attributes
            .iter()
            .map(|(name, attr)| (name.as_str(), attr))
            .collect();
        attributes.sort_by_key(|(name, _)| *name);
        attributes
    }

    /// Derive a data source schema from a resource schema.
    ///
    /// Every attribute becomes computed (read-only, no defaults, no
    /// replacement semantics), then `search` attributes are made required so
    /// they can be used as lookup keys.
    pub fn to_data_source(&self, search: &[&str]) -> Schema {
        let mut schema = self.clone();
        for (name, attr) in schema.block.attributes.iter_mut() {
            let is_search = search.contains(&name.as_str());
            attr.flags = if is_search {
                AttributeFlags::required()
            } else {
                AttributeFlags::computed()
            };
            attr.force_new = false;
            attr.default = None;
            if !is_search {
                attr.min_value = None;
            }
        }
        schema
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::v0()
    }
}

/// Schema for the provider configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProviderSchema {
    /// Schema for provider configuration.
    #[serde(default)]
    pub provider: Schema,
    /// Schemas for each resource type.
    #[serde(default)]
    pub resources: HashMap<String, Schema>,
    /// Schemas for each data source type.
    #[serde(default)]
    pub data_sources: HashMap<String, Schema>,
}

impl ProviderSchema {
    /// Create a new empty provider schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the provider configuration schema.
    pub fn with_provider_config(mut self, schema: Schema) -> Self {
        self.provider = schema;
        self
    }

    /// Add a resource schema.
    pub fn with_resource(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.resources.insert(name.into(), schema);
        self
    }

    /// Add a data source schema.
    pub fn with_data_source(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.data_sources.insert(name.into(), schema);
        self
    }
}

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// An error that prevents the operation from completing.
    Error,
    /// A warning that doesn't prevent the operation but should be addressed.
    Warning,
}

/// A diagnostic message from the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity of the diagnostic.
    pub severity: DiagnosticSeverity,
    /// A short summary of the issue.
    pub summary: String,
    /// A detailed description of the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// The attribute path where the issue occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    fn with_severity(severity: DiagnosticSeverity, summary: impl Into<String>) -> Self {
        Self {
            severity,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Create an error diagnostic.
    pub fn error(summary: impl Into<String>) -> Self {
        Self::with_severity(DiagnosticSeverity::Error, summary)
    }

    /// Create a warning diagnostic.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self::with_severity(DiagnosticSeverity::Warning, summary)
    }

    /// Add detail to this diagnostic.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Set the attribute path for this diagnostic.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Whether this diagnostic blocks the operation.
    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_flags() {
        let required = AttributeFlags::required();
        assert!(required.required);
        assert!(!required.optional);
        assert!(!required.computed);

        let computed = AttributeFlags::computed();
        assert!(!computed.required);
        assert!(!computed.optional);
        assert!(computed.computed);

        let optional_computed = AttributeFlags::optional_computed();
        assert!(!optional_computed.required);
        assert!(optional_computed.optional);
        assert!(optional_computed.computed);
    }

    #[test]
    fn test_attribute_builders() {
        let attr = Attribute::required_int64()
            .with_description("Compute profile the settings belong to")
            .with_force_new()
            .with_min_value(0);

        assert_eq!(attr.attr_type, AttributeType::Int64);
        assert!(attr.flags.required);
        assert_eq!(
            attr.description,
            Some("Compute profile the settings belong to".to_string())
        );
        assert!(attr.force_new);
        assert_eq!(attr.min_value, Some(0));
        assert!(!attr.is_computed_only());
        assert!(Attribute::computed_string().is_computed_only());
        assert!(Attribute::optional_string().sensitive().flags.sensitive);
    }

    #[test]
    fn test_attribute_type_serializes_for_the_wire() {
        let set = AttributeType::set(AttributeType::map(AttributeType::String));
        assert_eq!(
            serde_json::to_string(&set).unwrap(),
            r#"{"set":{"map":"string"}}"#
        );
        assert_eq!(serde_json::to_string(&AttributeType::Int64).unwrap(), r#""int64""#);
    }

    #[test]
    fn test_provider_schema() {
        let provider_schema = ProviderSchema::new()
            .with_provider_config(
                Schema::v0()
                    .with_attribute("client_password", Attribute::optional_string().sensitive()),
            )
            .with_resource(
                "foreman_puppetclass",
                Schema::v0()
                    .with_description("A Puppet class")
                    .with_attribute("name", Attribute::required_string())
                    .with_attribute("id", Attribute::computed_string()),
            )
            .with_data_source(
                "foreman_puppetclass",
                Schema::v0().with_attribute("name", Attribute::required_string()),
            );

        assert!(provider_schema
            .provider
            .attribute("client_password")
            .is_some_and(|a| a.flags.sensitive));
        assert_eq!(
            provider_schema.resources["foreman_puppetclass"].block.description.as_deref(),
            Some("A Puppet class")
        );
        assert!(provider_schema.data_sources.contains_key("foreman_puppetclass"));
    }

    #[test]
    fn test_data_source_from_resource_schema() {
        let resource = Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute(
                "compute_resource_id",
                Attribute::required_int64().with_force_new().with_min_value(0),
            )
            .with_attribute(
                "domain_ids",
                Attribute::new(
                    AttributeType::set(AttributeType::Int64),
                    AttributeFlags::optional_computed(),
                ),
            );

        let data_source = resource.to_data_source(&["name"]);

        let name = data_source.attribute("name").unwrap();
        assert!(name.flags.required);
        assert!(!name.flags.computed);

        let compute_resource = data_source.attribute("compute_resource_id").unwrap();
        assert!(compute_resource.is_computed_only());
        assert!(!compute_resource.force_new);
        assert_eq!(compute_resource.min_value, None);

        assert!(data_source.attribute("domain_ids").unwrap().is_computed_only());
        assert!(data_source.attribute("id").unwrap().is_computed_only());
    }

    #[test]
    fn test_sorted_attributes() {
        let schema = Schema::v0()
            .with_attribute("value", Attribute::required_string())
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("match", Attribute::required_string());
        let names: Vec<_> = schema.sorted_attributes().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["id", "match", "value"]);
    }

    #[test]
    fn test_diagnostic() {
        let err = Diagnostic::error("Invalid server_protocol")
            .with_detail("Expected http or https")
            .with_attribute("server_protocol");

        assert!(err.is_error());
        assert_eq!(err.summary, "Invalid server_protocol");
        assert_eq!(err.detail, Some("Expected http or https".to_string()));
        assert_eq!(err.attribute, Some("server_protocol".to_string()));

        let warning = Diagnostic::warning("client_password is not set");
        assert_eq!(warning.severity, DiagnosticSeverity::Warning);
        assert!(!warning.is_error());
    }
}
