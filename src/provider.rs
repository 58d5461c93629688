//! The Foreman provider.
//!
//! [`ForemanProvider`] implements [`ProviderService`] by dispatching every
//! call to the [`Resource`] or [`DataSource`] registered under the type
//! name. Planning is generic and driven by the resource schema.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::api::decode::to_setting;
use crate::api::ForemanClient;
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::logging::set_log_level;
use crate::reconcile::REMOVAL_MARKER;
use crate::resources::{self, DataSource, Resource};
use crate::schema::{AttributeType, Diagnostic, ProviderSchema, Schema};
use crate::server::ProviderService;
use crate::types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities,
};
use crate::validation::validate;

/// Provider for Foreman locations, compute profiles, compute attributes,
/// Puppet classes and smart class parameter overrides.
pub struct ForemanProvider {
    resources: HashMap<&'static str, Arc<dyn Resource>>,
    data_sources: HashMap<&'static str, Arc<dyn DataSource>>,
    client: RwLock<Option<Arc<ForemanClient>>>,
}

impl Default for ForemanProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ForemanProvider {
    /// Create an unconfigured provider with every resource type registered.
    pub fn new() -> Self {
        Self {
            resources: resources::resources()
                .into_iter()
                .map(|r| (r.type_name(), r))
                .collect(),
            data_sources: resources::data_sources()
                .into_iter()
                .map(|d| (d.type_name(), d))
                .collect(),
            client: RwLock::new(None),
        }
    }

    fn resource(&self, resource_type: &str) -> Result<&Arc<dyn Resource>, ProviderError> {
        self.resources
            .get(resource_type)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    fn data_source(&self, data_source_type: &str) -> Result<&Arc<dyn DataSource>, ProviderError> {
        self.data_sources
            .get(data_source_type)
            .ok_or_else(|| ProviderError::UnknownResource(data_source_type.to_string()))
    }

    async fn client(&self) -> Result<Arc<ForemanClient>, ProviderError> {
        self.client.read().await.clone().ok_or_else(|| {
            ProviderError::Configuration("provider is not configured; call Configure first".into())
        })
    }
}

#[async_trait::async_trait]
impl ProviderService for ForemanProvider {
    fn schema(&self) -> ProviderSchema {
        let mut schema = ProviderSchema::new().with_provider_config(ProviderConfig::schema());
        for (name, resource) in &self.resources {
            schema = schema.with_resource(*name, resource.schema());
        }
        for (name, data_source) in &self.data_sources {
            schema = schema.with_data_source(*name, data_source.schema());
        }
        schema
    }

    fn metadata(&self) -> ProviderMetadata {
        let mut resources: Vec<String> = self.resources.keys().map(|k| k.to_string()).collect();
        let mut data_sources: Vec<String> =
            self.data_sources.keys().map(|k| k.to_string()).collect();
        resources.sort();
        data_sources.sort();
        ProviderMetadata {
            resources,
            data_sources,
            capabilities: ServerCapabilities { plan_destroy: true },
        }
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let mut diagnostics = validate(&ProviderConfig::schema(), &config);
        match ProviderConfig::from_value(&config) {
            Ok(parsed) => diagnostics.extend(parsed.validate()),
            Err(e) => diagnostics.push(Diagnostic::error(e.message())),
        }
        Ok(diagnostics)
    }

    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let config = ProviderConfig::from_value(&config)?;
        let diagnostics = config.validate();
        if diagnostics.iter().any(Diagnostic::is_error) {
            return Ok(diagnostics);
        }

        if let Some(level) = &config.provider_loglevel {
            set_log_level(level)?;
        }

        let client = ForemanClient::new(&config.client_config())?;
        info!(
            url = client.base_url(),
            location_id = ?config.location_id,
            organization_id = ?config.organization_id,
            "configured Foreman client"
        );
        *self.client.write().await = Some(Arc::new(client));
        Ok(diagnostics)
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        self.client.write().await.take();
        info!("provider stopped");
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate(&self.resource(resource_type)?.schema(), &config))
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let schema = self.resource(resource_type)?.schema();
        Ok(plan_change(&schema, prior_state.as_ref(), &proposed_state))
    }

    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        resource.create(&*self.client().await?, &planned_state).await
    }

    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        match resource.read(&*self.client().await?, &current_state).await? {
            Some(state) => Ok(state),
            None => {
                warn!(
                    resource_type,
                    id = ?current_state.get("id"),
                    "resource no longer exists, removing it from state"
                );
                Ok(Value::Null)
            },
        }
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        resource
            .update(&*self.client().await?, &prior_state, &planned_state)
            .await
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let resource = self.resource(resource_type)?;
        resource.delete(&*self.client().await?, &current_state).await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let resource = self.resource(resource_type)?;
        match resource.import(&*self.client().await?, id).await? {
            Some(state) => Ok(vec![ImportedResource::new(resource_type, state)]),
            None => Err(ProviderError::NotFound(format!(
                "{} with import id '{}' does not exist",
                resource_type, id
            ))),
        }
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate(&self.data_source(data_source_type)?.schema(), &config))
    }

    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let data_source = self.data_source(data_source_type)?;
        debug!(data_source_type, "reading data source");
        data_source.read(&*self.client().await?, &config).await
    }
}

/// Normalize a value for comparison: sets are order-independent, an empty
/// collection equals an absent one and dynamic scalars compare as text.
fn normalize(attr_type: &AttributeType, value: &Value) -> Value {
    match (attr_type, value) {
        (_, Value::Array(items)) if items.is_empty() => Value::Null,
        (_, Value::Object(obj)) if obj.is_empty() => Value::Null,
        (AttributeType::Set(element_type), Value::Array(items)) => {
            let mut items: Vec<Value> = items.iter().map(|v| normalize(element_type, v)).collect();
            items.sort_by_cached_key(|item| item.to_string());
            items.dedup();
            Value::Array(items)
        },
        (AttributeType::List(element_type), Value::Array(items)) => {
            Value::Array(items.iter().map(|v| normalize(element_type, v)).collect())
        },
        (AttributeType::Map(value_type), Value::Object(obj)) => Value::Object(
            obj.iter()
                .filter(|(key, _)| key.as_str() != REMOVAL_MARKER)
                .map(|(key, v)| (key.clone(), normalize(value_type, v)))
                .filter(|(_, v)| !v.is_null())
                .collect(),
        ),
        (AttributeType::Dynamic, scalar) => to_setting(scalar).unwrap_or(Value::Null),
        (_, other) => other.clone(),
    }
}

/// Compute the plan for one resource instance.
///
/// - create (`prior` is `None`): proposed values plus defaults; computed
///   attributes are unknown (null) until the apply.
/// - destroy (`proposed` is null): planned state is null and every prior
///   attribute is listed as removed.
/// - update: computed attributes, and optional+computed attributes the
///   configuration leaves unset, carry over from prior. A change to a
///   `force_new` attribute requires replacement.
pub fn plan_change(schema: &Schema, prior: Option<&Value>, proposed: &Value) -> PlanResult {
    let get = |state: &Value, name: &str| state.get(name).cloned().unwrap_or(Value::Null);

    if proposed.is_null() {
        let changes = prior
            .map(|prior| {
                schema
                    .sorted_attributes()
                    .into_iter()
                    .filter_map(|(name, _)| {
                        let value = get(prior, name);
                        (!value.is_null()).then(|| AttributeChange::removed(name, value))
                    })
                    .collect()
            })
            .unwrap_or_default();
        return PlanResult::with_changes(Value::Null, changes, false);
    }

    let mut planned = Map::new();
    let mut changes = Vec::new();
    let mut requires_replace = false;

    for (name, attr) in schema.sorted_attributes() {
        let configured = get(proposed, name);
        let configured = if configured.is_null() {
            attr.default.clone().unwrap_or(Value::Null)
        } else {
            configured
        };

        let value = match prior {
            None if attr.is_computed_only() => Value::Null,
            None => configured,
            Some(prior) => {
                let before = get(prior, name);
                let after = if attr.is_computed_only()
                    || (attr.flags.computed && configured.is_null())
                {
                    before.clone()
                } else {
                    configured
                };
                let (b, a) = (normalize(&attr.attr_type, &before), normalize(&attr.attr_type, &after));
                match AttributeChange::between(name, &b, &a) {
                    Some(change) => {
                        requires_replace |= attr.force_new;
                        changes.push(change);
                        after
                    },
                    None => before,
                }
            },
        };

        if prior.is_none() && !value.is_null() {
            changes.push(AttributeChange::added(name, value.clone()));
        }
        planned.insert(name.to_string(), value);
    }

    if requires_replace {
        // The replacement is a new object; server-assigned values are unknown.
        for (name, attr) in schema.sorted_attributes() {
            if attr.is_computed_only() {
                planned.insert(name.to_string(), Value::Null);
            }
        }
    }

    PlanResult::with_changes(Value::Object(planned), changes, requires_replace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::Resource;
    use crate::resources::{compute_attribute, location, smart_class_parameter};
    use serde_json::json;

    fn resource_schema(resource: &dyn Resource) -> Schema {
        resource.schema()
    }

    #[test]
    fn test_plan_create() {
        let schema = resource_schema(&smart_class_parameter::SmartClassParameterResource);
        let plan = plan_change(
            &schema,
            None,
            &json!({"smart_class_parameter_id": 12, "match": "os=Debian", "value": "8080"}),
        );

        assert!(!plan.requires_replace);
        assert_eq!(plan.planned_state["id"], Value::Null);
        assert_eq!(plan.planned_state["omit"], false);
        let paths: Vec<&str> = plan.changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["match", "omit", "smart_class_parameter_id", "use_puppet_default", "value"]
        );
    }

    #[test]
    fn test_plan_update_carries_computed_values() {
        let schema = resource_schema(&location::LocationResource);
        let prior = json!({
            "id": "4",
            "name": "lyon",
            "description": null,
            "parent_id": null,
            "domain_ids": [2, 1],
            "subnet_ids": []
        });
        let plan = plan_change(&schema, Some(&prior), &json!({"name": "lyon", "domain_ids": [1, 2]}));

        assert!(!plan.has_changes());
        assert_eq!(plan.planned_state["id"], "4");
        assert_eq!(plan.planned_state["domain_ids"], json!([2, 1]));
        assert_eq!(plan.planned_state["subnet_ids"], json!([]));

        let plan = plan_change(
            &schema,
            Some(&prior),
            &json!({"name": "paris", "domain_ids": []}),
        );
        let paths: Vec<&str> = plan.changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["domain_ids", "name"]);
        assert!(!plan.requires_replace);
        assert_eq!(plan.planned_state["id"], "4");
    }

    #[test]
    fn test_plan_update_force_new() {
        let schema = resource_schema(&compute_attribute::ComputeAttributeResource);
        let prior = json!({
            "id": "11",
            "name": "small",
            "compute_profile_id": 1,
            "compute_resource_id": 2,
            "vm_attrs": {"cpus": "2"},
            "interface": [],
            "volume": []
        });

        let plan = plan_change(
            &schema,
            Some(&prior),
            &json!({"compute_profile_id": 1, "compute_resource_id": 2, "vm_attrs": {"cpus": "4"}}),
        );
        assert!(!plan.requires_replace);
        assert_eq!(plan.changes.len(), 1);
        assert_eq!(plan.planned_state["id"], "11");

        let plan = plan_change(
            &schema,
            Some(&prior),
            &json!({"compute_profile_id": 3, "compute_resource_id": 2, "vm_attrs": {"cpus": "2"}}),
        );
        assert!(plan.requires_replace);
        assert_eq!(plan.planned_state["id"], Value::Null);
    }

    #[test]
    fn test_plan_destroy() {
        let schema = resource_schema(&location::LocationResource);
        let prior = json!({"id": "4", "name": "lyon", "description": null, "domain_ids": [1]});
        let plan = plan_change(&schema, Some(&prior), &Value::Null);

        assert_eq!(plan.planned_state, Value::Null);
        let paths: Vec<&str> = plan.changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["domain_ids", "id", "name"]);
        assert!(plan.changes.iter().all(|c| c.after.is_none()));
    }

    #[test]
    fn test_set_order_is_not_a_change() {
        let set = AttributeType::set(AttributeType::Int64);
        assert_eq!(normalize(&set, &json!([3, 1])), normalize(&set, &json!([1, 3])));
        assert_eq!(normalize(&set, &json!([])), Value::Null);

        let list = AttributeType::list(AttributeType::Int64);
        assert_ne!(normalize(&list, &json!([3, 1])), normalize(&list, &json!([1, 3])));
    }

    #[test]
    fn test_settings_compare_as_read_back() {
        let schema = resource_schema(&compute_attribute::ComputeAttributeResource);
        let prior = json!({
            "id": "11",
            "name": "2 CPUs",
            "compute_profile_id": 1,
            "compute_resource_id": 2,
            "vm_attrs": {
                "cpus": "2",
                "scsi_controllers": [{"type": "ParaVirtualSCSIController", "key": 1000}]
            },
            "interface": [{"mtu": "1500", "network": "VM Network"}],
            "volume": []
        });
        let proposed = json!({
            "compute_profile_id": 1,
            "compute_resource_id": 2,
            "vm_attrs": {
                "cpus": 2,
                "scsi_controllers": [{"type": "ParaVirtualSCSIController", "key": 1000}]
            },
            "interface": [{"network": "VM Network", "mtu": 1500, "_destroy": false}]
        });

        let plan = plan_change(&schema, Some(&prior), &proposed);
        assert!(!plan.has_changes(), "{:?}", plan.changes);
        assert_eq!(plan.planned_state, prior);

        let proposed = json!({
            "compute_profile_id": 1,
            "compute_resource_id": 2,
            "vm_attrs": {"cpus": 2, "scsi_controllers": [{"type": "LsiLogic", "key": 1000}]},
            "interface": [{"network": "VM Network", "mtu": 1500}]
        });
        let plan = plan_change(&schema, Some(&prior), &proposed);
        let paths: Vec<&str> = plan.changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["vm_attrs"]);
    }

    #[tokio::test]
    async fn test_calls_before_configure_fail() {
        let provider = ForemanProvider::new();
        let err = provider
            .read(location::TYPE_NAME, json!({"id": "1"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));

        let err = provider.read("foreman_host", json!({})).await.unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }

    #[tokio::test]
    async fn test_configure_reports_invalid_settings() {
        let provider = ForemanProvider::new();
        let diagnostics = provider
            .configure(json!({"server_hostname": "", "server_protocol": "ftp"}))
            .await
            .unwrap();
        assert_eq!(diagnostics.iter().filter(|d| d.is_error()).count(), 2);
        assert!(provider.client().await.is_err());
    }

    #[test]
    fn test_metadata_lists_sorted_types() {
        let metadata = ForemanProvider::new().metadata();
        assert_eq!(
            metadata.resources,
            vec![
                "foreman_computeattribute",
                "foreman_computeprofile",
                "foreman_location",
                "foreman_puppetclass",
                "foreman_smartclassparameter"
            ]
        );
        assert_eq!(metadata.data_sources.len(), 4);
        assert!(metadata.capabilities.plan_destroy);
    }
}
