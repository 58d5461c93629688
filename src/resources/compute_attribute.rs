//! `foreman_computeattribute` resource.
//!
//! The VM settings of one compute profile on one compute resource. Free-form
//! settings live in `vm_attrs` and are sent back as read, nested values
//! included. Network interfaces and volumes are sets of records without
//! ids, so updates go through the set reconciler to remove the ones dropped
//! from configuration.
//!
//! Foreman has no endpoint to delete compute attributes on their own.
//! Deleting the resource only forgets it; the settings go away with their
//! compute profile.

use serde_json::{Map, Value};
use tracing::{info, warn};

use super::{found, parse_id_pair, Resource};
use crate::api::compute_attribute::{INTERFACES, VOLUMES};
use crate::api::{ComputeAttribute, ComputeAttributeChange, ForemanClient};
use crate::error::ProviderError;
use crate::reconcile::{reconcile, AttributeSet};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema};
use crate::state::{settings_value, StateReader};

/// Type name of the resource.
pub const TYPE_NAME: &str = "foreman_computeattribute";

const IMPORT_FORMAT: &str = "<compute_profile_id>/<compute_resource_id>";

/// Compute attributes of a profile/resource pair.
pub struct ComputeAttributeResource;

fn record_set(description: &str) -> Attribute {
    Attribute::new(
        AttributeType::set(AttributeType::map(AttributeType::Dynamic)),
        AttributeFlags::optional(),
    )
    .with_description(description)
}

fn resource_schema() -> Schema {
    Schema::v0()
        .with_description("Hypervisor-specific VM settings of a compute profile")
        .with_attribute("id", Attribute::computed_string())
        .with_attribute(
            "name",
            Attribute::computed_string().with_description("Summary generated by Foreman"),
        )
        .with_attribute(
            "compute_profile_id",
            Attribute::required_int64()
                .with_description("Compute profile the settings belong to")
                .with_min_value(0)
                .with_force_new(),
        )
        .with_attribute(
            "compute_resource_id",
            Attribute::required_int64()
                .with_description("Compute resource the settings apply to")
                .with_min_value(0)
                .with_force_new(),
        )
        .with_attribute(
            "vm_attrs",
            Attribute::new(
                AttributeType::map(AttributeType::Dynamic),
                AttributeFlags::optional(),
            )
            .with_description("VM settings such as cpus, memory_mb or scsi_controllers"),
        )
        .with_attribute("interface", record_set("Network interfaces"))
        .with_attribute("volume", record_set("Storage volumes"))
}

/// Desired interface and volume sets from state.
fn collections(state: &StateReader<'_>) -> (AttributeSet, AttributeSet) {
    (state.record_set("interface"), state.record_set("volume"))
}

fn to_state(attribute: &ComputeAttribute) -> Value {
    let mut state = Map::new();
    state.insert("id".into(), Value::String(attribute.id.to_string()));
    state.insert("name".into(), Value::String(attribute.name.clone()));
    state.insert(
        "compute_profile_id".into(),
        Value::from(attribute.compute_profile_id),
    );
    state.insert(
        "compute_resource_id".into(),
        Value::from(attribute.compute_resource_id),
    );
    state.insert("vm_attrs".into(), settings_value(&attribute.vm_attrs));
    state.insert("interface".into(), attribute.interfaces.to_value());
    state.insert("volume".into(), attribute.volumes.to_value());
    Value::Object(state)
}

/// Fill in the owning ids when the response leaves them out.
fn with_owner(mut attribute: ComputeAttribute, change: &ComputeAttributeChange) -> ComputeAttribute {
    if attribute.compute_profile_id == 0 {
        attribute.compute_profile_id = change.compute_profile_id;
    }
    if attribute.compute_resource_id == 0 {
        attribute.compute_resource_id = change.compute_resource_id;
    }
    attribute
}

fn change_for(
    planned: &Value,
    prior: Option<&Value>,
) -> Result<ComputeAttributeChange, ProviderError> {
    let state = StateReader::new(planned);
    let (interfaces, volumes) = collections(&state);
    let (prior_interfaces, prior_volumes) = prior
        .map(|p| collections(&StateReader::new(p)))
        .unwrap_or_default();

    Ok(ComputeAttributeChange::new(
        state.required_i64("compute_profile_id")?,
        state.required_i64("compute_resource_id")?,
        &state.settings("vm_attrs"),
    )
    .with_collection(INTERFACES, &reconcile(&prior_interfaces, &interfaces))
    .with_collection(VOLUMES, &reconcile(&prior_volumes, &volumes)))
}

#[async_trait::async_trait]
impl Resource for ComputeAttributeResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        resource_schema()
    }

    async fn create(&self, client: &ForemanClient, planned: &Value) -> Result<Value, ProviderError> {
        let change = change_for(planned, None)?;
        let created = with_owner(client.create_compute_attribute(&change).await?, &change);
        info!(
            id = created.id,
            compute_profile_id = created.compute_profile_id,
            compute_resource_id = created.compute_resource_id,
            "created compute attributes"
        );
        Ok(to_state(&created))
    }

    async fn read(
        &self,
        client: &ForemanClient,
        current: &Value,
    ) -> Result<Option<Value>, ProviderError> {
        let state = StateReader::new(current);
        let profile_id = state.required_i64("compute_profile_id")?;
        let resource_id = state.required_i64("compute_resource_id")?;
        Ok(found(client.read_compute_attribute(profile_id, resource_id).await)?
            .map(|a| to_state(&a)))
    }

    async fn update(
        &self,
        client: &ForemanClient,
        prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        let id = StateReader::new(prior).id()?;
        let change = change_for(planned, Some(prior))?;
        let updated = with_owner(client.update_compute_attribute(id, &change).await?, &change);
        info!(id, "updated compute attributes");
        Ok(to_state(&updated))
    }

    async fn delete(&self, _client: &ForemanClient, current: &Value) -> Result<(), ProviderError> {
        warn!(
            id = ?current.get("id"),
            "Foreman cannot delete compute attributes; removing them from state only"
        );
        Ok(())
    }

    async fn import(&self, client: &ForemanClient, id: &str) -> Result<Option<Value>, ProviderError> {
        let (profile_id, resource_id) = parse_id_pair(id, IMPORT_FORMAT)?;
        Ok(found(client.read_compute_attribute(profile_id, resource_id).await)?
            .map(|a| to_state(&a)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn planned() -> Value {
        json!({
            "id": "11",
            "compute_profile_id": 1,
            "compute_resource_id": 2,
            "vm_attrs": {"cpus": "2", "memory_mb": "4096"},
            "interface": [{"network": "VM Network", "type": "VirtualVmxnet3"}],
            "volume": null
        })
    }

    #[test]
    fn test_create_change_has_no_removals() {
        let change = change_for(&planned(), None).unwrap();
        assert_eq!(change.compute_profile_id, 1);
        assert_eq!(change.compute_resource_id, 2);
        assert_eq!(change.vm_attrs["cpus"], "2");
        assert_eq!(
            change.vm_attrs[INTERFACES],
            json!({"0": {"network": "VM Network", "type": "VirtualVmxnet3"}})
        );
        assert!(!change.vm_attrs.contains_key(VOLUMES));
    }

    #[test]
    fn test_update_change_marks_dropped_records() {
        let prior = json!({
            "id": "11",
            "compute_profile_id": 1,
            "compute_resource_id": 2,
            "interface": [
                {"network": "VM Network", "type": "VirtualVmxnet3"},
                {"network": "Backup", "type": "VirtualE1000"}
            ],
            "volume": [{"size_gb": "20"}]
        });
        let change = change_for(&planned(), Some(&prior)).unwrap();

        assert_eq!(
            change.vm_attrs[INTERFACES],
            json!({
                "0": {"network": "VM Network", "type": "VirtualVmxnet3"},
                "1": {"network": "Backup", "type": "VirtualE1000", "_destroy": true}
            })
        );
        assert_eq!(
            change.vm_attrs[VOLUMES],
            json!({"0": {"size_gb": "20", "_destroy": true}})
        );
    }

    #[test]
    fn test_nested_settings_survive_read_and_update() {
        let attribute: ComputeAttribute = serde_json::from_value(json!({
            "id": 11,
            "compute_profile_id": 1,
            "compute_resource_id": 2,
            "vm_attrs": {
                "cpus": 2,
                "scsi_controllers": [{"type": "ParaVirtualSCSIController", "key": 1000}],
                "volumes_attributes": {
                    "0": {"size_gb": 20, "datastore": {"name": "ssd", "id": 4}}
                }
            }
        }))
        .unwrap();
        let state = to_state(&attribute);
        let change = change_for(&state, Some(&state)).unwrap();

        assert!(change.vm_attrs["scsi_controllers"].is_array());
        assert_eq!(
            change.vm_attrs["scsi_controllers"],
            json!([{"type": "ParaVirtualSCSIController", "key": 1000}])
        );
        assert_eq!(change.vm_attrs["cpus"], "2");
        assert_eq!(
            change.vm_attrs[VOLUMES],
            json!({"0": {"size_gb": "20", "datastore": {"name": "ssd", "id": 4}}})
        );
    }

    #[test]
    fn test_configured_marker_does_not_drop_record() {
        let planned = json!({
            "compute_profile_id": 1,
            "compute_resource_id": 2,
            "interface": [{"network": "VM Network", "_destroy": "true"}]
        });
        let change = change_for(&planned, None).unwrap();

        assert_eq!(
            change.vm_attrs.get(INTERFACES),
            Some(&json!({"0": {"network": "VM Network"}}))
        );
    }

    #[test]
    fn test_state_round_trip_through_reader() {
        let attribute: ComputeAttribute = serde_json::from_value(json!({
            "id": 11,
            "name": "2 CPUs and 4096 MB memory",
            "compute_resource_id": 2,
            "vm_attrs": {
                "cpus": 2,
                "interfaces_attributes": {"0": {"network": "VM Network"}}
            }
        }))
        .unwrap();
        let change = change_for(&planned(), None).unwrap();
        let state = to_state(&with_owner(attribute, &change));

        assert_eq!(state["compute_profile_id"], 1);
        assert_eq!(state["vm_attrs"], json!({"cpus": "2"}));
        assert_eq!(state["interface"], json!([{"network": "VM Network"}]));
        assert_eq!(state["volume"], json!([]));
    }
}
