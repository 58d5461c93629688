//! Compute attributes: VM settings of one compute profile on one compute
//! resource.
//!
//! Foreman exposes them only through their profile. They are written at
//! `compute_profiles/:profile/compute_resources/:resource/compute_attributes`
//! and read back from the profile's `compute_attributes` list.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::client::{wrap, ForemanClient};
use super::decode::{to_setting, Fields};
use super::error::ForemanError;
use crate::reconcile::{AttributeSet, Patch};

/// `vm_attrs` key holding network interfaces.
pub const INTERFACES: &str = "interfaces_attributes";
/// `vm_attrs` key holding storage volumes.
pub const VOLUMES: &str = "volumes_attributes";

/// Compute attributes as read from Foreman.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub struct ComputeAttribute {
    /// Server-assigned id
    pub id: i64,
    /// Display name generated by Foreman
    pub name: String,
    /// Owning compute profile
    pub compute_profile_id: i64,
    /// Compute resource the settings apply to
    pub compute_resource_id: i64,
    /// Other VM settings (cpus, memory_mb, scsi_controllers, ...). Scalars
    /// are held as text, nested settings as JSON.
    pub vm_attrs: BTreeMap<String, Value>,
    /// Network interfaces
    pub interfaces: AttributeSet,
    /// Storage volumes
    pub volumes: AttributeSet,
}

impl From<Value> for ComputeAttribute {
    fn from(value: Value) -> Self {
        let f = Fields::new(&value);
        let mut attribute = Self {
            id: f.i64("id"),
            name: f.string("name"),
            compute_profile_id: f.i64("compute_profile_id"),
            compute_resource_id: f.i64("compute_resource_id"),
            ..Default::default()
        };

        // The show view renames vm_attrs to "attributes".
        let vm_attrs = f.object("vm_attrs").or_else(|| f.object("attributes"));
        for (key, value) in vm_attrs.into_iter().flatten() {
            match key.as_str() {
                INTERFACES => attribute.interfaces = AttributeSet::from_value(value),
                VOLUMES => attribute.volumes = AttributeSet::from_value(value),
                _ => {
                    if let Some(value) = to_setting(value) {
                        attribute.vm_attrs.insert(key.clone(), value);
                    }
                },
            }
        }
        attribute
    }
}

/// Body of a compute attribute create or update.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComputeAttributeChange {
    /// Owning compute profile
    #[serde(skip)]
    pub compute_profile_id: i64,
    /// Compute resource the settings apply to
    #[serde(skip)]
    pub compute_resource_id: i64,
    /// Settings plus reconciled interface and volume collections
    pub vm_attrs: Map<String, Value>,
}

impl ComputeAttributeChange {
    /// Start a change carrying the VM settings as they are.
    pub fn new(
        compute_profile_id: i64,
        compute_resource_id: i64,
        settings: &BTreeMap<String, Value>,
    ) -> Self {
        Self {
            compute_profile_id,
            compute_resource_id,
            vm_attrs: settings
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Add a reconciled collection. Empty patches are left out.
    pub fn with_collection(mut self, key: &str, patch: &Patch) -> Self {
        if !patch.is_empty() {
            self.vm_attrs.insert(key.to_string(), patch.to_indexed());
        }
        self
    }

    fn collection_path(&self) -> String {
        format!(
            "compute_profiles/{}/compute_resources/{}/compute_attributes",
            self.compute_profile_id, self.compute_resource_id
        )
    }
}

impl ForemanClient {
    /// Create compute attributes for a profile/resource pair
    pub async fn create_compute_attribute(
        &self,
        change: &ComputeAttributeChange,
    ) -> Result<ComputeAttribute, ForemanError> {
        self.post(&change.collection_path(), &wrap("compute_attribute", change)?)
            .await
    }

    /// Read the compute attributes of a profile/resource pair
    pub async fn read_compute_attribute(
        &self,
        compute_profile_id: i64,
        compute_resource_id: i64,
    ) -> Result<ComputeAttribute, ForemanError> {
        let profile: Value = self
            .get(&format!("compute_profiles/{}", compute_profile_id))
            .await?;
        Fields::new(&profile)
            .get("compute_attributes")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .map(|entry| ComputeAttribute::from(entry.clone()))
            .find(|attribute| attribute.compute_resource_id == compute_resource_id)
            .map(|mut attribute| {
                attribute.compute_profile_id = compute_profile_id;
                attribute
            })
            .ok_or_else(|| {
                ForemanError::NotFound(format!(
                    "compute profile {} has no compute attributes for compute resource {}",
                    compute_profile_id, compute_resource_id
                ))
            })
    }

    /// Update existing compute attributes
    pub async fn update_compute_attribute(
        &self,
        id: i64,
        change: &ComputeAttributeChange,
    ) -> Result<ComputeAttribute, ForemanError> {
        self.put(
            &format!("{}/{}", change.collection_path(), id),
            &wrap("compute_attribute", change)?,
        )
        .await
    }
}
