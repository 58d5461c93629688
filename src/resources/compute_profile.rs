//! `foreman_computeprofile` resource and data source.

use serde_json::{json, Value};
use tracing::info;

use super::{found, single_match, DataSource, Resource};
use crate::api::{ComputeProfile, ForemanClient};
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};
use crate::state::StateReader;

/// Type name of the resource and the data source.
pub const TYPE_NAME: &str = "foreman_computeprofile";

/// Compute profiles: named VM sizes such as `1-Small`.
pub struct ComputeProfileResource;

fn resource_schema() -> Schema {
    Schema::v0()
        .with_description("A named set of VM settings applied per compute resource")
        .with_attribute("id", Attribute::computed_string())
        .with_attribute(
            "name",
            Attribute::required_string().with_description("Name of the compute profile"),
        )
}

fn to_state(profile: &ComputeProfile) -> Value {
    json!({
        "id": profile.id.to_string(),
        "name": profile.name,
    })
}

#[async_trait::async_trait]
impl Resource for ComputeProfileResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        resource_schema()
    }

    async fn create(&self, client: &ForemanClient, planned: &Value) -> Result<Value, ProviderError> {
        let profile = ComputeProfile {
            id: 0,
            name: StateReader::new(planned).required_string("name")?,
        };
        let created = client.create_compute_profile(&profile).await?;
        info!(id = created.id, name = %created.name, "created compute profile");
        Ok(to_state(&created))
    }

    async fn read(
        &self,
        client: &ForemanClient,
        current: &Value,
    ) -> Result<Option<Value>, ProviderError> {
        let id = StateReader::new(current).id()?;
        Ok(found(client.read_compute_profile(id).await)?.map(|p| to_state(&p)))
    }

    async fn update(
        &self,
        client: &ForemanClient,
        _prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        let state = StateReader::new(planned);
        let profile = ComputeProfile {
            id: state.id()?,
            name: state.required_string("name")?,
        };
        let updated = client.update_compute_profile(&profile).await?;
        Ok(to_state(&updated))
    }

    async fn delete(&self, client: &ForemanClient, current: &Value) -> Result<(), ProviderError> {
        let id = StateReader::new(current).id()?;
        found(client.delete_compute_profile(id).await)?;
        info!(id, "deleted compute profile");
        Ok(())
    }
}

#[async_trait::async_trait]
impl DataSource for ComputeProfileResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        resource_schema().to_data_source(&["name"])
    }

    async fn read(&self, client: &ForemanClient, config: &Value) -> Result<Value, ProviderError> {
        let name = StateReader::new(config).required_string("name")?;
        let response = client.query_compute_profiles(&name).await?;
        Ok(to_state(&single_match(TYPE_NAME, response)?))
    }
}
