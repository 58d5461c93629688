//! `foreman_puppetclass` resource and data source.

use serde_json::{json, Value};
use tracing::info;

use super::{found, single_match, DataSource, Resource};
use crate::api::{ForemanClient, PuppetClass};
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};
use crate::state::StateReader;

/// Type name of the resource and the data source.
pub const TYPE_NAME: &str = "foreman_puppetclass";

/// Puppet classes known to Foreman.
pub struct PuppetClassResource;

fn resource_schema() -> Schema {
    Schema::v0()
        .with_description("A Puppet class that can be assigned to hosts and host groups")
        .with_attribute("id", Attribute::computed_string())
        .with_attribute(
            "name",
            Attribute::required_string().with_description("Fully qualified class name, e.g. ntp::config"),
        )
}

fn to_state(class: &PuppetClass) -> Value {
    json!({
        "id": class.id.to_string(),
        "name": class.name,
    })
}

#[async_trait::async_trait]
impl Resource for PuppetClassResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        resource_schema()
    }

    async fn create(&self, client: &ForemanClient, planned: &Value) -> Result<Value, ProviderError> {
        let class = PuppetClass {
            id: 0,
            name: StateReader::new(planned).required_string("name")?,
        };
        let created = client.create_puppet_class(&class).await?;
        info!(id = created.id, name = %created.name, "created puppet class");
        Ok(to_state(&created))
    }

    async fn read(
        &self,
        client: &ForemanClient,
        current: &Value,
    ) -> Result<Option<Value>, ProviderError> {
        let id = StateReader::new(current).id()?;
        Ok(found(client.read_puppet_class(id).await)?.map(|c| to_state(&c)))
    }

    async fn update(
        &self,
        client: &ForemanClient,
        _prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        let state = StateReader::new(planned);
        let class = PuppetClass {
            id: state.id()?,
            name: state.required_string("name")?,
        };
        let updated = client.update_puppet_class(&class).await?;
        Ok(to_state(&updated))
    }

    async fn delete(&self, client: &ForemanClient, current: &Value) -> Result<(), ProviderError> {
        let id = StateReader::new(current).id()?;
        found(client.delete_puppet_class(id).await)?;
        info!(id, "deleted puppet class");
        Ok(())
    }
}

#[async_trait::async_trait]
impl DataSource for PuppetClassResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        resource_schema().to_data_source(&["name"])
    }

    async fn read(&self, client: &ForemanClient, config: &Value) -> Result<Value, ProviderError> {
        let name = StateReader::new(config).required_string("name")?;
        let response = client.query_puppet_classes(&name).await?;
        Ok(to_state(&single_match(TYPE_NAME, response)?))
    }
}
