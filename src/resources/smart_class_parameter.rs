//! `foreman_smartclassparameter` resource and data source.
//!
//! Each instance is one override value of a smart class parameter: the value
//! Puppet receives for hosts matching `match`. Instances are imported as
//! `<smart_class_parameter_id>/<id>`.

use serde_json::{json, Value};
use tracing::info;

use super::{found, parse_id_pair, single_match, DataSource, Resource};
use crate::api::{ForemanClient, OverrideValue};
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};
use crate::state::StateReader;

/// Type name of the resource and the data source.
pub const TYPE_NAME: &str = "foreman_smartclassparameter";

const IMPORT_FORMAT: &str = "<smart_class_parameter_id>/<id>";

/// Override values of smart class parameters.
pub struct SmartClassParameterResource;

fn resource_schema() -> Schema {
    Schema::v0()
        .with_description("An override value of a Puppet smart class parameter")
        .with_attribute("id", Attribute::computed_string())
        .with_attribute(
            "smart_class_parameter_id",
            Attribute::required_int64()
                .with_description("Id of the smart class parameter to override")
                .with_min_value(1)
                .with_force_new(),
        )
        .with_attribute(
            "match",
            Attribute::required_string()
                .with_description("Host match condition, e.g. fqdn=web01.example.com"),
        )
        .with_attribute(
            "value",
            Attribute::required_string().with_description("Value for matching hosts"),
        )
        .with_attribute(
            "use_puppet_default",
            Attribute::optional_bool()
                .with_description("Use the class default instead of value")
                .with_default(Value::Bool(false)),
        )
        .with_attribute(
            "omit",
            Attribute::optional_bool()
                .with_description("Leave the parameter out of the ENC output")
                .with_default(Value::Bool(false)),
        )
}

fn build(planned: &Value) -> Result<OverrideValue, ProviderError> {
    let state = StateReader::new(planned);
    Ok(OverrideValue {
        id: 0,
        smart_class_parameter_id: state.required_i64("smart_class_parameter_id")?,
        matcher: state.required_string("match")?,
        value: state.required_string("value")?,
        use_puppet_default: state.bool("use_puppet_default"),
        omit: state.bool("omit"),
    })
}

fn to_state(value: &OverrideValue) -> Value {
    json!({
        "id": value.id.to_string(),
        "smart_class_parameter_id": value.smart_class_parameter_id,
        "match": value.matcher,
        "value": value.value,
        "use_puppet_default": value.use_puppet_default,
        "omit": value.omit,
    })
}

/// Parameter and override ids of an existing instance.
fn ids(current: &Value) -> Result<(i64, i64), ProviderError> {
    let state = StateReader::new(current);
    Ok((state.required_i64("smart_class_parameter_id")?, state.id()?))
}

#[async_trait::async_trait]
impl Resource for SmartClassParameterResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        resource_schema()
    }

    async fn create(&self, client: &ForemanClient, planned: &Value) -> Result<Value, ProviderError> {
        let value = build(planned)?;
        let created = client.create_override_value(&value).await?;
        info!(
            id = created.id,
            smart_class_parameter_id = created.smart_class_parameter_id,
            "created override value"
        );
        Ok(to_state(&created))
    }

    async fn read(
        &self,
        client: &ForemanClient,
        current: &Value,
    ) -> Result<Option<Value>, ProviderError> {
        let (parameter_id, id) = ids(current)?;
        Ok(found(client.read_override_value(parameter_id, id).await)?.map(|v| to_state(&v)))
    }

    async fn update(
        &self,
        client: &ForemanClient,
        _prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        let mut value = build(planned)?;
        value.id = StateReader::new(planned).id()?;
        let updated = client.update_override_value(&value).await?;
        info!(
            id = updated.id,
            smart_class_parameter_id = value.smart_class_parameter_id,
            "updated override value"
        );
        Ok(to_state(&updated))
    }

    async fn delete(&self, client: &ForemanClient, current: &Value) -> Result<(), ProviderError> {
        let (parameter_id, id) = ids(current)?;
        found(client.delete_override_value(parameter_id, id).await)?;
        info!(id, smart_class_parameter_id = parameter_id, "deleted override value");
        Ok(())
    }

    async fn import(&self, client: &ForemanClient, id: &str) -> Result<Option<Value>, ProviderError> {
        let (parameter_id, id) = parse_id_pair(id, IMPORT_FORMAT)?;
        Ok(found(client.read_override_value(parameter_id, id).await)?.map(|v| to_state(&v)))
    }
}

#[async_trait::async_trait]
impl DataSource for SmartClassParameterResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        resource_schema().to_data_source(&["smart_class_parameter_id", "match"])
    }

    async fn read(&self, client: &ForemanClient, config: &Value) -> Result<Value, ProviderError> {
        let state = StateReader::new(config);
        let parameter_id = state.required_i64("smart_class_parameter_id")?;
        let matcher = state.required_string("match")?;
        let response = client.query_override_values(parameter_id, &matcher).await?;
        Ok(to_state(&single_match(TYPE_NAME, response)?))
    }
}
