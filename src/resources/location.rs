//! `foreman_location` resource and data source.

use serde_json::{Map, Value};
use tracing::info;

use super::{found, single_match, DataSource, Resource};
use crate::api::{ForemanClient, Location};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema};
use crate::state::{int_set_value, StateReader};

/// Type name of the resource and the data source.
pub const TYPE_NAME: &str = "foreman_location";

/// Locations with their associated infrastructure.
pub struct LocationResource;

fn id_set(description: &str) -> Attribute {
    Attribute::new(
        AttributeType::set(AttributeType::Int64),
        AttributeFlags::optional_computed(),
    )
    .with_description(description)
}

fn resource_schema() -> Schema {
    Schema::v0()
        .with_description("A Foreman location: a physical or logical place hosts are grouped by")
        .with_attribute("id", Attribute::computed_string())
        .with_attribute(
            "name",
            Attribute::required_string().with_description("Name of the location"),
        )
        .with_attribute("description", Attribute::optional_string())
        .with_attribute(
            "parent_id",
            Attribute::optional_int64()
                .with_description("Id of the parent location")
                .with_min_value(1),
        )
        .with_attribute("realm_ids", id_set("Realms available in this location"))
        .with_attribute("compute_resource_ids", id_set("Compute resources available in this location"))
        .with_attribute("domain_ids", id_set("Domains available in this location"))
        .with_attribute("subnet_ids", id_set("Subnets available in this location"))
        .with_attribute("environment_ids", id_set("Puppet environments available in this location"))
        .with_attribute("hostgroup_ids", id_set("Host groups available in this location"))
        .with_attribute(
            "provisioning_template_ids",
            id_set("Provisioning templates available in this location"),
        )
        .with_attribute("smart_proxy_ids", id_set("Smart proxies serving this location"))
        .with_attribute("user_ids", id_set("Users with access to this location"))
}

/// Build the request model from planned state.
///
/// Omitted fields mean "leave unchanged" to Foreman, so a list that was
/// non-empty in `prior` and is empty now is sent as an explicit empty list,
/// a dropped description as `""` and a dropped parent as `null`.
fn build(planned: &Value, prior: Option<&Value>) -> Result<Location, ProviderError> {
    let state = StateReader::new(planned);
    let prior = prior.map(StateReader::new);

    let mut location = Location {
        id: if prior.is_some() { state.id()? } else { 0 },
        name: state.required_string("name")?,
        description: state.string("description"),
        parent_id: state.i64("parent_id").map(Some),
        ..Default::default()
    };
    if location.description.is_none() && prior.is_some_and(|p| p.is_set("description")) {
        location.description = Some(String::new());
    }
    if location.parent_id.is_none() && prior.is_some_and(|p| p.is_set("parent_id")) {
        location.parent_id = Some(None);
    }

    for (key, slot) in location.associations_mut() {
        let was_set = prior
            .and_then(|p| p.int_set(key))
            .is_some_and(|ids| !ids.is_empty());
        *slot = match state.int_set(key) {
            Some(ids) if !ids.is_empty() => Some(ids),
            _ if was_set => Some(Vec::new()),
            _ => None,
        };
    }
    Ok(location)
}

fn to_state(location: &Location) -> Value {
    let mut state = Map::new();
    state.insert("id".into(), Value::String(location.id.to_string()));
    state.insert("name".into(), Value::String(location.name.clone()));
    state.insert(
        "description".into(),
        location
            .description
            .clone()
            .filter(|d| !d.is_empty())
            .map(Value::String)
            .unwrap_or(Value::Null),
    );
    state.insert(
        "parent_id".into(),
        location.parent_id.flatten().map(Value::from).unwrap_or(Value::Null),
    );
    for (key, ids) in location.associations() {
        state.insert(key.into(), int_set_value(ids.unwrap_or_default()));
    }
    Value::Object(state)
}

#[async_trait::async_trait]
impl Resource for LocationResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        resource_schema()
    }

    async fn create(&self, client: &ForemanClient, planned: &Value) -> Result<Value, ProviderError> {
        let location = build(planned, None)?;
        let created = client.create_location(&location).await?;
        info!(id = created.id, name = %created.name, "created location");
        Ok(to_state(&created))
    }

    async fn read(
        &self,
        client: &ForemanClient,
        current: &Value,
    ) -> Result<Option<Value>, ProviderError> {
        let id = StateReader::new(current).id()?;
        Ok(found(client.read_location(id).await)?.map(|l| to_state(&l)))
    }

    async fn update(
        &self,
        client: &ForemanClient,
        prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        let location = build(planned, Some(prior))?;
        let updated = client.update_location(&location).await?;
        info!(id = updated.id, "updated location");
        Ok(to_state(&updated))
    }

    async fn delete(&self, client: &ForemanClient, current: &Value) -> Result<(), ProviderError> {
        let id = StateReader::new(current).id()?;
        found(client.delete_location(id).await)?;
        info!(id, "deleted location");
        Ok(())
    }
}

#[async_trait::async_trait]
impl DataSource for LocationResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        resource_schema().to_data_source(&["name"])
    }

    async fn read(&self, client: &ForemanClient, config: &Value) -> Result<Value, ProviderError> {
        let name = StateReader::new(config).required_string("name")?;
        let response = client.query_locations(&name).await?;
        Ok(to_state(&single_match(TYPE_NAME, response)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_for_create_omits_empty_sets() {
        let location = build(
            &json!({"name": "lyon", "domain_ids": [2, 1], "subnet_ids": [], "realm_ids": null}),
            None,
        )
        .unwrap();

        assert_eq!(location.id, 0);
        assert_eq!(location.domain_ids, Some(vec![1, 2]));
        assert_eq!(location.subnet_ids, None);
        assert_eq!(location.realm_ids, None);
    }

    #[test]
    fn test_build_for_update_clears_emptied_sets() {
        let prior = json!({
            "id": "4",
            "name": "lyon",
            "description": "HQ",
            "domain_ids": [1, 2],
            "user_ids": []
        });
        let planned = json!({"id": "4", "name": "lyon", "domain_ids": [], "user_ids": []});
        let location = build(&planned, Some(&prior)).unwrap();

        assert_eq!(location.id, 4);
        assert_eq!(location.domain_ids, Some(vec![]));
        assert_eq!(location.user_ids, None);
        assert_eq!(location.description.as_deref(), Some(""));

        let body = serde_json::to_value(&location).unwrap();
        assert_eq!(body, json!({"name": "lyon", "description": "", "domain_ids": []}));
    }

    #[test]
    fn test_build_for_update_detaches_dropped_parent() {
        let prior = json!({"id": "4", "name": "lyon", "parent_id": 2});
        let planned = json!({"id": "4", "name": "lyon", "parent_id": null});
        let location = build(&planned, Some(&prior)).unwrap();

        assert_eq!(location.parent_id, Some(None));
        let body = serde_json::to_value(&location).unwrap();
        assert_eq!(body, json!({"name": "lyon", "parent_id": null}));

        let location = build(&json!({"id": "4", "name": "lyon", "parent_id": 3}), Some(&prior))
            .unwrap();
        assert_eq!(location.parent_id, Some(Some(3)));

        let location = build(&json!({"name": "lyon"}), None).unwrap();
        assert_eq!(location.parent_id, None);
        let body = serde_json::to_value(&location).unwrap();
        assert_eq!(body, json!({"name": "lyon"}));
    }

    #[test]
    fn test_state_lists_every_association() {
        let location = Location {
            id: 4,
            name: "lyon".into(),
            description: Some(String::new()),
            domain_ids: Some(vec![1]),
            ..Default::default()
        };
        let state = to_state(&location);

        assert_eq!(state["id"], "4");
        assert_eq!(state["description"], Value::Null);
        assert_eq!(state["domain_ids"], json!([1]));
        assert_eq!(state["hostgroup_ids"], json!([]));
        assert_eq!(state.as_object().unwrap().len(), 13);
    }

    #[test]
    fn test_data_source_schema() {
        let schema = DataSource::schema(&LocationResource);
        assert!(schema.attribute("name").unwrap().flags.required);
        assert!(schema.attribute("domain_ids").unwrap().is_computed_only());
    }
}
