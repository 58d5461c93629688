//! Smart class parameter override values
//! (`/api/smart_class_parameters/:id/override_values`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::client::{wrap, ForemanClient};
use super::decode::Fields;
use super::error::ForemanError;
use super::query::{search_expression, QueryResponse};

/// An override of a smart class parameter for hosts matching `matcher`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct OverrideValue {
    /// Server-assigned id
    #[serde(skip_serializing)]
    pub id: i64,
    /// Parent smart class parameter
    #[serde(skip_serializing)]
    pub smart_class_parameter_id: i64,
    /// Match condition, e.g. `fqdn=web01.example.com`
    #[serde(rename = "match")]
    pub matcher: String,
    /// Override value as Foreman renders it
    pub value: String,
    /// Let Puppet use the class default instead of `value`
    pub use_puppet_default: bool,
    /// Omit the parameter from the ENC output
    pub omit: bool,
}

impl From<Value> for OverrideValue {
    fn from(value: Value) -> Self {
        let f = Fields::new(&value);
        Self {
            id: f.i64("id"),
            smart_class_parameter_id: f.i64("smart_class_parameter_id"),
            matcher: f.string("match"),
            // Typed parameters come back as numbers, booleans or structures.
            value: f.text("value"),
            use_puppet_default: f.bool("use_puppet_default"),
            omit: f.bool("omit"),
        }
    }
}

fn collection(parameter_id: i64) -> String {
    format!("smart_class_parameters/{}/override_values", parameter_id)
}

fn member(parameter_id: i64, id: i64) -> String {
    format!("{}/{}", collection(parameter_id), id)
}

impl ForemanClient {
    /// Create an override value
    pub async fn create_override_value(
        &self,
        value: &OverrideValue,
    ) -> Result<OverrideValue, ForemanError> {
        let mut created: OverrideValue = self
            .post(
                &collection(value.smart_class_parameter_id),
                &wrap("override_value", value)?,
            )
            .await?;
        created.smart_class_parameter_id = value.smart_class_parameter_id;
        Ok(created)
    }

    /// Read an override value
    pub async fn read_override_value(
        &self,
        parameter_id: i64,
        id: i64,
    ) -> Result<OverrideValue, ForemanError> {
        let mut value: OverrideValue = self.get(&member(parameter_id, id)).await?;
        value.smart_class_parameter_id = parameter_id;
        Ok(value)
    }

    /// Update an override value in place
    pub async fn update_override_value(
        &self,
        value: &OverrideValue,
    ) -> Result<OverrideValue, ForemanError> {
        let mut updated: OverrideValue = self
            .put(
                &member(value.smart_class_parameter_id, value.id),
                &wrap("override_value", value)?,
            )
            .await?;
        updated.smart_class_parameter_id = value.smart_class_parameter_id;
        Ok(updated)
    }

    /// Delete an override value
    pub async fn delete_override_value(&self, parameter_id: i64, id: i64) -> Result<(), ForemanError> {
        self.delete(&member(parameter_id, id)).await
    }

    /// Search a parameter's override values by exact match condition
    pub async fn query_override_values(
        &self,
        parameter_id: i64,
        matcher: &str,
    ) -> Result<QueryResponse<OverrideValue>, ForemanError> {
        let mut response: QueryResponse<OverrideValue> = self
            .search(&collection(parameter_id), &search_expression("match", matcher))
            .await?;
        for value in &mut response.results {
            value.smart_class_parameter_id = parameter_id;
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_uses_match_key() {
        let value = OverrideValue {
            id: 1,
            smart_class_parameter_id: 12,
            matcher: "fqdn=web01".to_string(),
            value: "8080".to_string(),
            use_puppet_default: false,
            omit: true,
        };
        assert_eq!(
            wrap("override_value", &value).unwrap(),
            json!({"override_value": {
                "match": "fqdn=web01",
                "value": "8080",
                "use_puppet_default": false,
                "omit": true
            }})
        );
    }

    #[test]
    fn test_decode_typed_values() {
        let value: OverrideValue = serde_json::from_value(json!({
            "id": 7,
            "match": "hostgroup=web",
            "value": 8080,
            "omit": "true"
        }))
        .unwrap();
        assert_eq!(value.id, 7);
        assert_eq!(value.matcher, "hostgroup=web");
        assert_eq!(value.value, "8080");
        assert!(value.omit);
        assert!(!value.use_puppet_default);

        let value: OverrideValue =
            serde_json::from_value(json!({"match": 3, "value": {"a": [1]}})).unwrap();
        assert_eq!(value.matcher, "");
        assert_eq!(value.value, r#"{"a":[1]}"#);
    }

    #[test]
    fn test_paths() {
        assert_eq!(collection(12), "smart_class_parameters/12/override_values");
        assert_eq!(member(12, 3), "smart_class_parameters/12/override_values/3");
    }
}
