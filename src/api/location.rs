//! Locations (`/api/locations`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::client::{wrap, ForemanClient};
use super::decode::Fields;
use super::error::ForemanError;
use super::query::{search_expression, QueryResponse};

const LOCATIONS: &str = "locations";

/// A Foreman location and the objects associated with it.
///
/// Association lists and `parent_id` are `None` when they should be left
/// untouched on update. `Some(vec![])` clears a list and `Some(None)`
/// detaches the location from its parent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct Location {
    /// Server-assigned id
    #[serde(skip_serializing)]
    pub id: i64,
    /// Location name
    pub name: String,
    /// Free-form description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Parent location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Option<i64>>,
    /// Associated realms
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realm_ids: Option<Vec<i64>>,
    /// Associated compute resources
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compute_resource_ids: Option<Vec<i64>>,
    /// Associated domains
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_ids: Option<Vec<i64>>,
    /// Associated subnets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_ids: Option<Vec<i64>>,
    /// Associated Puppet environments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_ids: Option<Vec<i64>>,
    /// Associated host groups
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostgroup_ids: Option<Vec<i64>>,
    /// Associated provisioning templates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_template_ids: Option<Vec<i64>>,
    /// Associated smart proxies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smart_proxy_ids: Option<Vec<i64>>,
    /// Associated users
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_ids: Option<Vec<i64>>,
}

impl From<Value> for Location {
    fn from(value: Value) -> Self {
        let f = Fields::new(&value);
        Self {
            id: f.i64("id"),
            name: f.string("name"),
            description: f.opt_string("description"),
            parent_id: f.opt_i64("parent_id").map(Some),
            realm_ids: Some(f.ids(&["realm_ids", "realms"])),
            compute_resource_ids: Some(f.ids(&["compute_resource_ids", "compute_resources"])),
            domain_ids: Some(f.ids(&["domain_ids", "domains"])),
            subnet_ids: Some(f.ids(&["subnet_ids", "subnets"])),
            environment_ids: Some(f.ids(&["environment_ids", "environments"])),
            hostgroup_ids: Some(f.ids(&["hostgroup_ids", "hostgroups"])),
            provisioning_template_ids: Some(
                f.ids(&["provisioning_template_ids", "provisioning_templates"]),
            ),
            smart_proxy_ids: Some(f.ids(&["smart_proxy_ids", "smart_proxies"])),
            user_ids: Some(f.ids(&["user_ids", "users"])),
        }
    }
}

impl Location {
    /// Association lists keyed by their `*_ids` attribute name.
    pub fn associations(&self) -> [(&'static str, Option<&[i64]>); 9] {
        [
            ("realm_ids", self.realm_ids.as_deref()),
            ("compute_resource_ids", self.compute_resource_ids.as_deref()),
            ("domain_ids", self.domain_ids.as_deref()),
            ("subnet_ids", self.subnet_ids.as_deref()),
            ("environment_ids", self.environment_ids.as_deref()),
            ("hostgroup_ids", self.hostgroup_ids.as_deref()),
            ("provisioning_template_ids", self.provisioning_template_ids.as_deref()),
            ("smart_proxy_ids", self.smart_proxy_ids.as_deref()),
            ("user_ids", self.user_ids.as_deref()),
        ]
    }

    /// Mutable association lists keyed by their `*_ids` attribute name.
    pub fn associations_mut(&mut self) -> [(&'static str, &mut Option<Vec<i64>>); 9] {
        [
            ("realm_ids", &mut self.realm_ids),
            ("compute_resource_ids", &mut self.compute_resource_ids),
            ("domain_ids", &mut self.domain_ids),
            ("subnet_ids", &mut self.subnet_ids),
            ("environment_ids", &mut self.environment_ids),
            ("hostgroup_ids", &mut self.hostgroup_ids),
            ("provisioning_template_ids", &mut self.provisioning_template_ids),
            ("smart_proxy_ids", &mut self.smart_proxy_ids),
            ("user_ids", &mut self.user_ids),
        ]
    }
}

impl ForemanClient {
    /// Create a location
    pub async fn create_location(&self, location: &Location) -> Result<Location, ForemanError> {
        self.post(LOCATIONS, &wrap("location", location)?).await
    }

    /// Read a location by id
    pub async fn read_location(&self, id: i64) -> Result<Location, ForemanError> {
        self.get(&format!("{}/{}", LOCATIONS, id)).await
    }

    /// Update a location in place
    pub async fn update_location(&self, location: &Location) -> Result<Location, ForemanError> {
        self.put(
            &format!("{}/{}", LOCATIONS, location.id),
            &wrap("location", location)?,
        )
        .await
    }

    /// Delete a location
    pub async fn delete_location(&self, id: i64) -> Result<(), ForemanError> {
        self.delete(&format!("{}/{}", LOCATIONS, id)).await
    }

    /// Search locations by exact name
    pub async fn query_locations(&self, name: &str) -> Result<QueryResponse<Location>, ForemanError> {
        self.search(LOCATIONS, &search_expression("name", name)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_nested_associations() {
        let location: Location = serde_json::from_value(json!({
            "id": 4,
            "name": "dc1",
            "title": "dc1",
            "description": null,
            "realms": [],
            "domains": [{"id": 2, "name": "example.com"}, {"id": 1, "name": "lab"}],
            "subnets": [{"id": "7"}],
            "smart_proxies": [{"id": 1, "name": "proxy"}],
            "users": [{"id": 5, "login": "admin"}]
        }))
        .unwrap();

        assert_eq!(location.id, 4);
        assert_eq!(location.name, "dc1");
        assert_eq!(location.description, None);
        assert_eq!(location.domain_ids, Some(vec![1, 2]));
        assert_eq!(location.subnet_ids, Some(vec![7]));
        assert_eq!(location.realm_ids, Some(vec![]));
        assert_eq!(location.hostgroup_ids, Some(vec![]));
        assert_eq!(location.user_ids, Some(vec![5]));
    }

    #[test]
    fn test_encode_skips_untouched_associations() {
        let location = Location {
            id: 9,
            name: "dc2".to_string(),
            domain_ids: Some(vec![3]),
            subnet_ids: Some(vec![]),
            ..Default::default()
        };
        let body = serde_json::to_value(&location).unwrap();

        assert_eq!(
            body,
            json!({"name": "dc2", "domain_ids": [3], "subnet_ids": []})
        );
    }

    #[test]
    fn test_mistyped_fields_fall_back() {
        let location: Location =
            serde_json::from_value(json!({"id": "x", "name": ["dc"], "domains": "all"})).unwrap();
        assert_eq!(location.id, 0);
        assert_eq!(location.name, "");
        assert_eq!(location.domain_ids, Some(vec![]));
    }
}
