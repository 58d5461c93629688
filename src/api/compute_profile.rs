//! Compute profiles (`/api/compute_profiles`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::client::{wrap, ForemanClient};
use super::decode::Fields;
use super::error::ForemanError;
use super::query::{search_expression, QueryResponse};

const COMPUTE_PROFILES: &str = "compute_profiles";

/// A named bundle of per-compute-resource VM settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct ComputeProfile {
    /// Server-assigned id
    #[serde(skip_serializing)]
    pub id: i64,
    /// Profile name, e.g. `1-Small`
    pub name: String,
}

impl From<Value> for ComputeProfile {
    fn from(value: Value) -> Self {
        let f = Fields::new(&value);
        Self {
            id: f.i64("id"),
            name: f.string("name"),
        }
    }
}

impl ForemanClient {
    /// Create a compute profile
    pub async fn create_compute_profile(
        &self,
        profile: &ComputeProfile,
    ) -> Result<ComputeProfile, ForemanError> {
        self.post(COMPUTE_PROFILES, &wrap("compute_profile", profile)?)
            .await
    }

    /// Read a compute profile by id
    pub async fn read_compute_profile(&self, id: i64) -> Result<ComputeProfile, ForemanError> {
        self.get(&format!("{}/{}", COMPUTE_PROFILES, id)).await
    }

    /// Rename a compute profile
    pub async fn update_compute_profile(
        &self,
        profile: &ComputeProfile,
    ) -> Result<ComputeProfile, ForemanError> {
        self.put(
            &format!("{}/{}", COMPUTE_PROFILES, profile.id),
            &wrap("compute_profile", profile)?,
        )
        .await
    }

    /// Delete a compute profile
    pub async fn delete_compute_profile(&self, id: i64) -> Result<(), ForemanError> {
        self.delete(&format!("{}/{}", COMPUTE_PROFILES, id)).await
    }

    /// Search compute profiles by exact name
    pub async fn query_compute_profiles(
        &self,
        name: &str,
    ) -> Result<QueryResponse<ComputeProfile>, ForemanError> {
        self.search(COMPUTE_PROFILES, &search_expression("name", name))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_wire_format() {
        let profile: ComputeProfile = serde_json::from_value(json!({
            "id": "3",
            "name": "2-Medium",
            "compute_attributes": []
        }))
        .unwrap();
        assert_eq!(profile.id, 3);
        assert_eq!(profile.name, "2-Medium");

        let body = wrap("compute_profile", &profile).unwrap();
        assert_eq!(body, json!({"compute_profile": {"name": "2-Medium"}}));
    }
}
