//! Puppet classes (`/api/puppetclasses`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::client::{wrap, ForemanClient};
use super::decode::Fields;
use super::error::ForemanError;
use super::query::{search_expression, QueryResponse};

const PUPPET_CLASSES: &str = "puppetclasses";

/// A Puppet class known to Foreman.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct PuppetClass {
    /// Server-assigned id
    #[serde(skip_serializing)]
    pub id: i64,
    /// Fully qualified class name, e.g. `ntp::config`
    pub name: String,
}

impl From<Value> for PuppetClass {
    fn from(value: Value) -> Self {
        let f = Fields::new(&value);
        Self {
            id: f.i64("id"),
            name: f.string("name"),
        }
    }
}

impl ForemanClient {
    /// Create a Puppet class
    pub async fn create_puppet_class(&self, class: &PuppetClass) -> Result<PuppetClass, ForemanError> {
        self.post(PUPPET_CLASSES, &wrap("puppetclass", class)?).await
    }

    /// Read a Puppet class by id
    pub async fn read_puppet_class(&self, id: i64) -> Result<PuppetClass, ForemanError> {
        self.get(&format!("{}/{}", PUPPET_CLASSES, id)).await
    }

    /// Rename a Puppet class
    pub async fn update_puppet_class(&self, class: &PuppetClass) -> Result<PuppetClass, ForemanError> {
        self.put(
            &format!("{}/{}", PUPPET_CLASSES, class.id),
            &wrap("puppetclass", class)?,
        )
        .await
    }

    /// Delete a Puppet class
    pub async fn delete_puppet_class(&self, id: i64) -> Result<(), ForemanError> {
        self.delete(&format!("{}/{}", PUPPET_CLASSES, id)).await
    }

    /// Search Puppet classes by exact name.
    ///
    /// Foreman groups the results by Puppet module; the response is
    /// flattened into a single list.
    pub async fn query_puppet_classes(
        &self,
        name: &str,
    ) -> Result<QueryResponse<PuppetClass>, ForemanError> {
        self.search(PUPPET_CLASSES, &search_expression("name", name))
            .await
    }
}
