//! Resource and data source implementations.
//!
//! Each Foreman object type lives in its own module and provides a
//! [`Resource`] (schema plus CRUD against the API) and, where Foreman can be
//! searched for it, a [`DataSource`]. The provider dispatches to them by
//! type name.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::api::{ForemanClient, ForemanError, Match, QueryResponse};
use crate::error::ProviderError;
use crate::schema::Schema;

pub mod compute_attribute;
pub mod compute_profile;
pub mod location;
pub mod puppet_class;
pub mod smart_class_parameter;

/// A managed Foreman object type.
#[async_trait::async_trait]
pub trait Resource: Send + Sync {
    /// Type name as used in configuration, e.g. `foreman_location`.
    fn type_name(&self) -> &'static str;

    /// Resource schema.
    fn schema(&self) -> Schema;

    /// Create the object described by `planned` and return its state.
    async fn create(&self, client: &ForemanClient, planned: &Value) -> Result<Value, ProviderError>;

    /// Refresh `current`. `None` means the object no longer exists.
    async fn read(
        &self,
        client: &ForemanClient,
        current: &Value,
    ) -> Result<Option<Value>, ProviderError>;

    /// Move the object from `prior` to `planned` and return its new state.
    async fn update(
        &self,
        client: &ForemanClient,
        prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError>;

    /// Delete the object. Deleting an object that is already gone succeeds.
    async fn delete(&self, client: &ForemanClient, current: &Value) -> Result<(), ProviderError>;

    /// Look up an existing object by its import id.
    ///
    /// By default the import id is the numeric Foreman id.
    async fn import(&self, client: &ForemanClient, id: &str) -> Result<Option<Value>, ProviderError> {
        let id = parse_id(id)?;
        self.read(client, &json!({ "id": id.to_string() })).await
    }
}

/// A searchable Foreman object type.
#[async_trait::async_trait]
pub trait DataSource: Send + Sync {
    /// Type name as used in configuration.
    fn type_name(&self) -> &'static str;

    /// Data source schema.
    fn schema(&self) -> Schema;

    /// Find the single object matching `config` and return its state.
    async fn read(&self, client: &ForemanClient, config: &Value) -> Result<Value, ProviderError>;
}

/// All resource types.
pub fn resources() -> Vec<Arc<dyn Resource>> {
    vec![
        Arc::new(location::LocationResource),
        Arc::new(compute_profile::ComputeProfileResource),
        Arc::new(compute_attribute::ComputeAttributeResource),
        Arc::new(puppet_class::PuppetClassResource),
        Arc::new(smart_class_parameter::SmartClassParameterResource),
    ]
}

/// All data source types.
pub fn data_sources() -> Vec<Arc<dyn DataSource>> {
    vec![
        Arc::new(location::LocationResource),
        Arc::new(compute_profile::ComputeProfileResource),
        Arc::new(puppet_class::PuppetClassResource),
        Arc::new(smart_class_parameter::SmartClassParameterResource),
    ]
}

/// Turn a 404 into `None`.
pub(crate) fn found<T>(result: Result<T, ForemanError>) -> Result<Option<T>, ProviderError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ForemanError::NotFound(message)) => {
            tracing::debug!(%message, "object not found");
            Ok(None)
        },
        Err(e) => Err(e.into()),
    }
}

/// Require a search to have matched exactly one object.
pub(crate) fn single_match<T>(
    data_source: &str,
    response: QueryResponse<T>,
) -> Result<T, ProviderError> {
    match response.into_match() {
        Match::One(found) => Ok(found),
        Match::None => Err(ProviderError::Query(format!(
            "data source {} returned no results",
            data_source
        ))),
        Match::Many(n) => Err(ProviderError::Query(format!(
            "data source {} returned more than 1 result ({} matches)",
            data_source, n
        ))),
    }
}

/// Parse a numeric import id.
pub(crate) fn parse_id(id: &str) -> Result<i64, ProviderError> {
    id.trim()
        .parse()
        .map_err(|_| ProviderError::InvalidRequest(format!("import id '{}' is not numeric", id)))
}

/// Parse a composite import id of the form `<a>/<b>`.
pub(crate) fn parse_id_pair(id: &str, format: &str) -> Result<(i64, i64), ProviderError> {
    let invalid =
        || ProviderError::InvalidRequest(format!("import id '{}' must look like {}", id, format));
    let (first, second) = id.split_once('/').ok_or_else(invalid)?;
    match (first.trim().parse(), second.trim().parse()) {
        (Ok(first), Ok(second)) => Ok((first, second)),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_registries() {
        let resource_names: HashSet<_> = resources().iter().map(|r| r.type_name()).collect();
        assert_eq!(resource_names.len(), 5);
        assert!(resource_names.contains("foreman_computeattribute"));

        let data_source_names: HashSet<_> = data_sources().iter().map(|d| d.type_name()).collect();
        assert_eq!(data_source_names.len(), 4);
        assert!(data_source_names.is_subset(&resource_names));
    }

    #[test]
    fn test_single_match() {
        let response = |n: usize| QueryResponse {
            total: 10,
            subtotal: n as i64,
            page: 1,
            per_page: 20,
            search: String::new(),
            results: (0..n as i64).collect::<Vec<_>>(),
        };

        assert_eq!(single_match("foreman_location", response(1)).unwrap(), 0);

        let err = single_match("foreman_location", response(0)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Query error: data source foreman_location returned no results"
        );

        let err = single_match("foreman_location", response(2)).unwrap_err();
        assert!(err.message().contains("more than 1 result"));
    }

    #[test]
    fn test_found() {
        assert_eq!(found::<i64>(Ok(3)).unwrap(), Some(3));
        assert_eq!(
            found::<i64>(Err(ForemanError::NotFound("gone".into()))).unwrap(),
            None
        );
        assert!(found::<i64>(Err(ForemanError::Authentication("denied".into()))).is_err());
    }

    #[test]
    fn test_import_ids() {
        assert_eq!(parse_id(" 12 ").unwrap(), 12);
        assert!(parse_id("lyon").is_err());
        assert_eq!(parse_id_pair("3/7", "<a>/<b>").unwrap(), (3, 7));
        assert!(parse_id_pair("3", "<a>/<b>").is_err());
        assert!(parse_id_pair("3/x", "<a>/<b>").is_err());
    }
}
