//! Testing utilities for the Foreman provider.
//!
//! [`ProviderTester`] drives a [`ForemanProvider`] through the same calls the
//! gRPC server makes, without starting a server. Point it at a mock Foreman
//! with [`ProviderTester::connect`].
//!
//! # Example
//!
//! ```ignore
//! use hemmer_provider_foreman::testing::ProviderTester;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_create_location() {
//!     let server = wiremock::MockServer::start().await;
//!     // mount mocks for POST /api/locations ...
//!
//!     let tester = ProviderTester::connect(&server.uri()).await.unwrap();
//!     let state = tester
//!         .apply_create("foreman_location", json!({"name": "lyon"}))
//!         .await
//!         .unwrap();
//!     assert_eq!(state["name"], "lyon");
//! }
//! ```

use serde_json::{json, Value};
use thiserror::Error;

use crate::error::ProviderError;
use crate::provider::ForemanProvider;
use crate::schema::Diagnostic;
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug, Error)]
pub enum TestError {
    /// The operation returned error diagnostics.
    #[error("operation failed with {}", describe(.0))]
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
}

fn describe(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| match &d.attribute {
            Some(attr) => format!("{} (at {})", d.summary, attr),
            None => d.summary.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Keep only error diagnostics; `Err` if there are any.
fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<Vec<Diagnostic>, TestError> {
    if diagnostics.iter().any(Diagnostic::is_error) {
        Err(TestError::Diagnostics(
            diagnostics.into_iter().filter(Diagnostic::is_error).collect(),
        ))
    } else {
        Ok(diagnostics)
    }
}

/// Provider settings that reach the Foreman at `uri` (`http://host:port`).
pub fn config_for(uri: &str) -> Value {
    let (protocol, hostname) = uri.split_once("://").unwrap_or(("http", uri));
    json!({
        "server_protocol": protocol,
        "server_hostname": hostname.trim_end_matches('/'),
        "client_username": "admin",
        "client_password": "changeme",
        "client_timeout": 5,
    })
}

/// A test harness around [`ForemanProvider`].
pub struct ProviderTester {
    provider: ForemanProvider,
}

impl Default for ProviderTester {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderTester {
    /// Create a tester for an unconfigured provider.
    pub fn new() -> Self {
        Self {
            provider: ForemanProvider::new(),
        }
    }

    /// Create a tester configured against the Foreman at `uri`.
    pub async fn connect(uri: &str) -> Result<Self, TestError> {
        let tester = Self::new();
        tester.configure(config_for(uri)).await?;
        Ok(tester)
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &ForemanProvider {
        &self.provider
    }

    /// Configure the provider; warnings are returned, errors fail.
    pub async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, TestError> {
        check_diagnostics(self.provider.configure(config).await?)
    }

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        check_diagnostics(
            self.provider
                .validate_resource_config(resource_type, config)
                .await?,
        )
        .map(drop)
    }

    /// Validate a data source configuration.
    pub async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        check_diagnostics(
            self.provider
                .validate_data_source_config(data_source_type, config)
                .await?,
        )
        .map(drop)
    }

    /// Plan a resource creation (no prior state).
    pub async fn plan_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, config.clone(), config)
            .await
    }

    /// Plan a change to an existing resource.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), config.clone(), config)
            .await
    }

    /// Plan a resource deletion.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Read the current state of a resource; null when it is gone.
    pub async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Import an existing object.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// Read a data source.
    pub async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.read_data_source(data_source_type, config).await
    }

    /// Plan then create; returns the new state.
    pub async fn apply_create(&self, resource_type: &str, config: Value) -> Result<Value, ProviderError> {
        let plan = self.plan_create(resource_type, config).await?;
        self.provider.create(resource_type, plan.planned_state).await
    }

    /// Plan then update in place; returns the plan and the new state.
    ///
    /// Fails with [`ProviderError::InvalidRequest`] if the plan needs a
    /// replacement instead.
    pub async fn apply_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<(PlanResult, Value), ProviderError> {
        let plan = self
            .plan_update(resource_type, prior_state.clone(), config)
            .await?;
        if plan.requires_replace {
            return Err(ProviderError::InvalidRequest(format!(
                "{} must be replaced, not updated",
                resource_type
            )));
        }
        let state = self
            .provider
            .update(resource_type, prior_state, plan.planned_state.clone())
            .await?;
        Ok((plan, state))
    }

    /// Plan then delete.
    pub async fn apply_delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        self.plan_delete(resource_type, current_state.clone()).await?;
        self.provider.delete(resource_type, current_state).await
    }
}

/// Assert that a plan changes the attribute at `path`.
///
/// # Panics
///
/// Panics if no change has that path.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    assert!(
        plan.changes.iter().any(|c| c.path == path),
        "expected a change to '{}', got {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that some diagnostic summary or detail contains `substring`.
///
/// # Panics
///
/// Panics if none does.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    assert!(
        diagnostics.iter().any(|d| {
            d.summary.contains(substring)
                || d.detail.as_deref().is_some_and(|s| s.contains(substring))
        }),
        "no diagnostic contains '{}': {:?}",
        substring,
        diagnostics
    );
}
