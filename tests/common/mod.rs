//! Shared helpers for tests that talk to a mock Foreman.

#![allow(dead_code)]

use hemmer_provider_foreman::api::{ClientConfig, ForemanClient};
use hemmer_provider_foreman::testing::ProviderTester;
use serde_json::{json, Value};
use wiremock::MockServer;

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "changeme";

/// Client settings for the mock server, with basic auth.
pub fn client_config(server: &MockServer) -> ClientConfig {
    ClientConfig::new("http", server.address().to_string()).with_credentials(USERNAME, PASSWORD)
}

pub fn client(server: &MockServer) -> ForemanClient {
    ForemanClient::new(&client_config(server)).expect("client")
}

/// A provider configured against the mock server.
pub async fn tester(server: &MockServer) -> ProviderTester {
    ProviderTester::connect(&server.uri())
        .await
        .expect("provider configures against mock server")
}

/// A collection envelope as Foreman returns it for a search.
pub fn search_results(results: Value) -> Value {
    let count = results.as_array().map(Vec::len).unwrap_or(1);
    json!({
        "total": 10,
        "subtotal": count,
        "page": 1,
        "per_page": 20,
        "search": null,
        "results": results
    })
}

pub fn not_found(what: &str) -> Value {
    json!({"error": {"message": format!("Resource {} not found", what)}})
}
