//! Foreman API client
//!
//! Thin wrapper over `reqwest` that knows Foreman's conventions: every path
//! is relative to `/api`, bodies are wrapped under a resource key, and the
//! configured location/organization scope rides along as query parameters.

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::error::ForemanError;
use super::query::QueryResponse;

/// Connection settings for a [`ForemanClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// `http` or `https`
    pub protocol: String,
    /// Host name, optionally with a port
    pub hostname: String,
    /// Username for HTTP basic auth
    pub username: Option<String>,
    /// Password for HTTP basic auth
    pub password: Option<String>,
    /// Skip TLS certificate verification
    pub tls_insecure: bool,
    /// Per-request timeout
    pub timeout: Duration,
    /// Location scope applied to every request
    pub location_id: Option<i64>,
    /// Organization scope applied to every request
    pub organization_id: Option<i64>,
}

impl ClientConfig {
    /// Settings for an unauthenticated client talking to `protocol://hostname`.
    pub fn new(protocol: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            hostname: hostname.into(),
            username: None,
            password: None,
            tls_insecure: false,
            timeout: Duration::from_secs(30),
            location_id: None,
            organization_id: None,
        }
    }

    /// Use HTTP basic auth.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Scope requests to a location and/or organization.
    pub fn with_scope(mut self, location_id: Option<i64>, organization_id: Option<i64>) -> Self {
        self.location_id = location_id;
        self.organization_id = organization_id;
        self
    }

    /// Base URL of the API, e.g. `https://foreman.example.com/api`.
    pub fn base_url(&self) -> String {
        format!(
            "{}://{}/api",
            self.protocol,
            self.hostname.trim_end_matches('/')
        )
    }
}

/// Shared client for all Foreman resources.
#[derive(Debug, Clone)]
pub struct ForemanClient {
    http: Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
    scope: Vec<(&'static str, String)>,
}

impl ForemanClient {
    /// Build a client from connection settings.
    pub fn new(config: &ClientConfig) -> Result<Self, ForemanError> {
        if config.hostname.trim().is_empty() {
            return Err(ForemanError::InvalidRequest(
                "server hostname must not be empty".to_string(),
            ));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.tls_insecure)
            .build()?;

        let mut scope = Vec::new();
        if let Some(id) = config.location_id {
            scope.push(("location_id", id.to_string()));
        }
        if let Some(id) = config.organization_id {
            scope.push(("organization_id", id.to_string()));
        }

        Ok(Self {
            http,
            base_url: config.base_url(),
            username: config.username.clone(),
            password: config.password.clone(),
            scope,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut request = self
            .http
            .request(method, self.build_url(path))
            .header(ACCEPT, "application/json");
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_ref());
        }
        if !self.scope.is_empty() {
            request = request.query(&self.scope);
        }
        request
    }

    async fn execute(
        &self,
        method: &Method,
        path: &str,
        request: RequestBuilder,
    ) -> Result<Response, ForemanError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = format!("{} {} failed: {}", method, path, error_message(&body));
        debug!(%method, path, status = status.as_u16(), "Foreman request failed");
        Err(match status {
            StatusCode::NOT_FOUND => ForemanError::NotFound(message),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ForemanError::Authentication(message)
            },
            _ => ForemanError::Api {
                status: status.as_u16(),
                message,
            },
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ForemanError> {
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ForemanError> {
        debug!(path, "GET");
        let request = self.request(Method::GET, path);
        let response = self.execute(&Method::GET, path, request).await?;
        Self::decode(response).await
    }

    /// Make a POST request with a JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ForemanError> {
        self.send_json(Method::POST, path, body).await
    }

    /// Make a PUT request with a JSON body
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ForemanError> {
        self.send_json(Method::PUT, path, body).await
    }

    async fn send_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, ForemanError> {
        let body = serde_json::to_vec(body)?;
        debug!(%method, path, body = %String::from_utf8_lossy(&body), "sending request");
        let request = self
            .request(method.clone(), path)
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        let response = self.execute(&method, path, request).await?;
        Self::decode(response).await
    }

    /// Make a DELETE request. The response body is ignored.
    pub async fn delete(&self, path: &str) -> Result<(), ForemanError> {
        debug!(path, "DELETE");
        let request = self.request(Method::DELETE, path);
        self.execute(&Method::DELETE, path, request).await?;
        Ok(())
    }

    /// Search a collection with a Foreman scoped-search expression.
    pub async fn search<T: DeserializeOwned>(
        &self,
        path: &str,
        search: &str,
    ) -> Result<QueryResponse<T>, ForemanError> {
        debug!(path, search, "searching");
        let request = self.request(Method::GET, path).query(&[("search", search)]);
        let response = self.execute(&Method::GET, path, request).await?;
        Self::decode(response).await
    }
}

/// Wrap a model under its resource key, e.g. `{"location": {...}}`.
pub(crate) fn wrap<T: Serialize>(key: &str, value: &T) -> Result<Value, ForemanError> {
    let mut body = Map::new();
    body.insert(key.to_string(), serde_json::to_value(value)?);
    Ok(Value::Object(body))
}

/// Pull a human-readable message out of a Foreman error body.
///
/// Foreman answers with `{"error": {"message": ".."}}` or, for validation
/// failures, `{"error": {"full_messages": [..]}}`.
fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));
    let message = match error {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Object(obj)) => obj
            .get("full_messages")
            .and_then(Value::as_array)
            .map(|messages| {
                messages
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join("; ")
            })
            .filter(|joined| !joined.is_empty())
            .or_else(|| {
                obj.get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            }),
        _ => None,
    };

    match message {
        Some(message) => message,
        None if body.trim().is_empty() => "empty response body".to_string(),
        None => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_base_url() {
        let config = ClientConfig::new("https", "foreman.example.com/");
        assert_eq!(config.base_url(), "https://foreman.example.com/api");

        let config = ClientConfig::new("http", "127.0.0.1:3000");
        assert_eq!(config.base_url(), "http://127.0.0.1:3000/api");
    }

    #[test]
    fn test_empty_hostname_rejected() {
        let result = ForemanClient::new(&ClientConfig::new("https", "  "));
        assert!(matches!(result, Err(ForemanError::InvalidRequest(_))));
    }

    #[test]
    fn test_build_url_strips_leading_slash() {
        let client = ForemanClient::new(&ClientConfig::new("https", "foreman")).unwrap();
        assert_eq!(client.build_url("/locations/1"), "https://foreman/api/locations/1");
        assert_eq!(client.build_url("locations"), "https://foreman/api/locations");
    }

    #[test]
    fn test_wrap() {
        let body = wrap("puppetclass", &json!({"name": "ntp"})).unwrap();
        assert_eq!(body, json!({"puppetclass": {"name": "ntp"}}));
    }

    #[test]
    fn test_error_message_variants() {
        assert_eq!(
            error_message(r#"{"error": {"message": "Permission denied"}}"#),
            "Permission denied"
        );
        assert_eq!(
            error_message(
                r#"{"error": {"id": null, "errors": {}, "full_messages": ["Name has already been taken", "Title is invalid"]}}"#
            ),
            "Name has already been taken; Title is invalid"
        );
        assert_eq!(error_message(r#"{"error": "boom"}"#), "boom");
        assert_eq!(error_message("<html>502</html>"), "<html>502</html>");
        assert_eq!(error_message(""), "empty response body");
    }
}
