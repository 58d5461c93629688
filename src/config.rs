//! Provider configuration.
//!
//! The host sends the provider block as a JSON object. Any key that is
//! absent or null falls back to the environment variable
//! `FOREMAN_<KEY IN UPPER CASE>`, e.g. `FOREMAN_SERVER_HOSTNAME`.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::api::decode::to_bool;
use crate::api::ClientConfig;
use crate::error::ProviderError;
use crate::logging::is_valid_filter;
use crate::schema::{Attribute, Diagnostic, Schema};

const ENV_PREFIX: &str = "FOREMAN_";

#[derive(Debug, Clone, Copy)]
enum Kind {
    Text,
    Bool,
    Int,
}

const KEYS: &[(&str, Kind)] = &[
    ("server_hostname", Kind::Text),
    ("server_protocol", Kind::Text),
    ("client_tls_insecure", Kind::Bool),
    ("client_username", Kind::Text),
    ("client_password", Kind::Text),
    ("client_timeout", Kind::Int),
    ("location_id", Kind::Int),
    ("organization_id", Kind::Int),
    ("provider_loglevel", Kind::Text),
];

/// Settings from the provider block.
#[derive(Clone, PartialEq, Deserialize)]
pub struct ProviderConfig {
    /// Foreman host name, optionally with a port
    #[serde(default)]
    pub server_hostname: String,
    /// `http` or `https`
    #[serde(default = "default_protocol")]
    pub server_protocol: String,
    /// Skip TLS certificate verification
    #[serde(default)]
    pub client_tls_insecure: bool,
    /// Basic auth user
    #[serde(default)]
    pub client_username: Option<String>,
    /// Basic auth password
    #[serde(default)]
    pub client_password: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub client_timeout: u64,
    /// Location scope for every request
    #[serde(default)]
    pub location_id: Option<i64>,
    /// Organization scope for every request
    #[serde(default)]
    pub organization_id: Option<i64>,
    /// Log filter applied at Configure time, e.g. `debug`
    #[serde(default)]
    pub provider_loglevel: Option<String>,
}

fn default_protocol() -> String {
    "https".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("server_hostname", &self.server_hostname)
            .field("server_protocol", &self.server_protocol)
            .field("client_tls_insecure", &self.client_tls_insecure)
            .field("client_username", &self.client_username)
            .field("client_password", &self.client_password.as_ref().map(|_| "<redacted>"))
            .field("client_timeout", &self.client_timeout)
            .field("location_id", &self.location_id)
            .field("organization_id", &self.organization_id)
            .field("provider_loglevel", &self.provider_loglevel)
            .finish()
    }
}

impl ProviderConfig {
    /// Schema of the provider block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_description("Connection settings for a Foreman server")
            .with_attribute(
                "server_hostname",
                Attribute::optional_string()
                    .with_description("Foreman host name, e.g. foreman.example.com (FOREMAN_SERVER_HOSTNAME)"),
            )
            .with_attribute(
                "server_protocol",
                Attribute::optional_string()
                    .with_description("http or https")
                    .with_default(Value::from("https")),
            )
            .with_attribute(
                "client_tls_insecure",
                Attribute::optional_bool()
                    .with_description("Skip TLS certificate verification")
                    .with_default(Value::Bool(false)),
            )
            .with_attribute(
                "client_username",
                Attribute::optional_string().with_description("User for HTTP basic auth"),
            )
            .with_attribute(
                "client_password",
                Attribute::optional_string()
                    .with_description("Password for HTTP basic auth")
                    .sensitive(),
            )
            .with_attribute(
                "client_timeout",
                Attribute::optional_int64()
                    .with_description("Request timeout in seconds")
                    .with_default(Value::from(30))
                    .with_min_value(1),
            )
            .with_attribute(
                "location_id",
                Attribute::optional_int64()
                    .with_description("Scope every request to this location")
                    .with_min_value(0),
            )
            .with_attribute(
                "organization_id",
                Attribute::optional_int64()
                    .with_description("Scope every request to this organization")
                    .with_min_value(0),
            )
            .with_attribute(
                "provider_loglevel",
                Attribute::optional_string()
                    .with_description("Log filter applied once configured, e.g. debug"),
            )
    }

    /// Read the provider block, falling back to the process environment.
    pub fn from_value(value: &Value) -> Result<Self, ProviderError> {
        Self::from_value_with_env(value, |name| std::env::var(name).ok())
    }

    /// Read the provider block, falling back to `env` for absent keys.
    pub fn from_value_with_env(
        value: &Value,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ProviderError> {
        let mut fields: Map<String, Value> = match value {
            Value::Object(obj) => obj
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            Value::Null => Map::new(),
            _ => {
                return Err(ProviderError::Configuration(
                    "provider configuration must be an object".to_string(),
                ))
            },
        };

        for (key, kind) in KEYS {
            if fields.contains_key(*key) {
                continue;
            }
            let name = format!("{}{}", ENV_PREFIX, key.to_uppercase());
            if let Some(raw) = env(&name) {
                fields.insert(key.to_string(), parse_env(&name, &raw, *kind)?);
            }
        }

        serde_json::from_value(Value::Object(fields))
            .map_err(|e| ProviderError::Configuration(format!("invalid provider configuration: {}", e)))
    }

    /// Check the settings for problems a request would otherwise hit later.
    pub fn validate(&self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        if self.server_hostname.trim().is_empty() {
            diagnostics.push(
                Diagnostic::error("Missing Foreman server hostname")
                    .with_detail("Set server_hostname or FOREMAN_SERVER_HOSTNAME")
                    .with_attribute("server_hostname"),
            );
        }
        if !matches!(self.server_protocol.as_str(), "http" | "https") {
            diagnostics.push(
                Diagnostic::error(format!("Unsupported protocol '{}'", self.server_protocol))
                    .with_detail("Expected http or https")
                    .with_attribute("server_protocol"),
            );
        }
        if self.client_timeout == 0 {
            diagnostics.push(
                Diagnostic::error("Timeout must be at least one second")
                    .with_attribute("client_timeout"),
            );
        }
        if self.client_username.is_some() && self.client_password.is_none() {
            diagnostics.push(
                Diagnostic::warning("client_username is set without client_password")
                    .with_detail("Requests will be sent with an empty password")
                    .with_attribute("client_password"),
            );
        }
        if let Some(level) = &self.provider_loglevel {
            if !is_valid_filter(level) {
                diagnostics.push(
                    Diagnostic::error(format!("Invalid log level '{}'", level))
                        .with_detail("Expected a level such as debug or info, or a tracing filter directive")
                        .with_attribute("provider_loglevel"),
                );
            }
        }
        diagnostics
    }

    /// Connection settings for the API client.
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(&self.server_protocol, &self.server_hostname)
            .with_scope(self.location_id, self.organization_id);
        config.username = self.client_username.clone();
        config.password = self.client_password.clone();
        config.tls_insecure = self.client_tls_insecure;
        config.timeout = Duration::from_secs(self.client_timeout);
        config
    }
}

fn parse_env(name: &str, raw: &str, kind: Kind) -> Result<Value, ProviderError> {
    let invalid = |expected: &str| {
        ProviderError::Configuration(format!("{} must be {}, got '{}'", name, expected, raw))
    };
    match kind {
        Kind::Text => Ok(Value::String(raw.to_string())),
        Kind::Bool => to_bool(&Value::String(raw.trim().to_string()))
            .map(Value::Bool)
            .ok_or_else(|| invalid("true or false")),
        Kind::Int => raw
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| invalid("an integer")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate;
    use serde_json::json;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            ProviderConfig::from_value_with_env(&json!({"server_hostname": "foreman.local"}), env(&[]))
                .unwrap();
        assert_eq!(config.server_protocol, "https");
        assert_eq!(config.client_timeout, 30);
        assert!(!config.client_tls_insecure);
        assert!(config.validate().is_empty());
        assert_eq!(config.client_config().base_url(), "https://foreman.local/api");
    }

    #[test]
    fn test_environment_fallback() {
        let config = ProviderConfig::from_value_with_env(
            &json!({"server_hostname": "foreman.local", "client_username": null}),
            env(&[
                ("FOREMAN_SERVER_HOSTNAME", "ignored.example.com"),
                ("FOREMAN_CLIENT_USERNAME", "admin"),
                ("FOREMAN_CLIENT_PASSWORD", "changeme"),
                ("FOREMAN_CLIENT_TLS_INSECURE", "TRUE"),
                ("FOREMAN_LOCATION_ID", "2"),
            ]),
        )
        .unwrap();

        assert_eq!(config.server_hostname, "foreman.local");
        assert_eq!(config.client_username.as_deref(), Some("admin"));
        assert!(config.client_tls_insecure);
        assert_eq!(config.location_id, Some(2));

        let client = config.client_config();
        assert_eq!(client.password.as_deref(), Some("changeme"));
        assert_eq!(client.location_id, Some(2));
        assert_eq!(client.organization_id, None);
    }

    #[test]
    fn test_bad_environment_values() {
        let err = ProviderConfig::from_value_with_env(
            &json!({}),
            env(&[("FOREMAN_CLIENT_TIMEOUT", "soon")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("FOREMAN_CLIENT_TIMEOUT"));

        let err = ProviderConfig::from_value_with_env(&json!("foreman"), env(&[])).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn test_validate() {
        let config = ProviderConfig::from_value_with_env(
            &json!({
                "server_protocol": "ftp",
                "client_timeout": 0,
                "client_username": "admin",
                "provider_loglevel": "foreman=loud"
            }),
            env(&[]),
        )
        .unwrap();

        let diagnostics = config.validate();
        let attributes: Vec<_> = diagnostics
            .iter()
            .filter_map(|d| d.attribute.as_deref())
            .collect();
        assert_eq!(
            attributes,
            vec![
                "server_hostname",
                "server_protocol",
                "client_timeout",
                "client_password",
                "provider_loglevel"
            ]
        );
        assert_eq!(diagnostics.iter().filter(|d| d.is_error()).count(), 4);
    }

    #[test]
    fn test_schema_accepts_config() {
        let schema = ProviderConfig::schema();
        assert!(validate(
            &schema,
            &json!({"server_hostname": "foreman.local", "client_timeout": 10})
        )
        .is_empty());
        assert_eq!(validate(&schema, &json!({"location_id": -1})).len(), 1);
        assert!(schema.attribute("client_password").unwrap().flags.sensitive);
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = ProviderConfig::from_value_with_env(
            &json!({"client_password": "hunter2"}),
            env(&[]),
        )
        .unwrap();
        assert!(!format!("{:?}", config).contains("hunter2"));
    }
}
