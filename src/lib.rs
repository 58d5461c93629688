//! Hemmer provider for Foreman
//!
//! This crate manages objects in a [Foreman](https://theforeman.org) server
//! through its REST API (`/api/v2`) and exposes them to Hemmer over the gRPC
//! provider protocol.
//!
//! # Overview
//!
//! - **Resources**: `foreman_location`, `foreman_computeprofile`,
//!   `foreman_computeattribute`, `foreman_puppetclass` and
//!   `foreman_smartclassparameter`
//! - **Data sources**: lookups by name (or by parameter and match for smart
//!   class parameter overrides) for every resource except compute attributes
//! - **API client**: [`api::ForemanClient`], a scoped, authenticated wrapper
//!   around `reqwest`
//! - **Set reconciler**: [`reconcile`] computes the patch for nested
//!   collections that Foreman only lets you remove by marking records with
//!   `_destroy`
//! - **Server**: [`serve`] starts the gRPC server and prints the handshake
//!
//! # Running
//!
//! The binary is started by Hemmer, which reads the handshake from stdout:
//!
//! ```text
//! HEMMER_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! Format: `HEMMER_PROVIDER|<protocol_version>|<address>`
//!
//! Logs go to stderr. The filter comes from `RUST_LOG` at startup and can
//! be changed by the `provider_loglevel` setting once configured.
//!
//! # Configuration
//!
//! ```text
//! provider "foreman" {
//!   server_hostname = "foreman.example.com"
//!   client_username = "admin"
//!   client_password = "changeme"
//!   location_id     = 2
//! }
//! ```
//!
//! Every setting left out falls back to `FOREMAN_<SETTING>` in the
//! environment, e.g. `FOREMAN_CLIENT_PASSWORD`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod provider;
pub mod reconcile;
pub mod resources;
pub mod schema;
pub mod server;
pub mod state;
pub mod testing;
pub mod types;
pub mod validation;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

// Re-export main types at crate root
pub use config::ProviderConfig;
pub use error::ProviderError;
pub use logging::{init_logging, set_log_level};
pub use provider::ForemanProvider;
pub use reconcile::{reconcile, AttributeRecord, AttributeSet, Patch};
pub use schema::ProviderSchema;
pub use server::{serve, serve_with_options, ProviderService, ServeOptions};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities,
    HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};
pub use validation::validate;

// Re-export async_trait for convenience
pub use async_trait::async_trait;
