//! Foreman REST API client.
//!
//! [`ForemanClient`] carries the connection settings and the generic request
//! helpers. Each submodule adds the typed model and the CRUD/search calls for
//! one Foreman endpoint. All response decoding goes through [`decode`].

pub mod client;
pub mod compute_attribute;
pub mod compute_profile;
pub mod decode;
pub mod error;
pub mod location;
pub mod override_value;
pub mod puppet_class;
pub mod query;

pub use client::{ClientConfig, ForemanClient};
pub use compute_attribute::{ComputeAttribute, ComputeAttributeChange};
pub use compute_profile::ComputeProfile;
pub use error::ForemanError;
pub use location::Location;
pub use override_value::OverrideValue;
pub use puppet_class::PuppetClass;
pub use query::{Match, QueryResponse};
