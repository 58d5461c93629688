//! Logging setup for the provider binary.
//!
//! All logs are written to **stderr**; stdout is reserved for the handshake
//! line. The level filter is reloadable so the `provider_loglevel` setting
//! from the provider configuration can take effect at Configure time.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: initial filter (e.g. `info`, `hemmer_provider_foreman=debug`).
//!   Defaults to `info`.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

use crate::error::ProviderError;

static FILTER_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

/// Install the global subscriber.
///
/// Returns `false` if a subscriber was already set, in which case
/// [`set_log_level`] only validates its argument.
pub fn init_logging() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter, handle) = reload::Layer::new(filter);

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .try_init()
        .is_ok();

    if installed {
        let _ = FILTER_HANDLE.set(handle);
    }
    installed
}

/// Check whether `directive` is a usable filter, e.g. `debug` or
/// `warn,hemmer_provider_foreman=trace`.
pub fn is_valid_filter(directive: &str) -> bool {
    !directive.trim().is_empty() && EnvFilter::try_new(directive.to_lowercase()).is_ok()
}

/// Replace the active filter.
pub fn set_log_level(directive: &str) -> Result<(), ProviderError> {
    let filter = EnvFilter::try_new(directive.to_lowercase()).map_err(|e| {
        ProviderError::Configuration(format!("invalid log level '{}': {}", directive, e))
    })?;

    if let Some(handle) = FILTER_HANDLE.get() {
        handle
            .reload(filter)
            .map_err(|e| ProviderError::Internal(format!("failed to reload log filter: {}", e)))?;
        tracing::debug!(level = %directive, "log level updated");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_parsing() {
        assert!(is_valid_filter("info"));
        assert!(is_valid_filter("DEBUG"));
        assert!(is_valid_filter("warn,hemmer_provider_foreman=debug"));
        assert!(!is_valid_filter(""));
        assert!(!is_valid_filter("hemmer_provider_foreman=loud"));
    }

    #[test]
    fn test_set_log_level_rejects_bad_directive() {
        assert!(set_log_level("trace").is_ok());
        let err = set_log_level("foreman=verbose").unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }
}
