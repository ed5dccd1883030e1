//! Tracing subscriber setup

use crate::config::{LogConfig, LogFormat};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence over the configured filter. Calling this
/// twice is harmless; the second call reports `false`.
///
/// # Errors
/// Returns error if the configured filter directive does not parse
pub fn init(config: &LogConfig) -> Result<bool, tracing_subscriber::filter::ParseError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter)?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = match config.format {
        LogFormat::Json => builder.json().flatten_event(true).try_init().is_ok(),
        LogFormat::Pretty => builder.try_init().is_ok(),
    };
    Ok(installed)
}
