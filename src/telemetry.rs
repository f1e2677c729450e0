//! Tracing subscriber installation.

use crate::config::{LogFormat, TelemetrySettings};
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The filter directive could not be parsed.
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
}

/// Installs the global tracing subscriber.
///
/// Returns `false` when a subscriber was already installed, in which case
/// the existing one is kept.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] when the filter directive is invalid.
pub fn init_tracing(settings: &TelemetrySettings) -> Result<bool, TelemetryError> {
    let filter = EnvFilter::try_new(&settings.filter)?;
    let (pretty, json) = match settings.format {
        LogFormat::Pretty => (Some(tracing_subscriber::fmt::layer().pretty()), None),
        LogFormat::Json => (None, Some(tracing_subscriber::fmt::layer().json())),
    };
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .try_init()
        .is_ok();
    Ok(installed)
}
