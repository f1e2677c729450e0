//! Process configuration read from the environment.
//!
//! A `.env` file in the working directory is loaded first when present.
//! Workflow parameters (batch size, label and review times) are project data
//! and are not configured here.

use std::fmt;
use thiserror::Error;

/// Environment variable holding the tracing filter directive.
pub const LOG_FILTER_VAR: &str = "LABELFLOW_LOG";

/// Environment variable selecting the log output format.
pub const LOG_FORMAT_VAR: &str = "LABELFLOW_LOG_FORMAT";

const DEFAULT_FILTER: &str = "info";

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The `.env` file exists but could not be read.
    #[error("failed to load .env file: {0}")]
    DotEnv(#[from] dotenvy::Error),

    /// A variable holds a value outside its accepted set.
    #[error("invalid value for {name}: {value}")]
    InvalidValue {
        /// Variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidValue {
                name: LOG_FORMAT_VAR,
                value: value.to_owned(),
            }),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pretty => "pretty",
            Self::Json => "json",
        })
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetrySettings {
    /// `tracing-subscriber` filter directive, e.g. `labelflow=debug`.
    pub filter: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_owned(),
            format: LogFormat::default(),
        }
    }
}

impl TelemetrySettings {
    /// Loads `.env` when present, then reads the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `.env` is unreadable or a variable holds
    /// an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv()
            .map(drop)
            .or_else(|err| if err.not_found() { Ok(()) } else { Err(err) })?;
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`, which maps a variable name to its
    /// value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an unknown log format.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let filter = lookup(LOG_FILTER_VAR)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FILTER.to_owned());
        let format = match lookup(LOG_FORMAT_VAR) {
            Some(value) if !value.trim().is_empty() => LogFormat::parse(&value)?,
            _ => LogFormat::default(),
        };
        Ok(Self { filter, format })
    }
}
