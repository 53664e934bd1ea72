//! Configuration loading shared across Monitor360 crates

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors. These are fatal: a component that fails to load
/// its configuration must not go on to serve requests.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A required value was missing or blank
    #[error("Missing required configuration value: {field}")]
    MissingField { field: String },

    /// A value was present but unusable
    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// The configuration sources could not be parsed/merged
    #[error("Failed to parse configuration: {details}")]
    ParseError { details: String },
}

impl ConfigurationError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Layered configuration loading: serialized defaults, then a TOML file,
/// then prefixed environment variables split on `__`.
pub trait ConfigLoader: Serialize + DeserializeOwned + Default {
    /// File consulted when no explicit path is given
    const DEFAULT_FILE: &'static str;

    /// Environment variable prefix, e.g. `MONITOR360_`
    const ENV_PREFIX: &'static str;

    /// Build the figment stack without extracting it.
    fn figment(path: Option<&Path>) -> Figment {
        let file = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(Self::DEFAULT_FILE));

        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(Self::ENV_PREFIX).split("__"))
    }

    /// Load from the default file (if present) and the environment.
    fn load(path: Option<PathBuf>) -> Result<Self, ConfigurationError> {
        Self::figment(path.as_deref())
            .extract()
            .map_err(|e| ConfigurationError::ParseError {
                details: e.to_string(),
            })
    }

    /// Load from an explicit file and the environment.
    fn load_from_file(path: &Path) -> Result<Self, ConfigurationError> {
        Self::load(Some(path.to_path_buf()))
    }
}
