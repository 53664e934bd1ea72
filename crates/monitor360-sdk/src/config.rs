//! SDK configuration
//!
//! Loaded from `monitor360.toml` (or an explicit path) and `MONITOR360_`
//! environment variables, e.g. `MONITOR360_IDENTITY__URL`.

use crate::auth::types::WaitOptions;
use monitor360_common::{ConfigLoader, ConfigurationError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Backend used when no API base is configured
pub const DEFAULT_API_ORIGIN: &str = "http://127.0.0.1:8000";

/// Origin that relative API bases are resolved against
pub const DEFAULT_LOCAL_ORIGIN: &str = "http://127.0.0.1:5173";

/// Identity provider connection parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Identity provider project URL
    pub url: String,

    /// Public (anonymous) client key
    pub anon_key: String,
}

impl IdentityConfig {
    /// Both parameters are required; a blank value is a fatal error.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ConfigurationError::missing("identity.url"));
        }
        if self.anon_key.trim().is_empty() {
            return Err(ConfigurationError::missing("identity.anon_key"));
        }

        let parsed = Url::parse(url)
            .map_err(|e| ConfigurationError::invalid("identity.url", e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigurationError::invalid(
                "identity.url",
                format!("unsupported scheme '{}'", parsed.scheme()),
            ));
        }
        Ok(())
    }
}

/// Defaults for waiting on a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitConfig {
    pub timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub require_auth: bool,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 8000,
            poll_interval_ms: 200,
            require_auth: false,
        }
    }
}

impl WaitConfig {
    pub fn options(&self) -> WaitOptions {
        WaitOptions::default()
            .timeout_ms(self.timeout_ms)
            .require_auth(self.require_auth)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Top-level SDK configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdkConfig {
    /// API base; absolute, relative to the local origin, or unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,

    /// Whole-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Connection establishment timeout in seconds
    pub connect_timeout_secs: u64,

    pub identity: IdentityConfig,

    pub wait: WaitConfig,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            request_timeout_secs: 20,
            connect_timeout_secs: 10,
            identity: IdentityConfig::default(),
            wait: WaitConfig::default(),
        }
    }
}

impl ConfigLoader for SdkConfig {
    const DEFAULT_FILE: &'static str = "monitor360.toml";
    const ENV_PREFIX: &'static str = "MONITOR360_";
}

impl SdkConfig {
    /// Load and validate. Missing identity parameters fail here, before any
    /// client is built.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigurationError> {
        let config = match config_path {
            Some(path) => <Self as ConfigLoader>::load_from_file(path)?,
            None => <Self as ConfigLoader>::load(None)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.identity.validate()?;
        if self.request_timeout_secs == 0 {
            return Err(ConfigurationError::invalid(
                "request_timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.wait.poll_interval_ms == 0 {
            return Err(ConfigurationError::invalid(
                "wait.poll_interval_ms",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Resolved API base, always ending in `/api`
    pub fn api_base(&self) -> Result<String, ConfigurationError> {
        resolve_api_base(self.api_base_url.as_deref())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Generate example configuration file
    pub fn generate_example() -> Result<String, ConfigurationError> {
        let mut config = Self::default();
        config.api_base_url = Some(DEFAULT_API_ORIGIN.to_string());
        config.identity = IdentityConfig {
            url: "https://your-project.supabase.co".to_string(),
            anon_key: "your-anon-key".to_string(),
        };
        toml::to_string_pretty(&config).map_err(|e| ConfigurationError::ParseError {
            details: format!("Failed to serialize config: {e}"),
        })
    }
}

/// Normalise an API base.
///
/// Absolute `http(s)` values are used as given, relative paths are resolved
/// against [`DEFAULT_LOCAL_ORIGIN`], and an empty value falls back to
/// [`DEFAULT_API_ORIGIN`]. Trailing slashes are dropped and `/api` is appended
/// unless the path already ends with it.
pub fn resolve_api_base(raw: Option<&str>) -> Result<String, ConfigurationError> {
    let raw = raw.map(str::trim).unwrap_or_default();

    let base = if raw.is_empty() {
        DEFAULT_API_ORIGIN.to_string()
    } else if is_absolute_http(raw) {
        raw.trim_end_matches('/').to_string()
    } else {
        let path = if raw.starts_with('/') {
            raw.to_string()
        } else {
            format!("/{raw}")
        };
        Url::parse(DEFAULT_LOCAL_ORIGIN)
            .and_then(|origin| origin.join(&path))
            .map_err(|e| ConfigurationError::invalid("api_base_url", e.to_string()))?
            .to_string()
            .trim_end_matches('/')
            .to_string()
    };

    if base.to_ascii_lowercase().ends_with("/api") {
        Ok(base)
    } else {
        Ok(format!("{base}/api"))
    }
}

fn is_absolute_http(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
