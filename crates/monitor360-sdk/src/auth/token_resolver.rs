//! Initial session discovery
//!
//! Finds a session that was established outside this process so a source can
//! be seeded before the identity provider starts pushing transitions.

use super::types::{AuthResult, Session};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable holding a ready-made access token
pub const ACCESS_TOKEN_ENV: &str = "MONITOR360_ACCESS_TOKEN";

/// Resolves a session from the environment or a credentials file
pub struct TokenResolver;

impl TokenResolver {
    /// Resolve a session from available sources in priority order
    ///
    /// Priority:
    /// 1. Environment variable (`MONITOR360_ACCESS_TOKEN`)
    /// 2. Credentials file (`~/.monitor360/credentials`)
    ///
    /// Expired sessions are skipped. Returns None if nothing usable is found.
    pub async fn resolve() -> Option<Session> {
        if let Some(session) = Self::from_env() {
            debug!("Using session from environment variable");
            return Some(session);
        }

        if let Some(path) = Self::default_credentials_path() {
            match Self::from_file(&path).await {
                Ok(Some(session)) => {
                    debug!("Using session from credentials file");
                    return Some(session);
                }
                Ok(None) => {}
                Err(e) => warn!("Failed to read credentials file {}: {}", path.display(), e),
            }
        }

        debug!("No session found");
        None
    }

    fn from_env() -> Option<Session> {
        let token = env::var(ACCESS_TOKEN_ENV).ok()?;
        let session = Session::new(token.trim());
        if session.bearer().is_none() {
            debug!("{} is set but empty", ACCESS_TOKEN_ENV);
            return None;
        }
        info!("Found {} in environment", ACCESS_TOKEN_ENV);
        Some(session)
    }

    /// Read a JSON credentials file; a missing file is not an error
    pub async fn from_file(path: &Path) -> AuthResult<Option<Session>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = tokio::fs::read_to_string(path).await?;
        let session: Session = serde_json::from_str(&content)?;

        if session.bearer().is_none() {
            debug!("Credentials file has an empty access token");
            return Ok(None);
        }
        if session.is_expired() {
            debug!("Credentials file session has expired");
            return Ok(None);
        }

        info!("Found session in credentials file");
        Ok(Some(session))
    }

    pub fn default_credentials_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".monitor360").join("credentials"))
    }

    /// Name of the source `resolve` would use, for diagnostics
    pub async fn auth_source() -> Option<&'static str> {
        if Self::from_env().is_some() {
            return Some("environment");
        }
        let path = Self::default_credentials_path()?;
        match Self::from_file(&path).await {
            Ok(Some(_)) => Some("credentials-file"),
            _ => None,
        }
    }
}
