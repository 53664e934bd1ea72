//! Session types, auth-state events and auth errors

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Result type for session operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Default upper bound for [`WaitOptions::timeout`]
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_millis(8000);

/// Interval between cache checks while waiting for a token
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// An authenticated session as reported by the identity provider.
///
/// Expiry is tracked by the provider; the SDK only reads `access_token`.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    /// Bearer token attached to API requests
    pub access_token: String,
    /// Token type (usually "bearer")
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Expiration as a Unix timestamp, if the provider reported one
    #[serde(default)]
    pub expires_at: Option<u64>,
    /// Identity of the signed-in user
    #[serde(default)]
    pub user_id: Option<String>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: default_token_type(),
            expires_at: None,
            user_id: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_expires_at(mut self, expires_at: u64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Whether the provider-reported expiry has passed.
    /// Sessions without an expiry never report expired.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                let now = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_secs();
                now >= expires_at
            }
            None => false,
        }
    }

    /// The bearer credential, or `None` when the token is blank.
    pub fn bearer(&self) -> Option<&str> {
        let token = self.access_token.trim();
        (!token.is_empty()).then_some(token)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Kind of auth-state transition reported by the identity provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthChange {
    /// Delivered once per subscription with the session at that time
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

impl fmt::Display for AuthChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthChange::InitialSession => "INITIAL_SESSION",
            AuthChange::SignedIn => "SIGNED_IN",
            AuthChange::SignedOut => "SIGNED_OUT",
            AuthChange::TokenRefreshed => "TOKEN_REFRESHED",
            AuthChange::UserUpdated => "USER_UPDATED",
        };
        f.write_str(name)
    }
}

/// A single push notification from a [`super::SessionSource`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub change: AuthChange,
    pub session: Option<Session>,
}

impl SessionEvent {
    pub fn new(change: AuthChange, session: Option<Session>) -> Self {
        Self { change, session }
    }

    pub fn signed_in(session: Session) -> Self {
        Self::new(AuthChange::SignedIn, Some(session))
    }

    pub fn refreshed(session: Session) -> Self {
        Self::new(AuthChange::TokenRefreshed, Some(session))
    }

    pub fn signed_out() -> Self {
        Self::new(AuthChange::SignedOut, None)
    }

    /// The token this event projects into the cache
    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().and_then(Session::bearer)
    }
}

/// Options for [`super::TokenBroker::await_token`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Wall-clock budget measured from the start of the call
    pub timeout: Duration,
    /// Fail with [`AuthError::AuthTimeout`] instead of returning `None`
    pub require_auth: bool,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_WAIT_TIMEOUT,
            require_auth: false,
        }
    }
}

impl WaitOptions {
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout = Duration::from_millis(timeout_ms);
        self
    }

    pub fn require_auth(mut self, require_auth: bool) -> Self {
        self.require_auth = require_auth;
        self
    }
}

/// Session synchronisation errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No token appeared before the deadline and one was required
    #[error("No session available after waiting {waited:?}")]
    AuthTimeout { waited: Duration },

    /// The wait was cancelled by the caller before it resolved
    #[error("Wait for session was cancelled")]
    Cancelled,

    /// The identity provider client failed to answer a pull
    #[error("Session source error: {0}")]
    SessionSource(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl AuthError {
    /// Timeouts and cancellations are caller-recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AuthError::AuthTimeout { .. } | AuthError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_token() {
        let session = Session::new("secret-token").with_user("user-1");
        let rendered = format!("{:?}", session);
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("user-1"));
    }

    #[test]
    fn test_blank_token_is_not_a_bearer() {
        assert_eq!(Session::new("   ").bearer(), None);
        assert_eq!(Session::new(" abc ").bearer(), Some("abc"));
    }

    #[test]
    fn test_expiry() {
        assert!(!Session::new("t").is_expired());
        assert!(Session::new("t").with_expires_at(1).is_expired());
        assert!(!Session::new("t").with_expires_at(u64::MAX).is_expired());
    }

    #[test]
    fn test_event_token_projection() {
        assert_eq!(SessionEvent::signed_in(Session::new("a")).token(), Some("a"));
        assert_eq!(SessionEvent::signed_out().token(), None);
    }

    #[test]
    fn test_wait_options_defaults() {
        let options = WaitOptions::default();
        assert_eq!(options.timeout, Duration::from_millis(8000));
        assert!(!options.require_auth);

        let options = options.timeout_ms(0).require_auth(true);
        assert_eq!(options.timeout, Duration::ZERO);
        assert!(options.require_auth);
    }

    #[test]
    fn test_session_deserializes_with_defaults() {
        let session: Session = serde_json::from_str(r#"{"access_token":"abc"}"#).unwrap();
        assert_eq!(session.token_type, "bearer");
        assert_eq!(session.user_id, None);
    }
}
