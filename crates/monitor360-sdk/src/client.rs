//! HTTP client for the Monitor360 API
//!
//! Every request goes through [`AuthenticatedClient::send`], which:
//! - attaches `Authorization: Bearer {token}` from the [`TokenBroker`] cache,
//!   or no credential at all when the cache is empty
//! - adds `Accept: application/json` unless the caller chose an `Accept`
//! - returns the response untouched, logging 401s as unauthorized
//!
//! The client never waits for a session and never retries.
//!
//! ```rust,no_run
//! use monitor360_sdk::auth::{InMemorySessionSource, TokenBroker};
//! use monitor360_sdk::ClientBuilder;
//! use std::sync::Arc;
//!
//! # async fn example() -> monitor360_sdk::Result<()> {
//! let broker = Arc::new(TokenBroker::new(Arc::new(InMemorySessionSource::new())));
//! let client = ClientBuilder::default()
//!     .base_url("https://monitor.example.com/api")
//!     .broker(broker)
//!     .build()?;
//!
//! let devices: serde_json::Value = client.get_json("/devices").await?;
//! # let _ = devices;
//! # Ok(())
//! # }
//! ```

use crate::auth::TokenBroker;
use crate::config::{resolve_api_base, SdkConfig};
use crate::error::{ApiError, Result};
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Method, Request, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default timeout in seconds for API requests
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

const JSON: &str = "application/json";

/// Terminal state of a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Success,
    /// The server rejected the credential, or its absence
    Unauthorized,
    OtherFailure,
}

impl RequestOutcome {
    pub fn from_status(status: StatusCode) -> Self {
        if status == StatusCode::UNAUTHORIZED {
            RequestOutcome::Unauthorized
        } else if status.is_success() {
            RequestOutcome::Success
        } else {
            RequestOutcome::OtherFailure
        }
    }

    pub fn of(response: &Response) -> Self {
        Self::from_status(response.status())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestOutcome::Success => "success",
            RequestOutcome::Unauthorized => "unauthorized",
            RequestOutcome::OtherFailure => "failure",
        }
    }
}

impl fmt::Display for RequestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a credential went out with a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    Attached,
    Omitted,
}

/// HTTP client that mirrors the broker's current session on every request
#[derive(Debug, Clone)]
pub struct AuthenticatedClient {
    http_client: reqwest::Client,
    base_url: String,
    broker: Arc<TokenBroker>,
}

impl AuthenticatedClient {
    fn new(
        base_url: impl Into<String>,
        http_client: reqwest::Client,
        broker: Arc<TokenBroker>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            broker,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn broker(&self) -> &Arc<TokenBroker> {
        &self.broker
    }

    /// Absolute URL for `path`; absolute `http(s)` inputs pass through
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Start a request against the API. Credentials are applied by [`send`](Self::send).
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http_client.request(method, self.url(path))
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.request(Method::POST, path)
    }

    pub fn put(&self, path: &str) -> RequestBuilder {
        self.request(Method::PUT, path)
    }

    pub fn delete_request(&self, path: &str) -> RequestBuilder {
        self.request(Method::DELETE, path)
    }

    /// Apply the default `Accept` header and the cached credential.
    ///
    /// Reads the broker cache only; never waits for a session.
    pub fn authorize(&self, request: &mut Request) -> Credential {
        let headers = request.headers_mut();
        if !headers.contains_key(ACCEPT) {
            headers.insert(ACCEPT, HeaderValue::from_static(JSON));
        }

        let Some(token) = self.broker.peek_token() else {
            return Credential::Omitted;
        };

        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
                Credential::Attached
            }
            Err(_) => {
                warn!("Cached token is not a valid header value, sending without credential");
                Credential::Omitted
            }
        }
    }

    /// Send a request with the current credential.
    ///
    /// The response comes back unchanged whatever its status, and transport
    /// errors surface as [`ApiError::HttpClient`]. Nothing is retried.
    pub async fn send(&self, mut request: Request) -> Result<Response> {
        let credential = self.authorize(&mut request);
        let method = request.method().clone();
        let path = request.url().path().to_string();

        let response = match self.http_client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    %method,
                    %path,
                    outcome = %RequestOutcome::OtherFailure,
                    "Request failed in transport: {}",
                    e
                );
                return Err(ApiError::HttpClient(e));
            }
        };

        let status = response.status();
        match RequestOutcome::from_status(status) {
            RequestOutcome::Unauthorized if credential == Credential::Attached => warn!(
                %method,
                %path,
                outcome = %RequestOutcome::Unauthorized,
                "Request rejected; session token likely expired"
            ),
            RequestOutcome::Unauthorized => debug!(
                %method,
                %path,
                outcome = %RequestOutcome::Unauthorized,
                "Request rejected; no session token cached"
            ),
            outcome => debug!(%method, %path, %status, %outcome, "Request completed"),
        }

        Ok(response)
    }

    /// GET `path` and decode a JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.get(path).build()?;
        let response = self.send(request).await?;
        Self::handle_response(response).await
    }

    /// POST a JSON body to `path` and decode a JSON body
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let request = self.post(path).json(body).build()?;
        let response = self.send(request).await?;
        Self::handle_response(response).await
    }

    /// DELETE `path`, discarding any body
    pub async fn delete(&self, path: &str) -> Result<()> {
        let request = self.delete_request(path).build()?;
        let response = self.send(request).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Self::handle_error_response(response).await
        }
    }

    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
        if response.status().is_success() {
            response.json().await.map_err(ApiError::HttpClient)
        } else {
            Self::handle_error_response(response).await
        }
    }

    async fn handle_error_response<T>(response: Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_status(status, &body))
    }
}

/// Builder for constructing an AuthenticatedClient with custom configuration
#[derive(Default)]
pub struct ClientBuilder {
    base_url: Option<String>,
    broker: Option<Arc<TokenBroker>>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    pool_max_idle_per_host: Option<usize>,
}

impl ClientBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed base URL and timeouts from loaded configuration
    pub fn from_config(config: &SdkConfig) -> Result<Self> {
        Ok(Self::default()
            .base_url(config.api_base()?)
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout()))
    }

    /// Set the base URL for the API, used verbatim
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Token source for every request (required)
    pub fn broker(mut self, broker: Arc<TokenBroker>) -> Self {
        self.broker = Some(broker);
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the maximum idle connections per host
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = Some(max);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<AuthenticatedClient> {
        let broker = self.broker.ok_or_else(|| ApiError::InvalidRequest {
            message: "A token broker is required; call broker() before build()".into(),
        })?;

        let base_url = match self.base_url {
            Some(url) => url,
            None => resolve_api_base(None)?,
        };

        let mut http = reqwest::Client::builder().timeout(
            self.timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        );
        if let Some(connect_timeout) = self.connect_timeout {
            http = http.connect_timeout(connect_timeout);
        }
        if let Some(max) = self.pool_max_idle_per_host {
            http = http.pool_max_idle_per_host(max);
        }
        let http_client = http.build().map_err(ApiError::HttpClient)?;

        Ok(AuthenticatedClient::new(base_url, http_client, broker))
    }
}
