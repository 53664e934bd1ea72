//! Monitor360 SDK
//!
//! Keeps outgoing API credentials in step with a session owned by an external
//! identity provider:
//!
//! - [`auth::SessionSource`] is the seam to the identity provider (pull the
//!   current session, subscribe to transitions).
//! - [`auth::TokenBroker`] caches the current bearer token, written only by
//!   its subscription and read synchronously by everything else.
//! - [`AuthenticatedClient`] attaches the cached token to every request and
//!   classifies 401 responses without retrying them.
//!
//! ```rust,no_run
//! use monitor360_sdk::auth::{InMemorySessionSource, TokenBroker, WaitOptions};
//! use monitor360_sdk::ClientBuilder;
//! use std::sync::Arc;
//!
//! # async fn example() -> monitor360_sdk::Result<()> {
//! let source = Arc::new(InMemorySessionSource::new());
//! let broker = Arc::new(TokenBroker::new(source.clone()));
//! broker.start().await;
//!
//! // Before opening a socket, make sure a token has been hydrated
//! let token = broker.await_token(WaitOptions::default()).await?;
//!
//! let client = ClientBuilder::new()
//!     .base_url("http://127.0.0.1:8000/api")
//!     .broker(broker.clone())
//!     .build()?;
//! let response = client.send(client.get("/devices").build()?).await?;
//! # let _ = (token, response);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;

pub use client::{AuthenticatedClient, ClientBuilder, RequestOutcome};
pub use config::{resolve_api_base, IdentityConfig, SdkConfig, WaitConfig};
pub use error::{ApiError, ErrorResponse, Result};
