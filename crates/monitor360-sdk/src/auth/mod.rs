//! Session synchronisation
//!
//! This module provides:
//! - The session model delivered by the identity provider
//! - The `SessionSource` seam (pull + push) and its in-memory implementation
//! - The `TokenBroker` cache with non-blocking and bounded-wait accessors
//! - Resolution of an initial session from the environment or a credentials file

pub mod broker;
pub mod memory;
pub mod source;
pub mod token_resolver;
pub mod types;

pub use broker::TokenBroker;
pub use memory::InMemorySessionSource;
pub use source::{SessionObserver, SessionSource, Subscription};
pub use token_resolver::TokenResolver;
pub use types::{AuthChange, AuthError, AuthResult, Session, SessionEvent, WaitOptions};
