//! Shared plumbing for Monitor360 crates: logging setup and configuration
//! loading/errors.

pub mod config;
pub mod logging;

pub use config::{ConfigLoader, ConfigurationError};
