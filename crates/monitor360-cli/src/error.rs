//! Error types for the Monitor360 CLI

use color_eyre::eyre::Report;
use thiserror::Error;

/// CLI error type with minimal variants
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration file issues
    #[error("Configuration error: {0}")]
    Config(#[from] monitor360_common::ConfigurationError),

    /// API communication errors
    #[error("API error: {0}")]
    Api(#[from] monitor360_sdk::ApiError),

    /// Session availability issues
    #[error(transparent)]
    Auth(#[from] monitor360_sdk::auth::AuthError),

    /// Everything else (using color-eyre's Report for rich errors)
    #[error(transparent)]
    Internal(#[from] Report),
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
