//! Command-line interface for the Monitor360 CLI

pub mod args;
pub mod commands;
pub mod handlers;

pub use args::Args;
pub use commands::Commands;
