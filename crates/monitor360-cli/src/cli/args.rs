use crate::cli::{commands::Commands, handlers};
use crate::error::Result;
use clap::Parser;
use clap_verbosity_flag::{OffLevel, Verbosity};
use std::path::PathBuf;

/// Monitor360 CLI - session and API access checks
#[derive(Parser, Debug)]
#[command(
    name = "m360",
    author = "Monitor360 Team",
    version,
    about = "Monitor360 CLI - session and API access checks",
    long_about = "Checks that a Monitor360 session is available and that the API accepts it.

EXAMPLES:
  m360 token --require-auth           # Wait for a session token
  m360 get /devices                   # Authenticated GET with classification
  m360 config --example               # Print an example monitor360.toml

A session is taken from MONITOR360_ACCESS_TOKEN or ~/.monitor360/credentials."
)]
pub struct Args {
    /// Configuration file path (defaults to ./monitor360.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub verbosity: Verbosity<OffLevel>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Args {
    /// Execute the CLI command
    pub async fn run(self) -> Result<()> {
        let config_path = self.config.as_deref();

        match self.command {
            Commands::Token {
                timeout_ms,
                require_auth,
            } => handlers::handle_token(config_path, timeout_ms, require_auth).await,
            Commands::Get { path } => handlers::handle_get(config_path, &path).await,
            Commands::Config { example } => handlers::handle_config(config_path, example),
        }
    }
}
