use clap::Subcommand;

/// Main CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Wait for a session token and report whether one is available
    Token {
        /// Wait budget in milliseconds (defaults to wait.timeout_ms)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Fail instead of reporting "no session" when the wait expires
        #[arg(long)]
        require_auth: bool,
    },

    /// Send an authenticated GET and report how it was classified
    Get {
        /// API path, relative to the configured base
        path: String,
    },

    /// Show the effective configuration
    Config {
        /// Print an example configuration file instead
        #[arg(long)]
        example: bool,
    },
}
