//! Main entry point for the Monitor360 CLI

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use monitor360_cli::cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    color_eyre::config::HookBuilder::default()
        .display_location_section(false)
        .display_env_section(false)
        .install()?;

    // Quiet unless -v or RUST_LOG asks for output
    monitor360_common::logging::init_cli_logging(
        &args.verbosity,
        "m360=info,monitor360_sdk=info",
    )
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

    Ok(args.run().await?)
}
