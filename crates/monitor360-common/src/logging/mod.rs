//! Tracing setup for the `m360` binary and anything else embedding the SDK
//!
//! Filter priority, highest first:
//! 1. CLI flags (`-v/-q`)
//! 2. `RUST_LOG` environment variable
//! 3. The caller-supplied default filter, e.g. `monitor360_sdk=info`
//!
//! Token broker transitions log at `info`, cache hydration and unchanged
//! refreshes at `debug`, so `monitor360_sdk=debug` shows every session event.

use anyhow::Result;
use clap_verbosity_flag::{LogLevel, Verbosity};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Resolve the filter without installing anything. An explicit `-v/-q`
/// level replaces both `RUST_LOG` and the default.
pub fn build_filter<L: LogLevel>(
    verbosity: &Verbosity<L>,
    default_filter: &str,
) -> Result<EnvFilter> {
    let filter = if let Some(log_level) = verbosity.log_level() {
        EnvFilter::try_new(format!("{}", log_level))?
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
    };
    Ok(filter)
}

/// Install a compact fmt subscriber with target, file and line on every event.
///
/// Fails if a global subscriber is already set, e.g. when an embedding
/// application configured tracing first.
///
/// # Example
///
/// ```no_run
/// use clap::Parser;
/// use clap_verbosity_flag::{Verbosity, InfoLevel};
/// use monitor360_common::logging;
///
/// #[derive(Parser)]
/// struct Args {
///     #[clap(flatten)]
///     verbosity: Verbosity<InfoLevel>,
/// }
///
/// let args = Args::parse();
/// logging::init_logging(&args.verbosity, "monitor360_sdk=info").unwrap();
/// ```
pub fn init_logging<L: LogLevel>(verbosity: &Verbosity<L>, default_filter: &str) -> Result<()> {
    let filter = build_filter(verbosity, default_filter)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .try_init()?;

    Ok(())
}

/// Like [`init_logging`], but installs nothing unless asked to.
///
/// `m360` prints command results on stdout and keeps the terminal free of
/// log lines until `-v` or `RUST_LOG` is given. Returns whether a subscriber
/// was installed.
pub fn init_cli_logging<L: LogLevel>(
    verbosity: &Verbosity<L>,
    default_filter: &str,
) -> Result<bool> {
    if verbosity.log_level().is_some() || std::env::var("RUST_LOG").is_ok() {
        init_logging(verbosity, default_filter)?;
        Ok(true)
    } else {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap_verbosity_flag::{InfoLevel, OffLevel};

    #[test]
    fn test_default_filter_used_without_flags() {
        let verbosity = Verbosity::<OffLevel>::default();
        // OffLevel yields no explicit level, so the filter falls back to RUST_LOG or the default
        let filter = build_filter(&verbosity, "monitor360_sdk=debug");
        assert!(filter.is_ok());
    }

    #[test]
    fn test_flag_level_wins() {
        let verbosity = Verbosity::<InfoLevel>::new(1, 0);
        let filter = build_filter(&verbosity, "off").unwrap();
        assert_eq!(
            filter.max_level_hint(),
            Some(tracing_subscriber::filter::LevelFilter::DEBUG)
        );
    }
}
