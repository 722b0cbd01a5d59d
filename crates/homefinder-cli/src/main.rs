//! HomeFinder CLI - browse listings and manage your account from a terminal.
//!
//! The session is kept in the OS keychain by default (`--store file` uses an
//! encrypted file instead); expired access tokens are renewed transparently.

mod cli;
mod commands;

use std::ffi::OsStr;
use std::io;
use std::path::Path;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;
use homefinder_core::Config;

/// Log file name used when `--log-file` names a directory
const DEFAULT_LOG_FILE: &str = "homefinder.log";

/// Initialize the tracing subscriber for logging.
///
/// Returns the guard that flushes the file writer; hold it until exit.
fn init_tracing(log_file: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let (dir, name) = if path.is_dir() {
                (path, OsStr::new(DEFAULT_LOG_FILE))
            } else {
                (
                    path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new(".")),
                    path.file_name().unwrap_or(OsStr::new(DEFAULT_LOG_FILE)),
                )
            };
            let appender = tracing_appender::rolling::daily(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let _guard = init_tracing(cli.log_file.as_deref());
    info!("HomeFinder CLI starting");

    let config = Config::load()?;

    if let Err(e) = commands::run(cli, config).await {
        if let Some(hint) = commands::hint(&e) {
            eprintln!("{}", hint);
        }
        return Err(e);
    }
    Ok(())
}
