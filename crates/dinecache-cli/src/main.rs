//! dinecache - a restaurant directory that keeps working offline.
//!
//! Reads are served from the local database once it holds the whole
//! directory. Favorites and reviews are written locally first; reviews added
//! while offline are pushed by `dinecache sync`.

mod app;
mod args;
mod output;

use std::io;

use anyhow::Result;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use args::{Command, Invocation};
use dinecache_core::Config;

/// Log file name prefix; the appender adds the date
const LOG_FILE_PREFIX: &str = "dinecache.log";

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the file writer when dropped and must live
/// until the process exits.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let mut guard = None;
    let file_layer = if config.log_to_file {
        match config.log_dir() {
            Ok(dir) => {
                let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
                let (writer, worker_guard) = tracing_appender::non_blocking(appender);
                guard = Some(worker_guard);
                Some(fmt::layer().with_ansi(false).with_writer(writer))
            }
            Err(e) => {
                eprintln!("File logging disabled: {}", e);
                None
            }
        }
    } else {
        None
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

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Ignoring unreadable config: {}", e);
            Config::default()
        }
    };
    let _log_guard = init_tracing(&config);

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let invocation = match Invocation::parse(&argv) {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("Error: {}\n", e);
            eprintln!("{}", args::USAGE);
            std::process::exit(2);
        }
    };
    if invocation.command == Command::Help {
        println!("{}", args::USAGE);
        return Ok(());
    }

    info!(online = !invocation.offline, "dinecache starting");
    let mut app = App::new(config, !invocation.offline).await?;
    let result = app.run(invocation.command).await;

    if let Err(e) = app.save_config() {
        warn!(error = %e, "Failed to save config");
    }

    result
}
