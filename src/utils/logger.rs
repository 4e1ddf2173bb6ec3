use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use chrono::Local;
use tracing::info;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Installs the global tracing subscriber
///
/// Logs go to stderr, or to a timestamped file inside `log_dir` when one is
/// given; stdout is reserved for results. `RUST_LOG` overrides the default
/// level, which is `warn`, or `info` in verbose mode.
pub fn init_logger(verbose: bool, log_dir: Option<&Path>) -> Result<()> {
    let default_level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let writer = match log_dir {
        Some(dir) => {
            // Create log directory if it doesn't exist
            if !dir.exists() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("unable to create log directory {}", dir.display()))?;
            }
            let timestamp = Local::now().format("%Y%m%d_%H%M%S");
            let log_file = dir.join(format!("urlbits_{}.log", timestamp));
            BoxMakeWriter::new(Mutex::new(fs::File::create(log_file)?))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(log_dir.is_none())
        .with_writer(writer)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    info!("Logger initialized");

    Ok(())
}
