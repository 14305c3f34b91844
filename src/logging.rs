use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Log file prefix inside the log directory.
pub const LOG_PREFIX: &str = "qimba";

/// Console filter: `RUST_LOG` if set, otherwise `info` when verbose and
/// `warn` when not.
pub fn console_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("info")
        } else {
            EnvFilter::new("warn")
        }
    })
}

/// Create the log directory if it doesn't exist.
pub fn ensure_log_dir(log_dir: &Utf8Path) -> Result<()> {
    if !log_dir.exists() {
        fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir))?;
    }
    Ok(())
}

/// Setup logging to stderr with an optional rotating file log.
///
/// The console layer follows [`console_filter`]. When `log_dir` is given, a
/// daily rotating file (`<log_dir>/qimba.<date>`) records everything at debug
/// level.
///
/// # Returns
/// A guard that must be held for the duration of the program to keep file
/// logging active, or `None` without a log directory.
pub fn setup_logging(verbose: bool, log_dir: Option<&Utf8Path>) -> Result<Option<WorkerGuard>> {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .with_filter(console_filter(verbose));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            ensure_log_dir(dir)?;

            // Create daily rotating file appender
            let file_appender = rolling::daily(dir, LOG_PREFIX);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false) // No ANSI codes in log files
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(EnvFilter::new("debug"));

            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::debug!(
        "Logging initialized: verbose={}, log_dir={}",
        verbose,
        log_dir.map_or("<none>", |dir| dir.as_str())
    );

    Ok(guard)
}
