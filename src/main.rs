//! Qimba - command-line entry point.
//!
//! # Execution Flow
//!
//! 1. Parse arguments (clap)
//! 2. Resolve the config path (`--config`, `QIMBA_CONFIG`, the platform
//!    default, or `.qimba/config.yaml` without one) and load settings; a
//!    broken file falls back to defaults
//! 3. Initialize logging (stderr, plus a rotating file with `--log-dir`)
//! 4. Build a current-thread tokio runtime; stages run one at a time
//! 5. Wire Ctrl-C to the cancellation token so a running tool is killed
//! 6. Dispatch the subcommand; any error exits non-zero

use anyhow::Result;
use clap::Parser;
use qimba::cli::{AppContext, Cli};
use qimba::{APP_NAME, ConfigManager, Settings, VERSION};
use tokio::sync::watch;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, config_dir_error) = ConfigManager::resolve(cli.config.clone());
    let loaded = config.try_load();
    let settings = loaded.as_ref().cloned().unwrap_or_else(|_| Settings::default());
    let verbose = cli.verbose || settings.verbose;

    let _guard = qimba::logging::setup_logging(verbose, cli.log_dir.as_deref())?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);
    if let Some(error) = config_dir_error {
        tracing::warn!("{}; using {}", error, config.config_path());
    }
    if let Err(error) = loaded {
        tracing::warn!("Failed to load configuration: {}; using defaults", error);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let ctx = AppContext {
        config,
        settings,
        verbose,
        cancel: cancel_rx,
    };

    runtime.block_on(async move {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received - cancelling running stage");
                let _ = cancel_tx.send(true);
            }
        });

        cli.execute(&ctx).await
    })
}
