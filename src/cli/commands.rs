use anyhow::{Context, Result, anyhow, bail};
use camino::{Utf8Path, Utf8PathBuf};
use colored::Colorize;
use std::fs;
use tokio::sync::watch;

use super::report::{ConsoleReporter, pipeline_summary, settings_table};
use super::{Cli, Commands, ConfigAction, ConfigArgs, DenoiseArgs, QcArgs, RunArgs};
use crate::config::{ConfigError, ConfigManager, SettingsRegistry};
use crate::models::{Settings, Stage, StageConfig};
use crate::pipeline::{Pipeline, PipelineContext, run_stage};
use crate::services::{ProcessRunner, ToolAdapters};

/// Everything a command needs besides its own arguments.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: ConfigManager,
    pub settings: Settings,
    pub verbose: bool,
    pub cancel: watch::Receiver<bool>,
}

impl AppContext {
    fn runner(&self) -> ProcessRunner {
        ProcessRunner::new()
            .with_verbose(self.verbose)
            .with_timeout(self.settings.timeout())
            .with_cancellation(self.cancel.clone())
    }

    fn adapters(&self) -> ToolAdapters {
        adapters_for(&self.settings, self.runner())
    }

    fn threads(&self, requested: Option<usize>) -> Result<usize> {
        match requested.unwrap_or(self.settings.threads) {
            0 => bail!("Thread count must be at least 1"),
            threads => Ok(threads),
        }
    }
}

impl Cli {
    /// Run the parsed command.
    pub async fn execute(self, ctx: &AppContext) -> Result<()> {
        match self.command {
            Commands::Run(args) => run_pipeline(ctx, args).await,
            Commands::Qc(args) => run_qc(ctx, args).await,
            Commands::Denoise(args) => run_denoise(ctx, args).await,
            Commands::Config(args) => run_config(ctx, args),
        }
    }
}

fn adapters_for(settings: &Settings, runner: ProcessRunner) -> ToolAdapters {
    let adapters = ToolAdapters::from_settings(settings, runner);
    tracing::debug!(
        "Using QC tool {} and denoise tool {}",
        adapters.qc_tool(),
        adapters.denoise_tool()
    );
    adapters
}

fn ensure_input_dir(input_dir: &Utf8Path) -> Result<()> {
    if !input_dir.is_dir() {
        bail!("Input directory does not exist or is not a directory: {}", input_dir);
    }
    Ok(())
}

async fn run_pipeline(ctx: &AppContext, args: RunArgs) -> Result<()> {
    ensure_input_dir(&args.input_dir)?;
    let threads = ctx.threads(args.threads)?;

    fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create output directory: {}", args.output))?;

    let context = PipelineContext::new(args.input_dir, args.output.clone(), threads, ctx.settings.clone());
    let adapters = adapters_for(context.settings(), ctx.runner());
    let mut pipeline = Pipeline::new(context, adapters, ConsoleReporter);
    if args.skip_qc {
        pipeline = pipeline.skip(Stage::QualityControl);
    }

    let report = pipeline.run().await?;
    println!("{}", pipeline_summary(&report, &args.output));
    Ok(())
}

async fn run_qc(ctx: &AppContext, args: QcArgs) -> Result<()> {
    ensure_input_dir(&args.input_dir)?;

    let mut params = ctx.settings.qc_params(ctx.threads(args.threads)?);
    if let Some(min_quality) = args.min_quality {
        params.min_quality = min_quality;
    }

    let output_dir = stage_output(&args.input_dir, args.output, Stage::QualityControl);
    run_stage(
        &ctx.adapters(),
        &ConsoleReporter,
        &args.input_dir,
        &output_dir,
        &StageConfig::QualityControl(params),
    )
    .await?;

    println!("Results saved to: {}", output_dir);
    Ok(())
}

async fn run_denoise(ctx: &AppContext, args: DenoiseArgs) -> Result<()> {
    ensure_input_dir(&args.input_dir)?;

    let mut params = ctx.settings.denoise_params(ctx.threads(args.threads)?);
    if let Some(min_reads) = args.min_reads {
        params.min_reads = min_reads;
    }
    if let Some(max_ee) = args.max_ee {
        if !max_ee.is_finite() || max_ee < 0.0 {
            bail!("--max-ee must be a finite, non-negative number");
        }
        params.max_ee = max_ee;
    }

    let output_dir = stage_output(&args.input_dir, args.output, Stage::Denoise);
    run_stage(
        &ctx.adapters(),
        &ConsoleReporter,
        &args.input_dir,
        &output_dir,
        &StageConfig::Denoise(params),
    )
    .await?;

    println!("Results saved to: {}", output_dir);
    Ok(())
}

/// Explicit output directory, or `<input_dir>/<stage subdir>`.
fn stage_output(input_dir: &Utf8Path, output: Option<Utf8PathBuf>, stage: Stage) -> Utf8PathBuf {
    output.unwrap_or_else(|| input_dir.join(stage.output_subdir()))
}

fn run_config(ctx: &AppContext, args: ConfigArgs) -> Result<()> {
    match args.action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Show => {
            let registry = SettingsRegistry::standard();
            println!("{}", settings_table(ctx.config.config_path(), &ctx.settings, &registry));
        }
        ConfigAction::Init { output, force } => {
            let path = output.unwrap_or_else(|| ctx.config.config_path().to_path_buf());
            ConfigManager::init(&path, force).map_err(|error| match error {
                ConfigError::AlreadyExists(_) => anyhow!("{}. Use --force to overwrite", error),
                other => anyhow::Error::new(other),
            })?;
            println!("{}", format!("Created new config file at {}", path).green());
        }
        ConfigAction::Edit { setting, value } => {
            // Start from the file itself so a document that fails to parse is
            // never replaced by defaults
            let path = ctx.config.config_path();
            let mut settings = ctx.config.read().with_context(|| {
                format!(
                    "Refusing to edit {}; fix it by hand or run `config init --force`",
                    path
                )
            })?;
            SettingsRegistry::standard().apply(&mut settings, &setting, &value)?;
            ctx.config.save(&settings)?;
            println!("{}", format!("Updated {} to {}", setting, value).green());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_output_default() {
        assert_eq!(
            stage_output(Utf8Path::new("raw"), None, Stage::QualityControl),
            Utf8PathBuf::from("raw/qc_results")
        );
        assert_eq!(
            stage_output(Utf8Path::new("raw"), Some("elsewhere".into()), Stage::Denoise),
            Utf8PathBuf::from("elsewhere")
        );
    }

    #[test]
    fn test_zero_threads_rejected() {
        let (_tx, cancel) = watch::channel(false);
        let ctx = AppContext {
            config: ConfigManager::with_path("unused.yaml"),
            settings: Settings::default(),
            verbose: false,
            cancel,
        };

        assert!(ctx.threads(Some(0)).is_err());
        assert_eq!(ctx.threads(None).unwrap(), 1);
        assert_eq!(ctx.threads(Some(8)).unwrap(), 8);
    }
}
