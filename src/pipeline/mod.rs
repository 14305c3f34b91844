//! Pipeline orchestration.
//!
//! A [`Pipeline`] runs a fixed, ordered list of stages (QC, then Denoise)
//! through a [`StageExecutor`]. Each stage gets its own output directory under
//! the output root, created right before its tool starts. The first stage whose
//! [`ExecutionResult`] is unsuccessful stops the pipeline with a
//! [`PipelineError::StageFailed`]; later stages never run. There is no retry and
//! no rollback.
//!
//! # State machine
//!
//! ```text
//! NotStarted -> Running(stage_i) -> Running(stage_i+1) | Failed(stage_i) | Completed
//! ```
//!
//! Skipped stages do not enter `Running` and do not count as failures.
//!
//! # Usage Example
//!
//! ```ignore
//! let context = PipelineContext::new("raw", "qimba_output", 4, settings);
//! let adapters = ToolAdapters::from_settings(context.settings(), ProcessRunner::new());
//!
//! let mut pipeline = Pipeline::new(context, adapters, NoopObserver).skip(Stage::QualityControl);
//! let report = pipeline.run().await?;
//! ```

pub mod events;

pub use events::{NoopObserver, PipelineEvent, PipelineObserver};

use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::models::{ExecutionResult, Settings, Stage, StageConfig};
use crate::services::StageExecutor;

/// Errors that stop a pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{stage} step failed: {message}")]
    StageFailed { stage: Stage, message: String },

    #[error("Failed to create output directory {path} for {stage}: {source}")]
    OutputDir {
        stage: Stage,
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Pipeline has already been run")]
    AlreadyRun,
}

impl PipelineError {
    /// The stage that failed, if the error belongs to one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::StageFailed { stage, .. } | PipelineError::OutputDir { stage, .. } => {
                Some(*stage)
            }
            PipelineError::AlreadyRun => None,
        }
    }
}

/// Position of a pipeline in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    NotStarted,
    Running(Stage),
    Failed(Stage),
    Completed,
}

/// Inputs shared by every stage of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    input_dir: Utf8PathBuf,
    output_root: Utf8PathBuf,
    threads: usize,
    settings: Settings,
}

impl PipelineContext {
    pub fn new(
        input_dir: impl Into<Utf8PathBuf>,
        output_root: impl Into<Utf8PathBuf>,
        threads: usize,
        settings: Settings,
    ) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_root: output_root.into(),
            threads,
            settings,
        }
    }

    pub fn input_dir(&self) -> &Utf8Path {
        &self.input_dir
    }

    pub fn output_root(&self) -> &Utf8Path {
        &self.output_root
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// `<output_root>/<stage subdir>`
    pub fn stage_output_dir(&self, stage: Stage) -> Utf8PathBuf {
        self.output_root.join(stage.output_subdir())
    }

    /// Typed parameters for `stage`, taken from the settings and thread count.
    pub fn stage_config(&self, stage: Stage) -> StageConfig {
        match stage {
            Stage::QualityControl => {
                StageConfig::QualityControl(self.settings.qc_params(self.threads))
            }
            Stage::Denoise => StageConfig::Denoise(self.settings.denoise_params(self.threads)),
        }
    }
}

/// Result of one completed stage
#[derive(Debug, Clone)]
pub struct StageOutcome {
    pub stage: Stage,
    pub output_dir: Utf8PathBuf,
    pub result: ExecutionResult,
    pub elapsed: Duration,
}

/// Summary of a successful pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub completed: Vec<StageOutcome>,
    pub skipped: Vec<Stage>,
}

impl PipelineReport {
    pub fn total_elapsed(&self) -> Duration {
        self.completed.iter().map(|outcome| outcome.elapsed).sum()
    }
}

/// Run a single stage: create its output directory, execute its tool and
/// turn an unsuccessful result into [`PipelineError::StageFailed`].
pub async fn run_stage<E, O>(
    executor: &E,
    observer: &O,
    input_dir: &Utf8Path,
    output_dir: &Utf8Path,
    config: &StageConfig,
) -> Result<StageOutcome, PipelineError>
where
    E: StageExecutor,
    O: PipelineObserver,
{
    let stage = config.stage();

    fs::create_dir_all(output_dir).map_err(|source| PipelineError::OutputDir {
        stage,
        path: output_dir.to_path_buf(),
        source,
    })?;

    tracing::info!(
        "Starting {} step with {} threads, output: {}",
        stage,
        config.threads(),
        output_dir
    );
    observer.notify(PipelineEvent::StageStarted {
        stage,
        output_dir: output_dir.to_path_buf(),
    });

    let start = Instant::now();
    let result = executor.execute(input_dir, output_dir, config).await;
    let elapsed = start.elapsed();

    observer.notify(PipelineEvent::StageFinished {
        stage,
        success: result.is_success(),
        error: result.error().map(str::to_string),
    });

    if !result.is_success() {
        tracing::error!("{} step failed: {}", stage, result.error_message());
        return Err(PipelineError::StageFailed {
            stage,
            message: result.error_message().to_string(),
        });
    }

    tracing::info!("{} step completed in {:.2}s", stage, elapsed.as_secs_f32());

    Ok(StageOutcome {
        stage,
        output_dir: output_dir.to_path_buf(),
        result,
        elapsed,
    })
}

/// Fail-fast sequencer over [`Stage::ALL`].
pub struct Pipeline<E, O> {
    context: PipelineContext,
    executor: E,
    observer: O,
    stages: Vec<Stage>,
    skipped: HashSet<Stage>,
    state: PipelineState,
}

impl<E, O> Pipeline<E, O>
where
    E: StageExecutor,
    O: PipelineObserver,
{
    pub fn new(context: PipelineContext, executor: E, observer: O) -> Self {
        Self {
            context,
            executor,
            observer,
            stages: Stage::ALL.to_vec(),
            skipped: HashSet::new(),
            state: PipelineState::NotStarted,
        }
    }

    /// Skip `stage` when the pipeline runs.
    pub fn skip(mut self, stage: Stage) -> Self {
        self.skipped.insert(stage);
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Run every stage in order, stopping at the first failure.
    pub async fn run(&mut self) -> Result<PipelineReport, PipelineError> {
        if self.state != PipelineState::NotStarted {
            return Err(PipelineError::AlreadyRun);
        }

        tracing::info!(
            "Running pipeline: input={}, output={}, threads={}",
            self.context.input_dir(),
            self.context.output_root(),
            self.context.threads()
        );

        let mut report = PipelineReport::default();

        for &stage in &self.stages {
            if self.skipped.contains(&stage) {
                tracing::info!("Skipping {} step", stage);
                self.observer.notify(PipelineEvent::StageSkipped { stage });
                report.skipped.push(stage);
                continue;
            }

            self.state = PipelineState::Running(stage);

            let output_dir = self.context.stage_output_dir(stage);
            let config = self.context.stage_config(stage);

            match run_stage(
                &self.executor,
                &self.observer,
                self.context.input_dir(),
                &output_dir,
                &config,
            )
            .await
            {
                Ok(outcome) => report.completed.push(outcome),
                Err(error) => {
                    self.state = PipelineState::Failed(stage);
                    self.observer
                        .notify(PipelineEvent::PipelineFinished { success: false });
                    return Err(error);
                }
            }
        }

        self.state = PipelineState::Completed;
        self.observer
            .notify(PipelineEvent::PipelineFinished { success: true });

        tracing::info!(
            "Pipeline completed: {} stages run, {} skipped",
            report.completed.len(),
            report.skipped.len()
        );

        Ok(report)
    }
}
