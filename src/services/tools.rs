use camino::Utf8Path;
use std::future::Future;

use super::runner::ProcessRunner;
use crate::models::{DenoiseParams, ExecutionResult, QcParams, Settings, StageConfig};

/// Runs the external tool behind a pipeline stage.
///
/// This is the seam between the orchestrator and the process layer:
/// [`ToolAdapters`] is the real implementation, tests substitute recording
/// fakes.
pub trait StageExecutor {
    /// Execute the stage described by `config`, reading from `input_dir` and
    /// writing into `output_dir`.
    fn execute(
        &self,
        input_dir: &Utf8Path,
        output_dir: &Utf8Path,
        config: &StageConfig,
    ) -> impl Future<Output = ExecutionResult> + Send;
}

/// Build the QC tool command line.
///
/// Shape: `<tool> -o <output> -t <threads> -q <min_quality> <input>`
pub fn qc_command(
    tool: &str,
    input_dir: &Utf8Path,
    output_dir: &Utf8Path,
    params: &QcParams,
) -> Vec<String> {
    vec![
        tool.to_string(),
        "-o".to_string(),
        output_dir.to_string(),
        "-t".to_string(),
        params.threads.to_string(),
        "-q".to_string(),
        params.min_quality.to_string(),
        input_dir.to_string(),
    ]
}

/// Build the denoise tool command line.
///
/// Shape: `<tool> -i <input> -o <output> -t <threads>`
pub fn denoise_command(
    tool: &str,
    input_dir: &Utf8Path,
    output_dir: &Utf8Path,
    params: &DenoiseParams,
) -> Vec<String> {
    vec![
        tool.to_string(),
        "-i".to_string(),
        input_dir.to_string(),
        "-o".to_string(),
        output_dir.to_string(),
        "-t".to_string(),
        params.threads.to_string(),
    ]
}

/// Adapters for the configured QC and denoise executables.
///
/// The adapters hold no state beyond the tool names and the runner; they
/// never inspect the result they hand back.
#[derive(Debug, Clone)]
pub struct ToolAdapters {
    runner: ProcessRunner,
    qc_tool: String,
    denoise_tool: String,
}

impl ToolAdapters {
    pub fn new(
        runner: ProcessRunner,
        qc_tool: impl Into<String>,
        denoise_tool: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            qc_tool: qc_tool.into(),
            denoise_tool: denoise_tool.into(),
        }
    }

    /// Adapters for the tools named in `settings`.
    pub fn from_settings(settings: &Settings, runner: ProcessRunner) -> Self {
        Self::new(runner, &settings.qc.tool, &settings.denoise.tool)
    }

    pub fn qc_tool(&self) -> &str {
        &self.qc_tool
    }

    pub fn denoise_tool(&self) -> &str {
        &self.denoise_tool
    }

    /// Run the quality control tool.
    pub async fn run_qc(
        &self,
        input_dir: &Utf8Path,
        output_dir: &Utf8Path,
        params: &QcParams,
    ) -> ExecutionResult {
        let argv = qc_command(&self.qc_tool, input_dir, output_dir, params);
        self.runner.run(&argv, true).await
    }

    /// Run the denoising tool.
    pub async fn run_denoise(
        &self,
        input_dir: &Utf8Path,
        output_dir: &Utf8Path,
        params: &DenoiseParams,
    ) -> ExecutionResult {
        tracing::debug!(
            "Denoise thresholds: min_reads={}, max_ee={}",
            params.min_reads,
            params.max_ee
        );
        let argv = denoise_command(&self.denoise_tool, input_dir, output_dir, params);
        self.runner.run(&argv, true).await
    }
}

impl StageExecutor for ToolAdapters {
    async fn execute(
        &self,
        input_dir: &Utf8Path,
        output_dir: &Utf8Path,
        config: &StageConfig,
    ) -> ExecutionResult {
        match config {
            StageConfig::QualityControl(params) => {
                self.run_qc(input_dir, output_dir, params).await
            }
            StageConfig::Denoise(params) => self.run_denoise(input_dir, output_dir, params).await,
        }
    }
}
