use std::fmt;

/// A pipeline step wrapping exactly one external tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    QualityControl,
    Denoise,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 2] = [Stage::QualityControl, Stage::Denoise];

    /// Human-readable stage name used in reports and errors.
    pub fn name(self) -> &'static str {
        match self {
            Stage::QualityControl => "Quality Control",
            Stage::Denoise => "Denoising",
        }
    }

    /// Subdirectory of the output root owned by this stage.
    pub fn output_subdir(self) -> &'static str {
        match self {
            Stage::QualityControl => "qc_results",
            Stage::Denoise => "denoise_results",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parameters for the QC tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QcParams {
    pub min_quality: u32,
    pub threads: usize,
}

/// Parameters for the denoise tool.
///
/// `min_reads` and `max_ee` are carried for reporting; the current tool
/// contract only receives the thread count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DenoiseParams {
    pub min_reads: u32,
    pub max_ee: f64,
    pub threads: usize,
}

/// Typed parameters for one stage, fixed before the stage runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StageConfig {
    QualityControl(QcParams),
    Denoise(DenoiseParams),
}

impl StageConfig {
    pub fn stage(&self) -> Stage {
        match self {
            StageConfig::QualityControl(_) => Stage::QualityControl,
            StageConfig::Denoise(_) => Stage::Denoise,
        }
    }

    pub fn threads(&self) -> usize {
        match self {
            StageConfig::QualityControl(params) => params.threads,
            StageConfig::Denoise(params) => params.threads,
        }
    }
}
