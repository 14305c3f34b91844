use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::stage::{DenoiseParams, QcParams};

/// Directory name used under the platform data, cache and config directories.
pub const APP_DIR_NAME: &str = "qimba";

/// Persisted user settings.
///
/// Every field has a default so the tool runs without a config file.
/// Unknown keys in the YAML document are ignored and missing keys fall back
/// to the values below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Echo external command lines before running them.
    pub verbose: bool,

    /// Thread count handed to the external tools.
    pub threads: usize,

    /// Per-stage process timeout in seconds. `0` disables the timeout.
    pub timeout_secs: u64,

    pub qc: QcSettings,
    pub denoise: DenoiseSettings,

    /// Directory for persistent data.
    pub data_dir: Utf8PathBuf,

    /// Directory for temporary files.
    pub temp_dir: Utf8PathBuf,
}

/// Quality control settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QcSettings {
    /// Executable invoked for the QC stage.
    pub tool: String,
    pub min_quality: u32,
    pub min_length: u32,
    pub max_n: u32,
}

/// Denoising settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DenoiseSettings {
    /// Executable invoked for the denoise stage.
    pub tool: String,
    pub min_reads: u32,
    pub max_ee: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            verbose: false,
            threads: 1,
            timeout_secs: 0,
            qc: QcSettings::default(),
            denoise: DenoiseSettings::default(),
            data_dir: default_data_dir(),
            temp_dir: default_temp_dir(),
        }
    }
}

impl Default for QcSettings {
    fn default() -> Self {
        Self {
            tool: "fastqc".to_string(),
            min_quality: 20,
            min_length: 100,
            max_n: 0,
        }
    }
}

impl Default for DenoiseSettings {
    fn default() -> Self {
        Self {
            tool: "denoiser".to_string(),
            min_reads: 10,
            max_ee: 1.0,
        }
    }
}

impl Settings {
    /// Process timeout for a single stage, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// QC parameters derived from these settings.
    pub fn qc_params(&self, threads: usize) -> QcParams {
        QcParams {
            min_quality: self.qc.min_quality,
            threads,
        }
    }

    /// Denoise parameters derived from these settings.
    pub fn denoise_params(&self, threads: usize) -> DenoiseParams {
        DenoiseParams {
            min_reads: self.denoise.min_reads,
            max_ee: self.denoise.max_ee,
            threads,
        }
    }
}

fn default_data_dir() -> Utf8PathBuf {
    platform_dir(dirs::data_local_dir(), ".qimba/data")
}

fn default_temp_dir() -> Utf8PathBuf {
    platform_dir(dirs::cache_dir(), ".qimba/cache")
}

fn platform_dir(base: Option<std::path::PathBuf>, fallback: &str) -> Utf8PathBuf {
    base.and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok())
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| Utf8PathBuf::from(fallback))
}
