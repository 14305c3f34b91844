//! Data models for qimba.
//!
//! - [`Settings`]: persisted user configuration with QC and denoise sections
//! - [`ExecutionResult`]: uniform outcome of one external process invocation
//! - [`Stage`] / [`StageConfig`]: pipeline steps and their typed parameters
//!
//! Everything here is plain data. Settings derive `Serialize`/`Deserialize`
//! for YAML persistence; the other types are produced and consumed in memory.

pub mod config;
pub mod execution;
pub mod stage;

pub use config::{APP_DIR_NAME, DenoiseSettings, QcSettings, Settings};
pub use execution::ExecutionResult;
pub use stage::{DenoiseParams, QcParams, Stage, StageConfig};
