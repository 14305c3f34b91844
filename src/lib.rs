// Qimba - a modern bioinformatics analysis pipeline executor
//
// This is the library crate: stage orchestration, external process execution
// and configuration. The binary crate (main.rs) provides the CLI entry point.

pub mod cli;
pub mod config;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod services;

// Re-export commonly used types for convenience
pub use config::{ConfigManager, SettingsRegistry};
pub use models::{ExecutionResult, Settings, Stage, StageConfig};
pub use pipeline::{Pipeline, PipelineContext, PipelineError, PipelineEvent, PipelineState};
pub use services::{ProcessRunner, ToolAdapters};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
