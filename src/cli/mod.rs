//! Command-line surface.
//!
//! Thin glue over the library: parses arguments with clap, resolves options
//! against the loaded [`Settings`](crate::models::Settings) and renders
//! results. All orchestration lives in [`crate::pipeline`].

pub mod commands;
pub mod report;

pub use commands::AppContext;
pub use report::ConsoleReporter;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Qimba: a modern bioinformatics analysis pipeline.
#[derive(Parser, Debug)]
#[command(name = "qimba", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "QIMBA_CONFIG")]
    pub config: Option<Utf8PathBuf>,

    /// Enable verbose output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Also write debug logs to a daily rotating file in this directory
    #[arg(long, global = true)]
    pub log_dir: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the complete analysis pipeline (QC, then denoising)
    Run(RunArgs),

    /// Run quality control analysis
    Qc(QcArgs),

    /// Denoise quality-filtered sequencing data
    Denoise(DenoiseArgs),

    /// Manage configuration settings
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Input directory containing raw data
    pub input_dir: Utf8PathBuf,

    /// Output directory for results
    #[arg(short, long, default_value = "./qimba_output")]
    pub output: Utf8PathBuf,

    /// Number of threads to use [default: from config]
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Skip quality control step
    #[arg(long)]
    pub skip_qc: bool,
}

#[derive(Args, Debug)]
pub struct QcArgs {
    /// Input directory containing raw data
    pub input_dir: Utf8PathBuf,

    /// Output directory for QC results [default: <INPUT_DIR>/qc_results]
    #[arg(short, long)]
    pub output: Option<Utf8PathBuf>,

    /// Minimum quality score threshold [default: from config]
    #[arg(short = 'q', long)]
    pub min_quality: Option<u32>,

    /// Number of threads to use [default: from config]
    #[arg(short, long)]
    pub threads: Option<usize>,
}

#[derive(Args, Debug)]
pub struct DenoiseArgs {
    /// Input directory containing QC-passed data
    pub input_dir: Utf8PathBuf,

    /// Output directory for denoised results [default: <INPUT_DIR>/denoise_results]
    #[arg(short, long)]
    pub output: Option<Utf8PathBuf>,

    /// Minimum number of reads to retain a sequence [default: from config]
    #[arg(long)]
    pub min_reads: Option<u32>,

    /// Maximum expected error rate [default: from config]
    #[arg(long)]
    pub max_ee: Option<f64>,

    /// Number of threads to use [default: from config]
    #[arg(short, long)]
    pub threads: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum ConfigAction {
    /// Show current configuration settings (default)
    Show,

    /// Initialize a new configuration file with default settings
    Init {
        /// Output path for config file [default: the active config path]
        #[arg(short, long)]
        output: Option<Utf8PathBuf>,

        /// Overwrite existing config file
        #[arg(short, long)]
        force: bool,
    },

    /// Modify a configuration setting
    Edit {
        /// Setting to modify (e.g., qc.min_quality)
        setting: String,

        /// New value
        value: String,
    },
}
