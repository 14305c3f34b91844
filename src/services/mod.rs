//! Services module - external process execution for pipeline stages.
//!
//! # Components
//!
//! - [`ProcessRunner`]: runs one external program, capturing stdout/stderr and
//!   exit status. Supports an optional timeout and a cancellation token
//!   (`tokio::sync::watch`). Every failure is reported as an
//!   [`ExecutionResult`](crate::models::ExecutionResult), never as an `Err`.
//!
//! - [`ToolAdapters`]: turn typed stage parameters into argument vectors for
//!   the configured QC and denoise executables and hand them to the runner.
//!
//! - [`StageExecutor`]: the trait the orchestrator drives. `ToolAdapters`
//!   implements it; tests provide their own.
//!
//! # Usage Example
//!
//! ```ignore
//! use qimba::services::{ProcessRunner, ToolAdapters};
//!
//! let runner = ProcessRunner::new()
//!     .with_verbose(true)
//!     .with_timeout(Some(Duration::from_secs(3600)));
//! let adapters = ToolAdapters::from_settings(&settings, runner);
//!
//! let result = adapters.run_qc(input_dir, output_dir, &settings.qc_params(4)).await;
//! if !result.is_success() {
//!     eprintln!("{}", result.error_message());
//! }
//! ```
//!
//! # Tool contract
//!
//! The adapters fix the argument *shape*; the binary comes from configuration:
//!
//! - QC: `<qc.tool> -o <output> -t <threads> -q <min_quality> <input>`
//! - Denoise: `<denoise.tool> -i <input> -o <output> -t <threads>`

pub mod runner;
pub mod tools;

pub use runner::{ProcessError, ProcessRunner};
pub use tools::{StageExecutor, ToolAdapters, denoise_command, qc_command};
