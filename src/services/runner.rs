use std::io;
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::watch;
use tokio::time::timeout;

use crate::models::ExecutionResult;

/// Errors that can occur while running an external command
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("No command given")]
    EmptyCommand,

    #[error("Failed to start {program}: {source}")]
    Start {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to wait for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Command failed with exit code {code}: {stderr}")]
    Exit { code: i32, stderr: String },

    #[error("Command terminated by signal: {stderr}")]
    Terminated { stderr: String },

    #[error("Command timed out after {0:?}")]
    Timeout(Duration),

    #[error("Command cancelled")]
    Cancelled,
}

/// Runs external programs and reports their outcome as an [`ExecutionResult`].
///
/// Every invocation is awaited to completion before `run` returns, so callers
/// that await each run in turn never have two tools running at once.
///
/// Failures of any kind (missing binary, non-zero exit, timeout,
/// cancellation) are returned as data, never as an `Err`.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    /// Echo command lines at `info` level instead of `debug`
    verbose: bool,

    /// Upper bound on a single invocation; `None` waits indefinitely
    timeout: Option<Duration>,

    /// Cancellation token; sending `true` kills the running child
    cancel: Option<watch::Receiver<bool>>,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Run `argv[0]` with the remaining arguments.
    ///
    /// With `check` set, a non-zero exit is a failure carrying the exit code
    /// and stderr. Without it, the run counts as successful whatever the
    /// exit code.
    pub async fn run(&self, argv: &[String], check: bool) -> ExecutionResult {
        match self.try_run(argv).await {
            Ok(output) => {
                let code = output.status.code();
                let stdout = String::from_utf8_lossy(&output.stdout).into_owned();

                if output.status.success() || !check {
                    return ExecutionResult::succeeded(stdout).with_exit_code(code);
                }

                let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();
                let error = match code {
                    Some(code) => ProcessError::Exit { code, stderr },
                    None => ProcessError::Terminated { stderr },
                };
                tracing::warn!("{}", error);
                ExecutionResult::failed(error.to_string()).with_exit_code(code)
            }
            Err(error) => {
                tracing::warn!("{}", error);
                ExecutionResult::failed(error.to_string())
            }
        }
    }

    async fn try_run(&self, argv: &[String]) -> Result<Output, ProcessError> {
        let (program, args) = argv.split_first().ok_or(ProcessError::EmptyCommand)?;

        if self.is_cancelled() {
            return Err(ProcessError::Cancelled);
        }

        let command_line = argv.join(" ");
        if self.verbose {
            tracing::info!("Running command: {}", command_line);
        } else {
            tracing::debug!("Running command: {}", command_line);
        }

        let start = Instant::now();

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessError::Start {
                program: program.clone(),
                source,
            })?;

        let mut cancel = self.cancel.clone();
        let cancelled = async move {
            if let Some(rx) = cancel.as_mut() {
                let signalled = rx.wait_for(|cancelled| *cancelled).await.is_ok();
                if signalled {
                    return;
                }
            }
            // No token, or the sender is gone: never resolves
            std::future::pending::<()>().await
        };

        let waited = async {
            let wait = child.wait_with_output();
            let output = match self.timeout {
                Some(limit) => match timeout(limit, wait).await {
                    Ok(output) => output,
                    Err(_) => return Err(ProcessError::Timeout(limit)),
                },
                None => wait.await,
            };
            output.map_err(|source| ProcessError::Wait {
                program: program.clone(),
                source,
            })
        };

        // Dropping the losing branch drops the child, which kills it
        let output = tokio::select! {
            output = waited => output?,
            () = cancelled => {
                tracing::warn!("Cancelled while running: {}", program);
                return Err(ProcessError::Cancelled);
            }
        };

        tracing::info!(
            "{} completed in {:.2}s with exit code {}",
            program,
            start.elapsed().as_secs_f32(),
            output
                .status
                .code()
                .map_or_else(|| "none".to_string(), |code| code.to_string())
        );

        Ok(output)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tracing::Level;
    use tracing_subscriber::fmt::MakeWriter;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    /// Log sink shared between a scoped subscriber and the test
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// Run `exit 0` under a subscriber capped at `max_level` and return the
    /// line that echoed the command, if any.
    fn echoed_command(verbose: bool, max_level: Level) -> Option<String> {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_max_level(max_level)
            .with_ansi(false)
            .without_time()
            .finish();

        let runner = ProcessRunner::new().with_verbose(verbose);
        let result = tracing::subscriber::with_default(subscriber, || {
            tokio_test::block_on(runner.run(&sh("exit 0"), true))
        });
        assert!(result.is_success());

        logs.contents()
            .lines()
            .find(|line| line.contains("Running command: sh -c exit 0"))
            .map(str::to_string)
    }

    #[test]
    fn test_verbose_echoes_command_at_info() {
        let line = echoed_command(true, Level::INFO).expect("command echoed");
        assert!(line.contains("INFO"), "{}", line);
    }

    #[test]
    fn test_quiet_runner_echoes_only_at_debug() {
        assert_eq!(echoed_command(false, Level::INFO), None);

        let line = echoed_command(false, Level::DEBUG).expect("command logged");
        assert!(line.contains("DEBUG"), "{}", line);
    }

    #[tokio::test]
    async fn test_success_captures_stdout() {
        let runner = ProcessRunner::new();
        let result = runner.run(&sh("echo hello"), true).await;

        assert!(result.is_success());
        assert_eq!(result.output(), Some("hello\n"));
        assert_eq!(result.exit_code(), Some(0));
    }

    #[tokio::test]
    async fn test_non_zero_exit_reports_code_and_stderr() {
        let runner = ProcessRunner::new();
        let result = runner.run(&sh("echo 'bad header' >&2; exit 3"), true).await;

        assert!(!result.is_success());
        assert_eq!(result.exit_code(), Some(3));
        let error = result.error().unwrap();
        assert!(error.contains("exit code 3"));
        assert!(error.contains("bad header"));
    }

    #[tokio::test]
    async fn test_unchecked_non_zero_exit_is_success() {
        let runner = ProcessRunner::new();
        let result = runner.run(&sh("echo partial; exit 4"), false).await;

        assert!(result.is_success());
        assert_eq!(result.output(), Some("partial\n"));
        assert_eq!(result.exit_code(), Some(4));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let runner = ProcessRunner::new();
        let argv = vec!["qimba-definitely-not-installed".to_string()];
        let result = runner.run(&argv, true).await;

        assert!(!result.is_success());
        assert!(result.error().unwrap().contains("Failed to start"));
        assert_eq!(result.exit_code(), None);
    }

    #[tokio::test]
    async fn test_empty_command() {
        let runner = ProcessRunner::new();
        let result = runner.run(&[], true).await;

        assert!(!result.is_success());
        assert_eq!(result.error(), Some("No command given"));
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let runner = ProcessRunner::new().with_timeout(Some(Duration::from_millis(100)));
        let start = Instant::now();
        let result = runner.run(&sh("sleep 10"), true).await;

        assert!(!result.is_success());
        assert!(result.error().unwrap().contains("timed out"));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let runner = ProcessRunner::new().with_cancellation(rx);
        let result = runner.run(&sh("echo never"), true).await;

        assert!(!result.is_success());
        assert_eq!(result.error(), Some("Command cancelled"));
    }

    #[tokio::test]
    async fn test_cancel_while_running() {
        let (tx, rx) = watch::channel(false);
        let runner = ProcessRunner::new().with_cancellation(rx);

        let cancel = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            tx.send(true).unwrap();
            tx
        });

        let start = Instant::now();
        let result = runner.run(&sh("sleep 10"), true).await;
        let _tx = cancel.await.unwrap();

        assert!(!result.is_success());
        assert_eq!(result.error(), Some("Command cancelled"));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_dropped_cancel_sender_does_not_cancel() {
        let (tx, rx) = watch::channel(false);
        drop(tx);

        let runner = ProcessRunner::new().with_cancellation(rx);
        let result = runner.run(&sh("echo still-running"), true).await;

        assert!(result.is_success());
        assert_eq!(result.output(), Some("still-running\n"));
    }
}
