/// Outcome of a single external process invocation.
///
/// Produced by [`ProcessRunner`](crate::services::ProcessRunner) and never
/// modified afterwards; the fields are only reachable through accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    success: bool,
    output: Option<String>,
    error: Option<String>,
    exit_code: Option<i32>,
}

impl ExecutionResult {
    /// A successful run with the captured stdout.
    pub fn succeeded(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: Some(output.into()),
            error: None,
            exit_code: None,
        }
    }

    /// A failed run with a description of what went wrong.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
            exit_code: None,
        }
    }

    pub(crate) fn with_exit_code(mut self, code: Option<i32>) -> Self {
        self.exit_code = code;
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Captured stdout of a successful run.
    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Exit code of the process, when it ran to completion.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Error text for reporting, never empty for a failed result.
    pub fn error_message(&self) -> &str {
        match self.error.as_deref() {
            Some(error) if !error.trim().is_empty() => error,
            _ => "unknown error",
        }
    }
}
