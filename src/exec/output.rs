//! Collected output of a finished invocation and its interpretation.

use std::process::ExitStatus;

use tokio_util::sync::CancellationToken;

use super::{drain, wait_or_cancel, DescendantKiller, ExecError, ToolProcess, NOT_FOUND_MARKER};

/// Exit status of a finished process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessStatus {
    /// Whether the process exited successfully.
    pub success: bool,
    /// Exit code; `None` if the process was terminated by a signal.
    pub code: Option<i32>,
}

impl From<ExitStatus> for ProcessStatus {
    fn from(status: ExitStatus) -> Self {
        Self {
            success: status.success(),
            code: status.code(),
        }
    }
}

/// Everything a finished invocation wrote, plus its exit status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    status: ProcessStatus,
    stdout: String,
    stderr: String,
}

impl ExecOutput {
    /// Create an output record.
    #[must_use]
    pub fn new(status: ProcessStatus, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            status,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// The exit status.
    #[must_use]
    pub fn status(&self) -> ProcessStatus {
        self.status
    }

    /// Whether the process exited successfully.
    #[must_use]
    pub fn success(&self) -> bool {
        self.status.success
    }

    /// The exit code, if any.
    #[must_use]
    pub fn code(&self) -> Option<i32> {
        self.status.code
    }

    /// Stdout text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.stdout
    }

    /// Stderr text.
    #[must_use]
    pub fn error_text(&self) -> &str {
        &self.stderr
    }

    /// Stdout split into lines.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines()
    }

    /// Stderr split into lines.
    pub fn error_lines(&self) -> impl Iterator<Item = &str> {
        self.stderr.lines()
    }

    /// Consume the output, keeping only stdout.
    #[must_use]
    pub fn into_text(self) -> String {
        self.stdout
    }
}

/// Turn a finished invocation into success or a classified error.
///
/// A failing run whose stderr mentions the not-found marker becomes
/// `ExecError::NotFound` carrying `args`; any other failure carries the raw
/// stderr text.
///
/// # Errors
///
/// Returns `ExecError::NotFound` or `ExecError::Failed` if the process failed.
pub fn interpret(output: ExecOutput, args: &[String]) -> Result<ExecOutput, ExecError> {
    if output.success() {
        return Ok(output);
    }

    if output.error_lines().any(|line| line.contains(NOT_FOUND_MARKER)) {
        tracing::debug!(?args, "Tool reported resource not found");
        return Err(ExecError::NotFound {
            args: args.to_vec(),
        });
    }

    Err(ExecError::Failed {
        code: super::ExitCode(output.code()),
        stderr: output.stderr,
    })
}

/// Drain both streams of `process` to strings and wait for it to exit.
///
/// # Errors
///
/// Returns an error if a stream is missing or an I/O operation fails.
pub async fn collect_output(
    mut process: ToolProcess,
    cancel: Option<&CancellationToken>,
    killer: &dyn DescendantKiller,
) -> Result<ExecOutput, ExecError> {
    let stdout = process.take_stdout().ok_or(ExecError::NoStdout)?;
    let stderr = process.take_stderr().ok_or(ExecError::NoStderr)?;

    let mut stdout_text = String::new();
    let mut stderr_text = String::new();

    let (stdout_result, stderr_result, status) = tokio::join!(
        drain(stdout, |chunk| stdout_text.push_str(chunk)),
        drain(stderr, |chunk| stderr_text.push_str(chunk)),
        wait_or_cancel(&mut process, cancel, killer),
    );
    stdout_result?;
    stderr_result?;

    Ok(ExecOutput::new(status?.into(), stdout_text, stderr_text))
}
