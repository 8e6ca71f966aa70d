//! Error types for invoking the download tool.

use std::fmt;

/// Text the tool prints on stderr when the requested resource does not exist.
pub const NOT_FOUND_MARKER: &str = "HTTP Error 404: Not Found";

/// Error type for process spawning operations.
#[derive(thiserror::Error, Debug)]
pub enum SpawnError {
    /// The binary was not found.
    #[error("Executable not found: {0}")]
    NotFound(String),
    /// Permission denied when spawning.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    /// Other I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SpawnError {
    /// Create a `SpawnError` from an I/O error, classifying common cases.
    pub(crate) fn from_io(program: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(program.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(program.to_string()),
            _ => Self::Io(err),
        }
    }
}

/// Exit code wrapper whose display renders `null` when the process was
/// terminated by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub Option<i32>);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(code) => write!(f, "{code}"),
            None => f.write_str("null"),
        }
    }
}

/// Errors surfaced by an invocation of the tool.
#[derive(thiserror::Error, Debug)]
pub enum ExecError {
    /// The executable could not be launched.
    #[error("Failed to spawn process: {0}")]
    Spawn(#[from] SpawnError),

    /// The process failed; carries the raw stderr text.
    #[error("Process failed with exit code {code}{}", format_stderr(.stderr))]
    Failed { code: ExitCode, stderr: String },

    /// The tool reported that the requested media does not exist.
    #[error("Not found: [{}]", .args.join(", "))]
    NotFound { args: Vec<String> },

    /// Stdout could not be parsed as JSON, neither whole nor line-delimited.
    #[error("Failed to parse JSON output: {0}")]
    Parse(#[from] serde_json::Error),

    /// Reading a stream or waiting on the process failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Process stdout was not piped.
    #[error("Process stdout not available")]
    NoStdout,

    /// Process stderr was not piped.
    #[error("Process stderr not available")]
    NoStderr,
}

fn format_stderr(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!("\n\nError data:\n{stderr}")
    }
}

impl ExecError {
    /// Build the error for a failed run from its exit code and stderr text.
    #[must_use]
    pub fn failed(code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self::Failed {
            code: ExitCode(code),
            stderr: stderr.into(),
        }
    }

    /// Returns true if this is the not-found error kind.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Stderr text carried by a failed run, if any.
    #[must_use]
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Failed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }

    /// Exit code carried by a failed run, if known.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Failed { code, .. } => code.0,
            _ => None,
        }
    }
}
