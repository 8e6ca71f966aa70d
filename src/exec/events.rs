//! Event types emitted while the tool runs.
//!
//! Every line the tool writes to stdout is turned into zero, one or two
//! events as it arrives. A session always ends with exactly one terminal
//! event: [`WrapperEvent::Close`], [`WrapperEvent::CloseWithError`] or
//! [`WrapperEvent::Error`].

use serde::{Deserialize, Serialize};

use super::ExecError;

/// Download progress parsed from a `[download]` line.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    /// Percentage in `[0, 100]`, `None` if the matched text was not numeric.
    pub percent: Option<f64>,
    /// Total size, e.g. `"10.00MiB"`.
    pub total_size: Option<String>,
    /// Current download speed, e.g. `"1.00MiB/s"`.
    pub current_speed: Option<String>,
    /// Estimated time remaining, e.g. `"00:09"`.
    pub eta: Option<String>,
}

/// Event type used for lines without a bracketed tag.
pub const OTHER_EVENT: &str = "other";

/// A tagged line of tool output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Lowercased bracket tag (`"download"`, `"youtube"`, ...) or `"other"`.
    pub kind: String,
    /// Remainder of the line after the tag.
    pub data: String,
}

impl LifecycleEvent {
    /// Create an event of the given kind.
    #[must_use]
    pub fn new(kind: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            data: data.into(),
        }
    }

    /// Returns true if this event came from an untagged line.
    #[must_use]
    pub fn is_other(&self) -> bool {
        self.kind == OTHER_EVENT
    }
}

/// Events emitted by a running session.
#[derive(Debug)]
pub enum WrapperEvent {
    /// A progress line was parsed.
    Progress(Progress),
    /// A line of output was classified.
    Event(LifecycleEvent),
    /// The process exited successfully with empty stderr.
    Close(i32),
    /// The process failed and wrote nothing to stderr.
    CloseWithError(ExecError),
    /// The process wrote to stderr, or the session itself failed.
    Error(ExecError),
    /// Diagnostic message that does not fit any other category.
    Debug(String),
}

impl WrapperEvent {
    /// Returns true for the three terminal variants.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Close(_) | Self::CloseWithError(_) | Self::Error(_)
        )
    }

    /// Returns the progress payload if this is a `Progress` event.
    #[must_use]
    pub fn progress(&self) -> Option<&Progress> {
        match self {
            Self::Progress(progress) => Some(progress),
            _ => None,
        }
    }

    /// Returns the lifecycle payload if this is an `Event` event.
    #[must_use]
    pub fn lifecycle(&self) -> Option<&LifecycleEvent> {
        match self {
            Self::Event(event) => Some(event),
            _ => None,
        }
    }

    /// Short name of the event kind, matching the event names of the tool wrapper API.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Progress(_) => "progress",
            Self::Event(_) => "event",
            Self::Close(_) => "close",
            Self::CloseWithError(_) => "closeWithError",
            Self::Error(_) => "error",
            Self::Debug(_) => "debug",
        }
    }
}
