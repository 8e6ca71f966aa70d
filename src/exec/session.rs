//! Event-driven execution of one tool process.
//!
//! A session drains stdout and stderr concurrently with the exit wait.
//! Stdout lines are classified and sent to the caller as they arrive; stderr
//! is accumulated. Once both streams have ended and the process has exited,
//! exactly one terminal event is sent and the stream closes.

use std::pin::Pin;
use std::process::ExitStatus;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use tokio_util::sync::{CancellationToken, DropGuard};

use super::{
    classify, drain, wait_or_cancel, DescendantKiller, DrainSummary, ExecError, LineBuffer,
    ProgressPattern, ToolProcess, WrapperEvent,
};

/// Live events of a running session.
///
/// Yields events in the order the tool produced them and ends after the
/// terminal event. Dropping the stream before then kills the tool.
#[derive(Debug)]
pub struct EventStream {
    rx: UnboundedReceiverStream<WrapperEvent>,
    pid: Option<u32>,
    _kill_on_drop: DropGuard,
}

impl EventStream {
    /// Process id of the spawned tool, if it was still running at start.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Receive the next event, or `None` once the session has finished.
    pub async fn recv(&mut self) -> Option<WrapperEvent> {
        self.rx.next().await
    }

    /// Collect every remaining event, including the terminal one.
    pub async fn collect_all(mut self) -> Vec<WrapperEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.recv().await {
            events.push(event);
        }
        events
    }

    /// Drive the session to completion, discarding intermediate events.
    ///
    /// # Errors
    ///
    /// Returns the error carried by a `CloseWithError` or `Error` terminal event.
    pub async fn wait(mut self) -> Result<i32, ExecError> {
        while let Some(event) = self.recv().await {
            match event {
                WrapperEvent::Close(code) => return Ok(code),
                WrapperEvent::CloseWithError(err) | WrapperEvent::Error(err) => return Err(err),
                _ => {}
            }
        }
        Err(ExecError::Io(std::io::Error::other(
            "session ended without a terminal event",
        )))
    }
}

impl Stream for EventStream {
    type Item = WrapperEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().rx).poll_next(cx)
    }
}

/// Start a session for an already spawned process.
///
/// Must be called from within a tokio runtime.
///
/// # Errors
///
/// Returns `ExecError::NoStdout` or `ExecError::NoStderr` if the process
/// streams were not piped.
pub fn start_session(
    mut process: ToolProcess,
    pattern: ProgressPattern,
    cancel: Option<CancellationToken>,
    killer: Arc<dyn DescendantKiller>,
) -> Result<EventStream, ExecError> {
    let stdout = process.take_stdout().ok_or(ExecError::NoStdout)?;
    let stderr = process.take_stderr().ok_or(ExecError::NoStderr)?;
    let pid = process.id();
    let (tx, rx) = mpsc::unbounded_channel();
    // Fires on external cancellation or when the caller drops the stream.
    let token = cancel.map_or_else(CancellationToken::new, |parent| parent.child_token());
    let guard = token.clone().drop_guard();

    tokio::spawn(async move {
        let mut lines = LineBuffer::new();
        let mut stderr_text = String::new();

        let (stdout_result, stderr_result, status) = tokio::join!(
            drain(stdout, |chunk| {
                for line in lines.push(chunk) {
                    emit_line(&tx, &pattern, &line);
                }
            }),
            drain(stderr, |chunk| stderr_text.push_str(chunk)),
            wait_or_cancel(&mut process, Some(&token), killer.as_ref()),
        );

        if let Some(line) = lines.finish() {
            emit_line(&tx, &pattern, &line);
        }
        if let Ok(DrainSummary { replaced, .. }) = &stdout_result {
            if *replaced > 0 {
                let _ = tx.send(WrapperEvent::Debug(format!(
                    "replaced {replaced} invalid UTF-8 sequence(s) in stdout"
                )));
            }
        }

        let terminal = terminal_event(stdout_result, stderr_result, status, stderr_text);
        tracing::debug!(pid, event = terminal.name(), "Session finished");
        let _ = tx.send(terminal);
    });

    Ok(EventStream {
        rx: UnboundedReceiverStream::new(rx),
        pid,
        _kill_on_drop: guard,
    })
}

fn emit_line(tx: &UnboundedSender<WrapperEvent>, pattern: &ProgressPattern, line: &str) {
    let classified = classify(line, pattern);
    if let Some(progress) = classified.progress() {
        let _ = tx.send(WrapperEvent::Progress(progress.clone()));
    }
    let _ = tx.send(WrapperEvent::Event(classified.into_event()));
}

/// Decide the single terminal event once both drains and the exit wait are done.
///
/// Non-empty stderr takes precedence over a failing status.
fn terminal_event(
    stdout: std::io::Result<DrainSummary>,
    stderr: std::io::Result<DrainSummary>,
    status: std::io::Result<ExitStatus>,
    stderr_text: String,
) -> WrapperEvent {
    let status = match (stdout, stderr, status) {
        (Ok(_), Ok(_), Ok(status)) => status,
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
            return WrapperEvent::Error(ExecError::Io(e));
        }
    };

    if !stderr_text.is_empty() {
        WrapperEvent::Error(ExecError::failed(status.code(), stderr_text))
    } else if !status.success() {
        WrapperEvent::CloseWithError(ExecError::failed(status.code(), ""))
    } else {
        WrapperEvent::Close(status.code().unwrap_or(0))
    }
}
