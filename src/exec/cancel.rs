//! Cancellation of a running tool process.
//!
//! The tool may start helper processes (ffmpeg for merging, for example), so
//! cancelling kills the process's children first and then the process
//! itself. Child discovery is platform specific and best effort; the final
//! kill of the primary process always runs.

use std::panic::AssertUnwindSafe;
use std::process::ExitStatus;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;

use super::ToolProcess;

/// Terminates the child processes of a pid.
#[async_trait]
pub trait DescendantKiller: Send + Sync + std::fmt::Debug {
    /// Terminate every child process of `pid`.
    ///
    /// # Errors
    ///
    /// Returns an error if the children cannot be enumerated or signalled.
    async fn kill_descendants(&self, pid: u32) -> std::io::Result<()>;
}

/// Finds children with `pgrep -P` and sends each `SIGTERM`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PosixDescendantKiller;

#[cfg(unix)]
#[async_trait]
impl DescendantKiller for PosixDescendantKiller {
    async fn kill_descendants(&self, pid: u32) -> std::io::Result<()> {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let output = tokio::process::Command::new("pgrep")
            .args(["-P", &pid.to_string()])
            .output()
            .await?;

        // pgrep exits 1 when nothing matched.
        let stdout = String::from_utf8_lossy(&output.stdout);
        for child in stdout.split_whitespace().filter_map(|s| s.parse::<i32>().ok()) {
            tracing::debug!(parent = pid, child, "Terminating child process");
            if let Err(e) = kill(Pid::from_raw(child), Signal::SIGTERM) {
                // The child may have exited since it was listed.
                tracing::debug!(child, error = %e, "Failed to signal child process");
            }
        }
        Ok(())
    }
}

/// Kills the whole process tree with `taskkill /T /F`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsDescendantKiller;

#[async_trait]
impl DescendantKiller for WindowsDescendantKiller {
    async fn kill_descendants(&self, pid: u32) -> std::io::Result<()> {
        let status = tokio::process::Command::new("taskkill")
            .args(["/pid", &pid.to_string(), "/T", "/F"])
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .await?;

        if status.success() {
            Ok(())
        } else {
            Err(std::io::Error::other(format!("taskkill exited with {status}")))
        }
    }
}

/// The killer for the current platform.
#[must_use]
pub fn default_descendant_killer() -> Arc<dyn DescendantKiller> {
    #[cfg(windows)]
    {
        Arc::new(WindowsDescendantKiller)
    }

    #[cfg(unix)]
    {
        Arc::new(PosixDescendantKiller)
    }

    #[cfg(not(any(unix, windows)))]
    {
        Arc::new(NoopDescendantKiller)
    }
}

#[cfg(not(any(unix, windows)))]
#[derive(Debug)]
struct NoopDescendantKiller;

#[cfg(not(any(unix, windows)))]
#[async_trait]
impl DescendantKiller for NoopDescendantKiller {
    async fn kill_descendants(&self, _pid: u32) -> std::io::Result<()> {
        Ok(())
    }
}

/// Kill the process's children, then the process.
///
/// Failures and panics from the child kill are logged and swallowed; the
/// primary kill runs on every path.
pub async fn terminate_tree(process: &mut ToolProcess, killer: &dyn DescendantKiller) {
    if let Some(pid) = process.id() {
        match AssertUnwindSafe(killer.kill_descendants(pid))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!(pid, error = %e, "Failed to kill child processes"),
            Err(_) => tracing::warn!(pid, "Child process killer panicked"),
        }
    }

    if let Err(e) = process.start_kill() {
        tracing::debug!(error = %e, "Failed to kill process");
    }
}

/// Wait for the process to exit, killing it if `cancel` fires first.
///
/// A cancelled process still yields its (failing) exit status.
///
/// # Errors
///
/// Returns an error if waiting on the process fails.
pub async fn wait_or_cancel(
    process: &mut ToolProcess,
    cancel: Option<&CancellationToken>,
    killer: &dyn DescendantKiller,
) -> std::io::Result<ExitStatus> {
    let Some(token) = cancel else {
        return process.wait().await;
    };

    tokio::select! {
        status = process.wait() => status,
        () = token.cancelled() => {
            tracing::info!(pid = process.id(), "Cancellation requested, killing process");
            terminate_tree(process, killer).await;
            process.wait().await
        }
    }
}
