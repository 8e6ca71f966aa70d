//! Tests for cancelling running sessions.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use ytdl_wrapper::exec::{
    DescendantKiller, ExecError, ExecOptions, PosixDescendantKiller, WrapperEvent,
};
use ytdl_wrapper::YtdlWrapper;

const TIMEOUT: Duration = Duration::from_secs(10);

/// Records the pid it was asked about, then fails.
#[derive(Debug, Default)]
struct FailingKiller {
    seen_pid: AtomicU32,
}

#[async_trait]
impl DescendantKiller for FailingKiller {
    async fn kill_descendants(&self, pid: u32) -> std::io::Result<()> {
        self.seen_pid.store(pid, Ordering::SeqCst);
        Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "pgrep: command not found",
        ))
    }
}

#[derive(Debug)]
struct PanickingKiller;

#[async_trait]
impl DescendantKiller for PanickingKiller {
    async fn kill_descendants(&self, _pid: u32) -> std::io::Result<()> {
        panic!("enumeration blew up");
    }
}

fn cancel_after(token: &CancellationToken, delay: Duration) {
    let token = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        token.cancel();
    });
}

#[tokio::test]
async fn cancel_kills_process_even_when_descendant_kill_fails() {
    let killer = Arc::new(FailingKiller::default());
    let wrapper = YtdlWrapper::new("sh").with_descendant_killer(killer.clone());
    let token = CancellationToken::new();

    let events = wrapper
        .exec(["-c", "exec sleep 30"], ExecOptions::default(), Some(token.clone()))
        .unwrap();
    let pid = events.pid().unwrap();
    cancel_after(&token, Duration::from_millis(100));

    let events = tokio::time::timeout(TIMEOUT, events.collect_all())
        .await
        .expect("cancelled session did not finish");

    assert_eq!(killer.seen_pid.load(Ordering::SeqCst), pid);
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    match events.last() {
        Some(WrapperEvent::CloseWithError(ExecError::Failed { code, .. })) => {
            // Killed by a signal, so there is no exit code.
            assert_eq!(code.0, None);
        }
        other => panic!("Expected CloseWithError, got {other:?}"),
    }
}

#[tokio::test]
async fn cancel_kills_process_even_when_descendant_kill_panics() {
    let wrapper = YtdlWrapper::new("sh").with_descendant_killer(Arc::new(PanickingKiller));
    let token = CancellationToken::new();

    let events = wrapper
        .exec(["-c", "exec sleep 30"], ExecOptions::default(), Some(token.clone()))
        .unwrap();
    cancel_after(&token, Duration::from_millis(100));

    let result = tokio::time::timeout(TIMEOUT, events.wait())
        .await
        .expect("cancelled session did not finish");
    assert!(result.is_err());
}

#[tokio::test]
async fn cancel_before_exit_fails_exec_output() {
    let wrapper = YtdlWrapper::new("sh").with_descendant_killer(Arc::new(FailingKiller::default()));
    let token = CancellationToken::new();
    cancel_after(&token, Duration::from_millis(100));

    let started = Instant::now();
    let result = tokio::time::timeout(
        TIMEOUT,
        wrapper.exec_output(["-c", "exec sleep 30"], ExecOptions::default(), Some(token)),
    )
    .await
    .expect("cancelled invocation did not finish");

    assert!(started.elapsed() < TIMEOUT);
    match result {
        Err(ExecError::Failed { code, stderr }) => {
            assert_eq!(code.0, None);
            assert!(stderr.is_empty());
        }
        other => panic!("Expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn uncancelled_token_does_not_interfere() {
    let wrapper = YtdlWrapper::new("sh");
    let token = CancellationToken::new();

    let code = wrapper
        .exec(["-c", "echo ok"], ExecOptions::default(), Some(token))
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(code, 0);
}

#[tokio::test]
async fn posix_killer_terminates_children_holding_stdout() {
    if std::process::Command::new("pgrep").arg("-V").output().is_err() {
        eprintln!("pgrep not available, skipping");
        return;
    }

    // The background sleep inherits stdout, so the session only finishes
    // once the child is gone as well.
    let wrapper = YtdlWrapper::new("sh").with_descendant_killer(Arc::new(PosixDescendantKiller));
    let token = CancellationToken::new();
    let events = wrapper
        .exec(
            ["-c", "sleep 30 & echo started; wait"],
            ExecOptions::default(),
            Some(token.clone()),
        )
        .unwrap();
    cancel_after(&token, Duration::from_millis(300));

    let events = tokio::time::timeout(TIMEOUT, events.collect_all())
        .await
        .expect("child process kept the session alive");
    assert!(events.last().is_some_and(WrapperEvent::is_terminal));
}

#[tokio::test]
async fn dropping_event_stream_kills_process() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("still-running");
    let script = format!("sleep 1; touch '{}'", marker.display());

    let wrapper = YtdlWrapper::new("sh");
    let events = wrapper
        .exec(["-c", script.as_str()], ExecOptions::default(), None)
        .unwrap();
    assert!(events.pid().is_some());
    drop(events);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(!marker.exists(), "process kept running after the stream was dropped");
}

#[tokio::test]
async fn dropping_event_stream_leaves_parent_token_uncancelled() {
    let wrapper = YtdlWrapper::new("sh");
    let token = CancellationToken::new();
    let events = wrapper
        .exec(["-c", "exec sleep 30"], ExecOptions::default(), Some(token.clone()))
        .unwrap();
    drop(events);

    assert!(!token.is_cancelled());
}
