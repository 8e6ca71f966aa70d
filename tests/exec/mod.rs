//! Exec engine tests.
//!
//! Session, cancellation and wrapper tests drive real `sh` processes and
//! only run on Unix.


#[cfg(unix)]
mod cancel_test;
#[cfg(unix)]
mod wrapper_test;

/// Verify the public exec types are exported from the library.
#[test]
fn test_exec_types_exported() {
    use ytdl_wrapper::exec::{
        classify, ClassifiedLine, EventStream, ExecError, ExecOptions, ExecOutput, LifecycleEvent,
        MediaInfo, MediaInfoResult, ProcessStatus, Progress, ProgressPattern, SpawnError,
        WrapperEvent,
    };

    let pattern = ProgressPattern::default();
    assert!(matches!(
        classify("hello", &pattern),
        ClassifiedLine::Other(_)
    ));

    let _ = ExecOptions::new();
    let _ = ExecOutput::new(
        ProcessStatus {
            success: true,
            code: Some(0),
        },
        "",
        "",
    );
    let _ = LifecycleEvent::new("download", "");
    let _ = Progress::default();
    let _: fn() -> ExecError = || ExecError::NoStdout;
    let _: fn() -> SpawnError = || SpawnError::NotFound("x".into());
    let _ = WrapperEvent::Close(0);
    let _: Option<EventStream> = None;
    let _: Option<MediaInfoResult> = None;
    let _: Option<MediaInfo> = None;
}
