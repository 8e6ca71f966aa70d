//! Tests for the wrapper's convenience queries against a fake tool script.

use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;

use ytdl_wrapper::exec::{ExecError, ExecOptions, MediaInfoResult};
use ytdl_wrapper::YtdlWrapper;

const FAKE_TOOL: &str = r#"#!/bin/sh
for arg in "$@"; do
  case "$arg" in
    --version) echo "2024.08.06"; exit 0 ;;
    --dump-user-agent) echo "  Mozilla/5.0 (fake)  "; exit 0 ;;
    --list-extractors) printf 'youtube\n  generic  \n\nvimeo\n'; exit 0 ;;
    --extractor-descriptions) printf 'YouTube\n\nGeneric downloader\n'; exit 0 ;;
    --help) echo "Usage: yt-dlp [OPTIONS] URL [URL...]"; exit 0 ;;
  esac
done
case "$1" in
  missing)
    echo "ERROR: [generic] Unable to download webpage: HTTP Error 404: Not Found" >&2
    exit 1 ;;
  broken)
    echo "ERROR: Unsupported URL: broken" >&2
    exit 2 ;;
  garbage)
    echo "this is not json"
    exit 0 ;;
  playlist)
    echo '{"_type":"video","_version":{"version":"2024.08.06"},"id":"a"}'
    echo '{"_type":"video","_version":{"version":"2024.08.06"},"id":"b"}'
    exit 0 ;;
  echo-args)
    echo "$@"
    exit 0 ;;
  *)
    echo '{"_type":"video","_version":{"version":"2024.08.06"},"id":"single","title":"Clip"}'
    exit 0 ;;
esac
"#;

/// Errno for "text file busy" on Linux and the BSDs.
const ETXTBSY: i32 = 26;

/// A fake tool script in its own temporary directory.
struct FakeTool {
    _dir: TempDir,
    path: PathBuf,
}

impl FakeTool {
    fn install() -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("yt-dlp");
        {
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .mode(0o755)
                .open(&path)
                .unwrap();
            file.write_all(FAKE_TOOL.as_bytes()).unwrap();
            file.sync_all().unwrap();
        }
        wait_until_executable(&path);
        Self { _dir: dir, path }
    }

    fn wrapper(&self) -> YtdlWrapper {
        YtdlWrapper::new(self.path.to_str().unwrap())
    }
}

/// Processes forked by other tests while the script was open for writing
/// briefly inherit that descriptor; exec fails with ETXTBSY until they exec.
fn wait_until_executable(path: &Path) {
    for _ in 0..100 {
        match std::process::Command::new(path).arg("--version").output() {
            Err(e) if e.raw_os_error() == Some(ETXTBSY) => {
                std::thread::sleep(Duration::from_millis(10));
            }
            result => {
                result.unwrap();
                return;
            }
        }
    }
    panic!("fake tool stayed busy: {}", path.display());
}

fn fake_wrapper() -> (FakeTool, YtdlWrapper) {
    let tool = FakeTool::install();
    let wrapper = tool.wrapper();
    (tool, wrapper)
}

#[tokio::test]
async fn version_is_trimmed() {
    let (_tool, wrapper) = fake_wrapper();
    assert_eq!(wrapper.version().await.unwrap(), "2024.08.06");
}

#[tokio::test]
async fn user_agent_is_trimmed() {
    let (_tool, wrapper) = fake_wrapper();
    assert_eq!(wrapper.user_agent().await.unwrap(), "Mozilla/5.0 (fake)");
}

#[tokio::test]
async fn help_is_returned_verbatim() {
    let (_tool, wrapper) = fake_wrapper();
    assert_eq!(
        wrapper.help().await.unwrap(),
        "Usage: yt-dlp [OPTIONS] URL [URL...]\n"
    );
}

#[tokio::test]
async fn extractors_drop_blank_lines() {
    let (_tool, wrapper) = fake_wrapper();
    assert_eq!(
        wrapper.extractors().await.unwrap(),
        vec!["youtube", "generic", "vimeo"]
    );
    assert_eq!(
        wrapper.extractor_descriptions().await.unwrap(),
        vec!["YouTube", "Generic downloader"]
    );
}

#[tokio::test]
async fn media_info_single_record() {
    let (_tool, wrapper) = fake_wrapper();
    let info = wrapper.media_info(["https://example.com/v"]).await.unwrap();
    match info {
        MediaInfoResult::Single(info) => {
            assert_eq!(info.kind, "video");
            assert_eq!(info.version.version, "2024.08.06");
            assert_eq!(info.title(), Some("Clip"));
        }
        MediaInfoResult::Many(_) => panic!("Expected a single record"),
    }
}

#[tokio::test]
async fn media_info_json_lines() {
    let (_tool, wrapper) = fake_wrapper();
    let infos = wrapper.media_info(["playlist"]).await.unwrap().into_vec();
    let ids: Vec<_> = infos.iter().filter_map(|i| i.id()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[tokio::test]
async fn media_info_not_found() {
    let (_tool, wrapper) = fake_wrapper();
    let err = wrapper.media_info(["missing"]).await.unwrap_err();
    match err {
        ExecError::NotFound { args } => {
            assert_eq!(args, vec!["missing", "-f", "best", "--dump-json"]);
        }
        other => panic!("Expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn media_info_unparsable_output() {
    let (_tool, wrapper) = fake_wrapper();
    let err = wrapper.media_info(["garbage"]).await.unwrap_err();
    assert!(matches!(err, ExecError::Parse(_)));
}

#[tokio::test]
async fn exec_output_generic_failure_carries_stderr() {
    let (_tool, wrapper) = fake_wrapper();
    let err = wrapper
        .exec_output(["broken"], ExecOptions::default(), None)
        .await
        .unwrap_err();
    assert!(!err.is_not_found());
    assert_eq!(err.stderr(), Some("ERROR: Unsupported URL: broken\n"));
    assert_eq!(err.exit_code(), Some(2));
}

#[tokio::test]
async fn exec_string_returns_stdout() {
    let (_tool, wrapper) = fake_wrapper();
    let text = wrapper
        .exec_string(["echo-args", "-x", "--format", "mp4"], ExecOptions::default(), None)
        .await
        .unwrap();
    assert_eq!(text, "echo-args -x --format mp4\n");
}

#[tokio::test]
async fn exec_output_exposes_status_and_streams() {
    let (_tool, wrapper) = fake_wrapper();
    let output = wrapper
        .exec_output(["--version"], ExecOptions::default(), None)
        .await
        .unwrap();
    assert!(output.success());
    assert_eq!(output.code(), Some(0));
    assert_eq!(output.lines().collect::<Vec<_>>(), vec!["2024.08.06"]);
    assert_eq!(output.error_text(), "");
}
