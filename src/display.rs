//! Colored CLI display utilities for tool output.
//!
//! Used by the binary to render a session's events as they arrive.

use std::io::{self, Write};

use chrono::Utc;
use owo_colors::OwoColorize;

use crate::exec::{LifecycleEvent, Progress, WrapperEvent};

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Truncate a string to at most `max_chars` characters, adding ellipsis if truncated.
#[must_use]
pub fn truncate(s: &str, max_chars: usize, raw_mode: bool) -> String {
    if raw_mode || s.chars().count() <= max_chars {
        return s.to_string();
    }
    if max_chars <= 3 {
        return "...".to_string();
    }
    let kept: String = s.chars().take(max_chars - 3).collect();
    format!("{kept}...")
}

/// Format a progress report as `45.2% of 10.00MiB at 1.00MiB/s ETA 00:09`.
#[must_use]
pub fn format_progress(progress: &Progress) -> String {
    let mut out = match progress.percent {
        Some(percent) => format!("{percent:.1}%"),
        None => "?%".to_string(),
    };
    if let Some(total) = &progress.total_size {
        out.push_str(&format!(" of {total}"));
    }
    if let Some(speed) = &progress.current_speed {
        out.push_str(&format!(" at {speed}"));
    }
    if let Some(eta) = &progress.eta {
        out.push_str(&format!(" ETA {eta}"));
    }
    out
}

/// Print a progress report.
pub fn print_progress(progress: &Progress) {
    println!(
        "{} {} {}",
        timestamp().dimmed(),
        "[PROGRESS]".green().bold(),
        format_progress(progress)
    );
    let _ = io::stdout().flush();
}

/// Print a classified output line.
pub fn print_event(event: &LifecycleEvent, raw_mode: bool) {
    let tag = format!("[{}]", event.kind.to_uppercase());
    let data = truncate(&event.data, 200, raw_mode);
    if event.is_other() {
        println!("{} {} {}", timestamp().dimmed(), tag.dimmed(), data);
    } else {
        println!("{} {} {}", timestamp().dimmed(), tag.cyan().bold(), data);
    }
    let _ = io::stdout().flush();
}

/// Print the successful end of a session.
pub fn print_close(code: i32) {
    println!(
        "{} {} exited with code {}",
        timestamp().dimmed(),
        "[CLOSE]".blue().bold(),
        code
    );
    let _ = io::stdout().flush();
}

/// Print an error message.
pub fn print_error(message: &str) {
    println!("{} {}", "[ERROR]".red().bold(), message);
    let _ = io::stdout().flush();
}

/// Print a diagnostic message.
pub fn print_debug(message: &str) {
    println!("{} {}", "[DEBUG]".yellow().bold(), message.dimmed());
    let _ = io::stdout().flush();
}

/// Print any session event.
///
/// Progress lines also arrive as `download` events; those are skipped
/// unless `raw_mode` is set to avoid printing every report twice.
pub fn print_wrapper_event(event: &WrapperEvent, raw_mode: bool) {
    match event {
        WrapperEvent::Progress(progress) => print_progress(progress),
        WrapperEvent::Event(event) => {
            if raw_mode || event.kind != "download" || !event.data.contains('%') {
                print_event(event, raw_mode);
            }
        }
        WrapperEvent::Close(code) => print_close(*code),
        WrapperEvent::CloseWithError(err) | WrapperEvent::Error(err) => {
            print_error(&err.to_string());
        }
        WrapperEvent::Debug(message) => print_debug(message),
    }
}
