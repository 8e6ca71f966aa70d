//! ytdl-wrapper - Async wrapper around the yt-dlp command line tool.

pub mod config;
pub mod display;
pub mod exec;
pub mod wrapper;

pub use wrapper::{YtdlWrapper, DEFAULT_BINARY};
