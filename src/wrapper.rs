//! High-level wrapper around the download tool.
//!
//! Each call spawns its own process; nothing is shared between invocations
//! apart from the immutable configuration held by [`YtdlWrapper`].

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::{ConfigError, WrapperConfig};
use crate::exec::{
    collect_output, default_descendant_killer, interpret, parse_media_info, start_session,
    DescendantKiller, EventStream, ExecError, ExecOutput, ExecOptions, MediaInfoResult,
    ProgressPattern, ToolProcess,
};

/// Default executable name, resolved through `PATH`.
pub const DEFAULT_BINARY: &str = "yt-dlp";

/// Wrapper for the yt-dlp command line tool.
#[derive(Debug, Clone)]
pub struct YtdlWrapper {
    path: String,
    progress_pattern: ProgressPattern,
    defaults: ExecOptions,
    killer: Arc<dyn DescendantKiller>,
}

impl Default for YtdlWrapper {
    fn default() -> Self {
        Self::new(DEFAULT_BINARY)
    }
}

impl YtdlWrapper {
    /// Create a wrapper for the executable at `path`.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            progress_pattern: ProgressPattern::default(),
            defaults: ExecOptions::default(),
            killer: default_descendant_killer(),
        }
    }

    /// Create a wrapper from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidPattern` if the configured pattern does not compile.
    pub fn with_config(config: &WrapperConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            path: config.binary.clone(),
            progress_pattern: config.progress_pattern()?,
            defaults: config.exec_options(),
            killer: default_descendant_killer(),
        })
    }

    /// Replace the progress pattern used by sessions started afterwards.
    #[must_use]
    pub fn with_progress_pattern(mut self, pattern: ProgressPattern) -> Self {
        self.progress_pattern = pattern;
        self
    }

    /// Replace the spawn options applied under every call's own options.
    #[must_use]
    pub fn with_default_options(mut self, options: ExecOptions) -> Self {
        self.defaults = options;
        self
    }

    /// Replace the child-process killer used on cancellation.
    #[must_use]
    pub fn with_descendant_killer(mut self, killer: Arc<dyn DescendantKiller>) -> Self {
        self.killer = killer;
        self
    }

    /// Path to the executable.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Change the path to the executable.
    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    /// The progress pattern in use.
    #[must_use]
    pub fn progress_pattern(&self) -> &ProgressPattern {
        &self.progress_pattern
    }

    fn spawn(&self, args: &[String], options: ExecOptions) -> Result<ToolProcess, ExecError> {
        let options = options.merged_over(&self.defaults);
        Ok(ToolProcess::spawn(&self.path, args, &options)?)
    }

    /// Run the tool and stream its events.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `ExecError::Spawn` if the executable cannot be launched.
    pub fn exec<I, S>(
        &self,
        args: I,
        options: ExecOptions,
        cancel: Option<CancellationToken>,
    ) -> Result<EventStream, ExecError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args = collect_args(args);
        let process = self.spawn(&args, options)?;
        tracing::info!(path = %self.path, ?args, "Started session");
        start_session(
            process,
            self.progress_pattern.clone(),
            cancel,
            Arc::clone(&self.killer),
        )
    }

    /// Run the tool to completion and return its output.
    ///
    /// # Errors
    ///
    /// Returns `ExecError::NotFound` when the tool reports a 404,
    /// `ExecError::Failed` with the raw stderr for any other failure, or a
    /// spawn or I/O error.
    pub async fn exec_output<I, S>(
        &self,
        args: I,
        options: ExecOptions,
        cancel: Option<CancellationToken>,
    ) -> Result<ExecOutput, ExecError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args = collect_args(args);
        let process = self.spawn(&args, options)?;
        let output = collect_output(process, cancel.as_ref(), self.killer.as_ref()).await?;
        tracing::debug!(
            ?args,
            success = output.success(),
            code = output.code(),
            "Process finished"
        );
        interpret(output, &args)
    }

    /// Run the tool to completion and return its stdout.
    ///
    /// # Errors
    ///
    /// Same as [`YtdlWrapper::exec_output`].
    pub async fn exec_string<I, S>(
        &self,
        args: I,
        options: ExecOptions,
        cancel: Option<CancellationToken>,
    ) -> Result<String, ExecError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(self.exec_output(args, options, cancel).await?.into_text())
    }

    async fn query(&self, flag: &str) -> Result<String, ExecError> {
        self.exec_string([flag], ExecOptions::default(), None).await
    }

    /// Names of all supported extractors.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool fails.
    pub async fn extractors(&self) -> Result<Vec<String>, ExecError> {
        Ok(non_empty_lines(&self.query("--list-extractors").await?))
    }

    /// Descriptions of all supported extractors.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool fails.
    pub async fn extractor_descriptions(&self) -> Result<Vec<String>, ExecError> {
        Ok(non_empty_lines(
            &self.query("--extractor-descriptions").await?,
        ))
    }

    /// The tool's help text.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool fails.
    pub async fn help(&self) -> Result<String, ExecError> {
        self.query("--help").await
    }

    /// The user agent string the tool sends.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool fails.
    pub async fn user_agent(&self) -> Result<String, ExecError> {
        Ok(self.query("--dump-user-agent").await?.trim().to_string())
    }

    /// The tool's version string.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool fails.
    pub async fn version(&self) -> Result<String, ExecError> {
        Ok(self.query("--version").await?.trim().to_string())
    }

    /// Metadata for the media described by `args` (usually one or more URLs).
    ///
    /// Adds `-f best` unless a format is already selected, and `--dump-json`.
    ///
    /// # Errors
    ///
    /// Returns `ExecError::NotFound` if the media does not exist,
    /// `ExecError::Parse` if the output is not JSON, or any other exec error.
    pub async fn media_info<I, S>(&self, args: I) -> Result<MediaInfoResult, ExecError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args = media_info_args(collect_args(args));
        let stdout = self.exec_string(args, ExecOptions::default(), None).await?;
        parse_media_info(&stdout)
    }
}

fn collect_args<I, S>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    args.into_iter().map(Into::into).collect()
}

fn media_info_args(mut args: Vec<String>) -> Vec<String> {
    if !args.iter().any(|arg| arg == "-f" || arg == "--format") {
        args.extend(["-f".to_string(), "best".to_string()]);
    }
    args.push("--dump-json".to_string());
    args
}

fn non_empty_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
