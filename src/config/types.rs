//! Configuration types.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::exec::{ExecOptions, ProgressPattern};

use super::ConfigError;

/// Configuration for the wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrapperConfig {
    /// Path or name of the tool executable.
    #[serde(default = "default_binary")]
    pub binary: String,
    /// Custom progress regex; the built-in pattern is used when unset.
    #[serde(default)]
    pub progress_pattern: Option<String>,
    /// Working directory for every invocation.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Environment overrides for every invocation.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_binary() -> String {
    "yt-dlp".to_string()
}

impl Default for WrapperConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            progress_pattern: None,
            working_dir: None,
            env: BTreeMap::new(),
        }
    }
}

impl WrapperConfig {
    /// Compile the configured progress pattern.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidPattern` if the pattern does not compile.
    pub fn progress_pattern(&self) -> Result<ProgressPattern, ConfigError> {
        match &self.progress_pattern {
            Some(pattern) => ProgressPattern::new(pattern).map_err(|source| {
                ConfigError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                }
            }),
            None => Ok(ProgressPattern::default()),
        }
    }

    /// Spawn options shared by every invocation.
    #[must_use]
    pub fn exec_options(&self) -> ExecOptions {
        let options = ExecOptions::new().envs(self.env.clone());
        match &self.working_dir {
            Some(dir) => options.working_dir(dir),
            None => options,
        }
    }
}
