//! Spawning and controlling a tool process.
//!
//! [`ExecOptions`] carries the spawn configuration; [`ToolProcess`] owns the
//! running child. Stdout and stderr are always piped.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, ChildStderr, ChildStdout, Command};

use super::SpawnError;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Spawn configuration for one invocation.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    working_dir: Option<PathBuf>,
    env: BTreeMap<String, String>,
    env_clear: bool,
    inherit_stdin: bool,
}

impl ExecOptions {
    /// Create options with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the working directory for the process.
    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Override an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Override several environment variables.
    #[must_use]
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Start from an empty environment instead of inheriting the parent's.
    #[must_use]
    pub fn env_clear(mut self) -> Self {
        self.env_clear = true;
        self
    }

    /// Let the child read the parent's stdin instead of `/dev/null`.
    #[must_use]
    pub fn inherit_stdin(mut self) -> Self {
        self.inherit_stdin = true;
        self
    }

    /// Get the working directory, if set.
    #[must_use]
    pub fn get_working_dir(&self) -> Option<&PathBuf> {
        self.working_dir.as_ref()
    }

    /// Get the environment overrides.
    #[must_use]
    pub fn get_env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Merge defaults from another set of options; values in `self` win.
    #[must_use]
    pub fn merged_over(mut self, defaults: &ExecOptions) -> Self {
        if self.working_dir.is_none() {
            self.working_dir.clone_from(&defaults.working_dir);
        }
        for (key, value) in &defaults.env {
            self.env.entry(key.clone()).or_insert_with(|| value.clone());
        }
        self.env_clear |= defaults.env_clear;
        self.inherit_stdin |= defaults.inherit_stdin;
        self
    }

    fn command(&self, program: &str, args: &[String]) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(if self.inherit_stdin {
                Stdio::inherit()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if self.env_clear {
            cmd.env_clear();
        }
        cmd.envs(&self.env);

        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }

        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);

        cmd
    }
}

/// A running tool process.
#[derive(Debug)]
pub struct ToolProcess {
    child: Child,
}

impl ToolProcess {
    /// Spawn `program` with `args`.
    ///
    /// # Errors
    ///
    /// Returns `SpawnError` if the process fails to spawn.
    pub fn spawn(program: &str, args: &[String], options: &ExecOptions) -> Result<Self, SpawnError> {
        let child = options
            .command(program, args)
            .spawn()
            .map_err(|e| SpawnError::from_io(program, e))?;

        tracing::debug!(program, ?args, pid = child.id(), "Spawned process");
        Ok(Self { child })
    }

    /// Take ownership of the stdout handle.
    ///
    /// This can only be called once; subsequent calls return `None`.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Take ownership of the stderr handle.
    ///
    /// This can only be called once; subsequent calls return `None`.
    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.stderr.take()
    }

    /// Get the process ID, if still running.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Wait for the process to exit.
    ///
    /// # Errors
    ///
    /// Returns an error if waiting fails.
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Send a kill signal without waiting for the process to exit.
    ///
    /// # Errors
    ///
    /// Returns an error if the kill signal cannot be sent.
    pub fn start_kill(&mut self) -> std::io::Result<()> {
        self.child.start_kill()
    }
}
