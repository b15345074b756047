//! Run external commands from steps.
//!
//! Command lines are split with POSIX shell-word rules and executed directly,
//! without a shell. Output on both pipes is captured by reader threads under
//! a byte budget. Blocking execution waits for the child, killing it when
//! the timeout elapses; background execution returns a [`RunningCommand`]
//! that can be polled or waited on later. On Unix each command runs in its
//! own process group so a timeout also kills what it forked.
//!
//! A non-zero exit status is reported in [`CommandOutput`] rather than as an
//! error so steps can assert on failures.

mod error;
mod execution;
mod pipes;

pub use error::CommandError;
pub use pipes::OutputStream;

use std::{process::ExitStatus, time::Duration};

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use execution::{Finished, SpawnedChild, finish_child, spawn_child};

/// Default per-pipe output budget in bytes.
pub const DEFAULT_MAX_OUTPUT_BYTES: u64 = 1024 * 1024;

/// Whether to wait for a command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Wait for the command to finish.
    #[default]
    Blocking,
    /// Start the command and return immediately.
    Background,
}

/// A command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    /// Command line, split with shell-word rules.
    pub command: String,
    /// Directory to run in; the current directory when unset.
    pub working_dir: Option<Utf8PathBuf>,
    /// Kill the command when it runs longer than this.
    pub timeout: Option<Duration>,
    /// Blocking or background execution.
    pub mode: ExecutionMode,
}

impl CommandRequest {
    /// A blocking request with no working directory or timeout.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            working_dir: None,
            timeout: None,
            mode: ExecutionMode::Blocking,
        }
    }

    /// Run in `dir`.
    #[must_use]
    pub fn in_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Kill the command after `timeout`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run in the background.
    #[must_use]
    pub const fn in_background(mut self) -> Self {
        self.mode = ExecutionMode::Background;
        self
    }

    /// Split the command line into program and arguments.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidCommand`] when the line is blank or
    /// has unbalanced quotes.
    pub fn words(&self) -> Result<Vec<String>, CommandError> {
        let invalid = |reason| CommandError::InvalidCommand {
            command: self.command.clone(),
            reason,
        };
        let words = shlex::split(&self.command).ok_or_else(|| invalid("unbalanced quotes"))?;
        if words.is_empty() {
            return Err(invalid("command is empty"));
        }
        Ok(words)
    }
}

/// Output of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was terminated by a signal.
    pub status: Option<i32>,
    /// Captured standard output, decoded lossily as UTF-8.
    pub stdout: String,
    /// Captured standard error, decoded lossily as UTF-8.
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the command exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.status, Some(0))
    }

    fn from_finished(finished: Finished) -> Self {
        Self {
            status: finished.status.code(),
            stdout: String::from_utf8_lossy(&finished.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&finished.stderr).into_owned(),
        }
    }
}

/// Result of [`CommandRunner::execute`].
#[derive(Debug)]
pub enum Execution {
    /// A blocking command ran to completion.
    Finished(CommandOutput),
    /// A background command is still running.
    Running(RunningCommand),
}

/// Handle on a command started in the background.
///
/// Dropping the handle before the command exits kills the command and any
/// processes it started.
#[derive(Debug)]
pub struct RunningCommand {
    command: String,
    timeout: Option<Duration>,
    spawned: SpawnedChild,
}

impl RunningCommand {
    /// The command line.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// OS process identifier.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.spawned.child.id()
    }

    /// Poll for exit without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Io`] when the status cannot be queried.
    pub fn try_status(&mut self) -> Result<Option<ExitStatus>, CommandError> {
        self.spawned
            .child
            .try_wait()
            .map_err(|source| CommandError::Io {
                command: self.command.clone(),
                source,
            })
    }

    /// Wait for the command, applying the request's timeout from spawn time.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Timeout`] when the command was killed,
    /// [`CommandError::OutputLimit`] when a pipe exceeded its budget, or
    /// [`CommandError::Io`].
    pub fn wait(self) -> Result<CommandOutput, CommandError> {
        let Self {
            command,
            timeout,
            spawned,
        } = self;
        let finished = finish_child(spawned, timeout).map_err(|err| {
            let error = err.into_error(&command);
            warn!(%command, %error, "command failed");
            error
        })?;
        let output = CommandOutput::from_finished(finished);
        log_outcome(&command, &output);
        Ok(output)
    }
}

/// Executes [`CommandRequest`]s under shared limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandRunner {
    max_output_bytes: u64,
    default_timeout: Option<Duration>,
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self {
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            default_timeout: None,
        }
    }
}

impl CommandRunner {
    /// A runner with the given per-pipe budget and no default timeout.
    #[must_use]
    pub const fn new(max_output_bytes: u64) -> Self {
        Self {
            max_output_bytes,
            default_timeout: None,
        }
    }

    /// Timeout applied to requests that do not set their own.
    #[must_use]
    pub const fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Run `request` according to its mode.
    ///
    /// # Errors
    ///
    /// See [`CommandRunner::run`] and [`CommandRunner::spawn`].
    pub fn execute(&self, request: &CommandRequest) -> Result<Execution, CommandError> {
        match request.mode {
            ExecutionMode::Blocking => self.run(request).map(Execution::Finished),
            ExecutionMode::Background => self.spawn(request).map(Execution::Running),
        }
    }

    /// Run `request` to completion regardless of its mode.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidCommand`], [`CommandError::Spawn`],
    /// [`CommandError::Timeout`], [`CommandError::OutputLimit`] or
    /// [`CommandError::Io`].
    pub fn run(&self, request: &CommandRequest) -> Result<CommandOutput, CommandError> {
        self.spawn(request)?.wait()
    }

    /// Start `request` and return without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidCommand`] or [`CommandError::Spawn`].
    pub fn spawn(&self, request: &CommandRequest) -> Result<RunningCommand, CommandError> {
        let words = request.words().inspect_err(|error| {
            warn!(command = %request.command, %error, "rejected command line");
        })?;
        info!(
            command = %request.command,
            dir = ?request.working_dir,
            mode = ?request.mode,
            "starting command"
        );
        let spawned = spawn_child(
            &words,
            request.working_dir.as_deref(),
            self.max_output_bytes,
        )
        .map_err(|err| {
            let error = err.into_error(&request.command);
            warn!(command = %request.command, %error, "command failed to start");
            error
        })?;
        Ok(RunningCommand {
            command: request.command.clone(),
            timeout: request.timeout.or(self.default_timeout),
            spawned,
        })
    }
}

fn log_outcome(command: &str, output: &CommandOutput) {
    if output.success() {
        info!(command, "command finished successfully");
    } else {
        warn!(
            command,
            status = ?output.status,
            stderr = %output.stderr.trim_end(),
            "command exited unsuccessfully"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("echo 'a b' c", &["echo", "a b", "c"])]
    #[case("  ls   -l ", &["ls", "-l"])]
    fn splits_command_lines(#[case] line: &str, #[case] expected: &[&str]) {
        assert_eq!(CommandRequest::new(line).words().expect("valid"), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("echo 'unterminated")]
    fn rejects_invalid_command_lines(#[case] line: &str) {
        let err = CommandRequest::new(line).words().expect_err("invalid");
        assert!(matches!(err, CommandError::InvalidCommand { .. }));
    }

    #[test]
    fn request_timeout_overrides_default() {
        let runner = CommandRunner::default().with_default_timeout(Some(Duration::from_secs(9)));
        let request = CommandRequest::new("true").with_timeout(Duration::from_secs(1));
        assert_eq!(request.timeout.or(runner.default_timeout), Some(Duration::from_secs(1)));
    }

    #[rstest]
    #[case(Some(0), true)]
    #[case(Some(2), false)]
    #[case(None, false)]
    fn success_requires_zero_status(#[case] status: Option<i32>, #[case] expected: bool) {
        let output = CommandOutput {
            status,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(output.success(), expected);
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_reported_not_raised() {
        let output = CommandRunner::default()
            .run(&CommandRequest::new("sh -c 'echo oops >&2; exit 3'"))
            .expect("command runs");
        assert_eq!(output.status, Some(3));
        assert_eq!(output.stderr.trim(), "oops");
    }

    #[cfg(unix)]
    #[test]
    fn background_command_can_be_polled_and_waited() {
        let mut running = CommandRunner::default()
            .spawn(&CommandRequest::new("sleep 0.2").in_background())
            .expect("spawned");
        assert!(running.id() > 0);
        let _status = running.try_status().expect("poll");
        let output = running.wait().expect("finished");
        assert!(output.success());
    }

    #[cfg(unix)]
    #[test]
    fn output_budget_is_enforced() {
        let err = CommandRunner::new(4)
            .run(&CommandRequest::new("echo too-much-output"))
            .expect_err("budget exceeded");
        assert!(matches!(
            err,
            CommandError::OutputLimit {
                stream: OutputStream::Stdout,
                limit: 4,
                ..
            }
        ));
    }
}
