//! Command execution errors.
//!
//! [`CommandFailure`] is what the execution helpers produce; it is decorated
//! with the command line when converted into the public [`CommandError`].

// The miette/thiserror derives trigger `unused_assignments` on some Rust
// versions only, so `#[expect]` cannot be used here.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use std::{io, time::Duration};

use miette::Diagnostic;
use thiserror::Error;

use super::pipes::OutputStream;

/// Failures while running an external command.
#[derive(Debug, Error, Diagnostic)]
pub enum CommandError {
    /// The command line is empty or cannot be split into words.
    #[error("invalid command '{command}': {reason}")]
    #[diagnostic(
        code(stepcore::command::invalid),
        help("commands are split with POSIX shell quoting rules and run without a shell")
    )]
    InvalidCommand {
        /// The command line as given.
        command: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The program could not be started.
    #[error("failed to start '{command}'")]
    #[diagnostic(
        code(stepcore::command::spawn),
        help("check that the program exists, is executable and the working directory is valid")
    )]
    Spawn {
        /// The command line.
        command: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// Interacting with the running process failed.
    #[error("I/O error while running '{command}'")]
    #[diagnostic(code(stepcore::command::io))]
    Io {
        /// The command line.
        command: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The process outlived its timeout and was killed.
    #[error("'{command}' did not finish within {}s", .timeout.as_secs_f64())]
    #[diagnostic(code(stepcore::command::timeout))]
    Timeout {
        /// The command line.
        command: String,
        /// Timeout that elapsed.
        timeout: Duration,
    },

    /// A pipe produced more output than allowed.
    #[error("'{command}' wrote more than {limit} bytes to {stream}")]
    #[diagnostic(
        code(stepcore::command::output_limit),
        help("raise max_output_bytes or reduce the command's output")
    )]
    OutputLimit {
        /// The command line.
        command: String,
        /// Pipe that exceeded the budget.
        stream: OutputStream,
        /// Configured byte ceiling.
        limit: u64,
    },
}

/// Undecorated execution failure.
#[derive(Debug)]
pub(super) enum CommandFailure {
    Spawn(io::Error),
    Io(io::Error),
    OutputLimit { stream: OutputStream, limit: u64 },
    Timeout(Duration),
}

#[rustfmt::skip]
impl From<io::Error> for CommandFailure { fn from(err: io::Error) -> Self { Self::Io(err) } }

impl CommandFailure {
    pub(super) fn into_error(self, command_line: &str) -> CommandError {
        let command = command_line.to_owned();
        match self {
            Self::Spawn(source) => CommandError::Spawn { command, source },
            Self::Io(source) => CommandError::Io { command, source },
            Self::OutputLimit { stream, limit } => CommandError::OutputLimit {
                command,
                stream,
                limit,
            },
            Self::Timeout(timeout) => CommandError::Timeout { command, timeout },
        }
    }
}
