//! Process spawning and waiting.

use std::{
    io,
    process::{Child, Command, ExitStatus, Stdio},
    time::{Duration, Instant},
};

use camino::Utf8Path;
use wait_timeout::ChildExt;

use super::{
    error::CommandFailure,
    pipes::{OutputStream, ReaderHandle, detach_readers, join_reader, spawn_pipe_reader},
};

/// A spawned child together with its pipe readers.
///
/// On Unix the child leads its own process group, so killing it also kills
/// anything it forked. Dropping a child that has not been reaped kills and
/// reaps it.
#[derive(Debug)]
pub(super) struct SpawnedChild {
    pub(super) child: Child,
    pub(super) stdout_reader: Option<ReaderHandle>,
    pub(super) stderr_reader: Option<ReaderHandle>,
    pub(super) started: Instant,
}

/// Raw result of a finished child.
#[derive(Debug)]
pub(super) struct Finished {
    pub(super) status: ExitStatus,
    pub(super) stdout: Vec<u8>,
    pub(super) stderr: Vec<u8>,
}

pub(super) fn spawn_child(
    words: &[String],
    working_dir: Option<&Utf8Path>,
    max_output_bytes: u64,
) -> Result<SpawnedChild, CommandFailure> {
    let Some((program, args)) = words.split_first() else {
        return Err(CommandFailure::Spawn(io::Error::new(
            io::ErrorKind::InvalidInput,
            "empty command",
        )));
    };
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = working_dir {
        command.current_dir(dir);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let mut child = command.spawn().map_err(CommandFailure::Spawn)?;
    let started = Instant::now();
    let stdout_reader =
        spawn_pipe_reader(child.stdout.take(), OutputStream::Stdout, max_output_bytes);
    let stderr_reader =
        spawn_pipe_reader(child.stderr.take(), OutputStream::Stderr, max_output_bytes);
    Ok(SpawnedChild {
        child,
        stdout_reader,
        stderr_reader,
        started,
    })
}

/// Wait for `spawned` to exit and collect its output.
///
/// The timeout counts from the moment the child was spawned.
pub(super) fn finish_child(
    mut spawned: SpawnedChild,
    timeout: Option<Duration>,
) -> Result<Finished, CommandFailure> {
    let remaining = timeout.map(|limit| limit.saturating_sub(spawned.started.elapsed()));
    let status = match wait_for_exit(&mut spawned.child, remaining, timeout) {
        Ok(status) => status,
        Err(err) => {
            detach_readers(&mut spawned.stdout_reader, &mut spawned.stderr_reader);
            return Err(err);
        }
    };

    let stdout = join_reader(spawned.stdout_reader.take());
    let stderr = join_reader(spawned.stderr_reader.take());
    Ok(Finished {
        status,
        stdout: stdout?,
        stderr: stderr?,
    })
}

/// Wait for `child`, killing it when `remaining` elapses.
///
/// `reported` is the configured timeout surfaced in the error.
fn wait_for_exit(
    child: &mut Child,
    remaining: Option<Duration>,
    reported: Option<Duration>,
) -> Result<ExitStatus, CommandFailure> {
    let Some(wait) = remaining else {
        return child.wait().map_err(CommandFailure::Io);
    };
    if let Some(status) = child.wait_timeout(wait).map_err(CommandFailure::Io)? {
        Ok(status)
    } else {
        kill_process_tree(child).map_err(CommandFailure::Io)?;
        if let Err(err) = child.wait() {
            tracing::warn!("failed to reap timed-out command: {err}");
        }
        Err(CommandFailure::Timeout(reported.unwrap_or(wait)))
    }
}

/// Kill `child` and every process in its group.
#[cfg(unix)]
fn kill_process_tree(child: &mut Child) -> io::Result<()> {
    use rustix::{
        io::Errno,
        process::{Pid, Signal, kill_process_group},
    };

    match kill_process_group(Pid::from_child(child), Signal::KILL) {
        Ok(()) => Ok(()),
        Err(errno) if errno == Errno::SRCH => Ok(()),
        Err(errno) => Err(errno.into()),
    }
}

#[cfg(not(unix))]
fn kill_process_tree(child: &mut Child) -> io::Result<()> {
    match child.kill() {
        Err(err) if err.kind() != io::ErrorKind::InvalidInput => Err(err),
        _ => Ok(()),
    }
}

impl Drop for SpawnedChild {
    fn drop(&mut self) {
        if matches!(self.child.try_wait(), Ok(Some(_))) {
            return;
        }
        let pid = self.child.id();
        if let Err(err) = kill_process_tree(&mut self.child) {
            tracing::warn!(pid, "failed to kill abandoned command: {err}");
        }
        if let Err(err) = self.child.wait() {
            tracing::warn!(pid, "failed to reap abandoned command: {err}");
        }
        detach_readers(&mut self.stdout_reader, &mut self.stderr_reader);
        tracing::debug!(pid, "killed abandoned command");
    }
}
