//! Pipe reader management for command execution.

use std::{
    fmt,
    io::{self, Read},
    thread,
};

use super::error::CommandFailure;

const PIPE_CHUNK_SIZE: usize = 8192;

pub(super) type ReaderHandle = thread::JoinHandle<Result<Vec<u8>, CommandFailure>>;

/// Which output pipe of a child process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputStream {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        })
    }
}

struct PipeLimit {
    stream: OutputStream,
    limit: u64,
    consumed: u64,
}

impl PipeLimit {
    const fn new(stream: OutputStream, limit: u64) -> Self {
        Self {
            stream,
            limit,
            consumed: 0,
        }
    }

    fn record(&mut self, read: usize) -> Result<(), CommandFailure> {
        let bytes = u64::try_from(read)
            .map_err(|_| CommandFailure::Io(io::Error::other("pipe read size overflow")))?;
        let new_total = self
            .consumed
            .checked_add(bytes)
            .ok_or_else(|| CommandFailure::Io(io::Error::other("pipe output size overflow")))?;
        if new_total > self.limit {
            return Err(CommandFailure::OutputLimit {
                stream: self.stream,
                limit: self.limit,
            });
        }
        self.consumed = new_total;
        Ok(())
    }
}

pub(super) fn spawn_pipe_reader<R>(
    pipe: Option<R>,
    stream: OutputStream,
    limit: u64,
) -> Option<ReaderHandle>
where
    R: Read + Send + 'static,
{
    pipe.map(|reader| thread::spawn(move || read_pipe(reader, PipeLimit::new(stream, limit))))
}

pub(super) fn join_reader(reader_handle: Option<ReaderHandle>) -> Result<Vec<u8>, CommandFailure> {
    match reader_handle {
        Some(join_handle) => join_handle
            .join()
            .map_err(|_| CommandFailure::Io(io::Error::other("pipe reader panicked")))?,
        None => Ok(Vec::new()),
    }
}

/// Drop reader handles without joining them.
///
/// A killed child's descendants may still hold the pipes open, so joining
/// could block; detached readers finish on their own once the pipes close.
pub(super) fn detach_readers(
    stdout_reader: &mut Option<ReaderHandle>,
    stderr_reader: &mut Option<ReaderHandle>,
) {
    for (stream, reader_handle) in [
        (OutputStream::Stdout, stdout_reader.take()),
        (OutputStream::Stderr, stderr_reader.take()),
    ] {
        if let Some(join_handle) = reader_handle
            && !join_handle.is_finished()
        {
            tracing::debug!(%stream, "detaching pipe reader");
        }
    }
}

/// Read the pipe to EOF, keeping at most `limit` bytes.
///
/// Once the budget is exceeded the remaining output is drained and
/// discarded so the child never blocks on a full pipe.
fn read_pipe<R>(mut reader: R, mut limit: PipeLimit) -> Result<Vec<u8>, CommandFailure>
where
    R: Read,
{
    let mut buf = Vec::new();
    let mut chunk = [0_u8; PIPE_CHUNK_SIZE];
    let mut exceeded = None;
    loop {
        let read = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(CommandFailure::Io(err)),
        };
        if exceeded.is_some() {
            continue;
        }
        match limit.record(read) {
            Ok(()) => buf.extend(chunk.iter().take(read).copied()),
            Err(err) => exceeded = Some(err),
        }
    }
    exceeded.map_or(Ok(buf), Err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_within_budget() {
        let data = b"hello world".to_vec();
        let out = read_pipe(Cursor::new(data.clone()), PipeLimit::new(OutputStream::Stdout, 64))
            .expect("within budget");
        assert_eq!(out, data);
    }

    #[test]
    fn reports_exceeded_budget_after_draining() {
        let data = vec![b'x'; PIPE_CHUNK_SIZE * 3];
        let err = read_pipe(Cursor::new(data), PipeLimit::new(OutputStream::Stderr, 10))
            .expect_err("budget exceeded");
        assert!(matches!(
            err,
            CommandFailure::OutputLimit {
                stream: OutputStream::Stderr,
                limit: 10
            }
        ));
    }

    #[test]
    fn missing_pipe_joins_to_empty_output() {
        assert!(join_reader(None).expect("no reader").is_empty());
    }

    #[test]
    fn spawned_reader_returns_bytes() {
        let handle = spawn_pipe_reader(Some(Cursor::new(b"abc".to_vec())), OutputStream::Stdout, 8);
        assert_eq!(join_reader(handle).expect("joined"), b"abc");
    }
}
