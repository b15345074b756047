//! UTF-8 file helpers: reading text, recursive search and project root
//! discovery.
//!
//! Reads go through a `cap_std` handle on the file's parent directory.
//! Template artefacts are the one exception: their directory is created
//! with `cap_std`, but the file itself comes from `tempfile`.

mod error;

pub use error::FileError;

use std::{env, io};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// File whose presence marks a project root.
pub const PROJECT_MARKER: &str = "Cargo.toml";

/// Read `path` as UTF-8 text.
///
/// # Errors
///
/// Returns [`FileError::Read`] when the file cannot be opened or is not
/// valid UTF-8.
pub fn read_to_string(path: &Utf8Path) -> Result<String, FileError> {
    read_utf8(path).map_err(|source| {
        warn!(%path, error = %source, "failed to read file");
        FileError::Read {
            path: path.to_owned(),
            source,
        }
    })
}

/// Read `path` and split it into lines without terminators.
///
/// # Errors
///
/// See [`read_to_string`].
pub fn read_lines(path: &Utf8Path) -> Result<Vec<String>, FileError> {
    let content = read_to_string(path)?;
    Ok(content.lines().map(str::to_owned).collect())
}

fn read_utf8(path: &Utf8Path) -> io::Result<String> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_str().is_empty() => dir,
        _ => Utf8Path::new("."),
    };
    let entry = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let handle = Dir::open_ambient_dir(parent, ambient_authority())?;
    handle.read_to_string(entry)
}

/// Recursively find files named `file_name` below `dir`, sorted by path.
///
/// A missing directory yields an empty list. Unreadable entries are logged
/// and skipped.
///
/// # Errors
///
/// Returns [`FileError::NonUtf8Path`] when a matching path is not UTF-8.
pub fn search_for_file(dir: &Utf8Path, file_name: &str) -> Result<Vec<Utf8PathBuf>, FileError> {
    if !dir.is_dir() {
        debug!(%dir, file_name, "search directory does not exist");
        return Ok(Vec::new());
    }
    let mut matches = Vec::new();
    let walker = WalkDir::new(dir).follow_links(false).sort_by_file_name();
    for walk_entry in walker {
        let entry = match walk_entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(%dir, error = %err, "skipping unreadable entry during file search");
                continue;
            }
        };
        if !entry.file_type().is_file() || entry.file_name() != file_name {
            continue;
        }
        let path = Utf8PathBuf::from_path_buf(entry.into_path())
            .map_err(|path| FileError::NonUtf8Path { path })?;
        matches.push(path);
    }
    matches.sort();
    debug!(%dir, file_name, found = matches.len(), "file search finished");
    Ok(matches)
}

/// The current working directory as a UTF-8 path.
///
/// # Errors
///
/// Returns [`FileError::CurrentDir`] or [`FileError::NonUtf8Path`].
pub fn current_dir() -> Result<Utf8PathBuf, FileError> {
    let cwd = env::current_dir().map_err(|source| FileError::CurrentDir { source })?;
    Utf8PathBuf::from_path_buf(cwd).map_err(|path| FileError::NonUtf8Path { path })
}

/// Nearest ancestor of the current directory containing [`PROJECT_MARKER`],
/// or the current directory when none does.
///
/// # Errors
///
/// Fails when the current directory cannot be determined.
pub fn project_root() -> Result<Utf8PathBuf, FileError> {
    let cwd = current_dir()?;
    Ok(project_root_from(&cwd))
}

/// Nearest ancestor of `start` (inclusive) containing [`PROJECT_MARKER`],
/// or `start` itself.
#[must_use]
pub fn project_root_from(start: &Utf8Path) -> Utf8PathBuf {
    start
        .ancestors()
        .find(|candidate| candidate.join(PROJECT_MARKER).is_file())
        .unwrap_or(start)
        .to_owned()
}
