//! File access errors.

// The miette/thiserror derives trigger `unused_assignments` on some Rust
// versions only, so `#[expect]` cannot be used here.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use std::{io, path::PathBuf};

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

/// Failures reading files or discovering paths.
#[derive(Debug, Error, Diagnostic)]
pub enum FileError {
    /// A file could not be opened or read as UTF-8 text.
    #[error("failed to read {path}")]
    #[diagnostic(code(stepcore::files::read))]
    Read {
        /// File being read.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A discovered path is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", .path.display())]
    #[diagnostic(
        code(stepcore::files::non_utf8_path),
        help("rename the file or directory using UTF-8 characters")
    )]
    NonUtf8Path {
        /// The offending path.
        path: PathBuf,
    },

    /// The current working directory could not be determined.
    #[error("failed to determine the current directory")]
    #[diagnostic(code(stepcore::files::current_dir))]
    CurrentDir {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}
