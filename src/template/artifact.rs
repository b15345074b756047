//! Persist evaluated templates so failing comparisons can be inspected.

use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use tempfile::Builder;
use tracing::info;

use super::{TemplateError, locate::TEMPLATE_EXTENSION};

/// Write `text` to `<dir>/<sanitised-name>XXXX.template` and keep the file.
///
/// The directory is created when missing. The artefact path is logged at
/// `info` under the template's file name.
///
/// # Errors
///
/// Returns [`TemplateError::Artifact`] when the directory or file cannot be
/// created or written, or the resulting path is not UTF-8.
pub fn persist_artifact(name: &str, text: &str, dir: &Utf8Path) -> Result<Utf8PathBuf, TemplateError> {
    write_artifact(name, text, dir).map_err(|source| TemplateError::Artifact {
        dir: dir.to_owned(),
        source,
    })
}

fn write_artifact(name: &str, text: &str, dir: &Utf8Path) -> io::Result<Utf8PathBuf> {
    Dir::create_ambient_dir_all(dir, ambient_authority())?;
    let prefix = sanitize_label(name);
    let suffix = format!(".{TEMPLATE_EXTENSION}");
    let mut file = Builder::new()
        .prefix(&prefix)
        .suffix(&suffix)
        .tempfile_in(dir)?;
    file.write_all(text.as_bytes())?;
    file.flush()?;
    let kept = file.into_temp_path().keep().map_err(|err| err.error)?;
    let path = Utf8PathBuf::from_path_buf(kept).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidData, "artefact path is not valid UTF-8")
    })?;
    info!(artifact = %path, name = %format!("{name}.{TEMPLATE_EXTENSION}"), "saved evaluated template");
    Ok(path)
}

fn sanitize_label(label: &str) -> String {
    let mut sanitized: String = label
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_') {
                ch
            } else {
                '-'
            }
        })
        .collect();
    if sanitized.is_empty() {
        sanitized.push('t');
    }
    sanitized
}
