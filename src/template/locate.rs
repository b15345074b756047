//! Template discovery.
//!
//! `<name>.template` is searched for recursively under, in order, the
//! feature's own `template` directory, the project's `template` directory and
//! the project's `libs` directory. The first directory with a match wins.

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use super::TemplateError;
use crate::files::search_for_file;

/// File extension of template files.
pub const TEMPLATE_EXTENSION: &str = "template";

const LOCAL_DIR: &str = "template";
const GLOBAL_DIR: &str = "template";
const LIBRARY_DIR: &str = "libs";

/// Finds template files for a feature within a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateLocator {
    project_root: Utf8PathBuf,
    feature_dir: Option<Utf8PathBuf>,
}

impl TemplateLocator {
    /// Search the project's global and library directories only.
    #[must_use]
    pub fn new(project_root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            feature_dir: None,
        }
    }

    /// Also search the `template` directory next to a feature file.
    #[must_use]
    pub fn with_feature_dir(mut self, feature_dir: impl Into<Utf8PathBuf>) -> Self {
        self.feature_dir = Some(feature_dir.into());
        self
    }

    /// Directories searched, in priority order.
    #[must_use]
    pub fn search_dirs(&self) -> Vec<Utf8PathBuf> {
        let mut dirs = Vec::with_capacity(3);
        if let Some(feature_dir) = &self.feature_dir {
            dirs.push(feature_dir.join(LOCAL_DIR));
        }
        dirs.push(self.project_root.join(GLOBAL_DIR));
        dirs.push(self.project_root.join(LIBRARY_DIR));
        dirs
    }

    /// Locate `<name>.template`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::NotFound`] listing the searched directories
    /// when no directory holds the template, or a file error when a match
    /// has a non-UTF-8 path.
    pub fn locate(&self, name: &str) -> Result<Utf8PathBuf, TemplateError> {
        let file_name = template_file_name(name);
        let searched = self.search_dirs();
        for dir in &searched {
            if let Some(found) = search_for_file(dir, &file_name)?.into_iter().next() {
                debug!(template = name, path = %found, "located template");
                return Ok(found);
            }
        }
        Err(TemplateError::NotFound {
            name: name.to_owned(),
            searched,
        })
    }

    /// Path of `<name>.template` directly inside `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::NotFound`] when the file does not exist.
    pub fn locate_in(dir: &Utf8Path, name: &str) -> Result<Utf8PathBuf, TemplateError> {
        let path = dir.join(template_file_name(name));
        if path.is_file() {
            Ok(path)
        } else {
            Err(TemplateError::NotFound {
                name: name.to_owned(),
                searched: vec![dir.to_owned()],
            })
        }
    }
}

fn template_file_name(name: &str) -> String {
    format!("{name}.{TEMPLATE_EXTENSION}")
}
