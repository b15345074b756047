//! Temporary project directories for tests.
//!
//! A [`TempWorkspace`] is a temporary directory marked as a project root
//! with an empty `Cargo.toml`, so project discovery stops there.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use tempfile::TempDir;

/// A temporary project root that is removed on drop.
#[derive(Debug)]
pub struct TempWorkspace {
    _dir: TempDir,
    root: Utf8PathBuf,
    handle: Dir,
}

impl TempWorkspace {
    /// Create an empty workspace containing only the project marker.
    ///
    /// # Errors
    ///
    /// Fails when the directory cannot be created or is not UTF-8.
    pub fn new() -> Result<Self> {
        let dir = TempDir::new().context("create workspace")?;
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .map_err(|path| anyhow::anyhow!("non-UTF-8 workspace {}", path.display()))?;
        let handle = Dir::open_ambient_dir(&root, ambient_authority())
            .with_context(|| format!("open {root}"))?;
        let workspace = Self {
            _dir: dir,
            root,
            handle,
        };
        workspace.write("Cargo.toml", "")?;
        Ok(workspace)
    }

    /// Absolute path of the workspace root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Absolute path of `relative` inside the workspace.
    #[must_use]
    pub fn path(&self, relative: &str) -> Utf8PathBuf {
        self.root.join(relative)
    }

    /// Write `contents` to `relative`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Fails when the directories or file cannot be written.
    pub fn write(&self, relative: &str, contents: &str) -> Result<Utf8PathBuf> {
        if let Some(parent) = Utf8Path::new(relative).parent()
            && !parent.as_str().is_empty()
        {
            self.handle
                .create_dir_all(parent)
                .with_context(|| format!("create {parent}"))?;
        }
        self.handle
            .write(relative, contents)
            .with_context(|| format!("write {relative}"))?;
        Ok(self.path(relative))
    }

    /// Create the directory `relative` and its parents.
    ///
    /// # Errors
    ///
    /// Fails when the directory cannot be created.
    pub fn mkdir(&self, relative: &str) -> Result<Utf8PathBuf> {
        self.handle
            .create_dir_all(relative)
            .with_context(|| format!("create {relative}"))?;
        Ok(self.path(relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_nested_files() {
        let workspace = TempWorkspace::new().expect("workspace");
        let path = workspace.write("a/b/c.txt", "hi").expect("write");
        assert_eq!(std::fs::read_to_string(path).expect("read"), "hi");
        assert!(workspace.path("Cargo.toml").is_file());
    }
}
