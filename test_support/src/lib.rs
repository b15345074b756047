//! Shared helpers for stepcore's integration and behavioural tests.
//!
//! Provides temporary project workspaces, fake executables, environment
//! guards and error formatting.

pub mod env;
pub mod error;
pub mod workspace;

pub use env::{EnvLock, EnvVarGuard};
pub use error::display_error_chain;
pub use workspace::TempWorkspace;

use std::fs::{self, File};
use std::io::Write;

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use tempfile::TempDir;

/// Create an executable shell script called `name` running `body`.
///
/// Returns the temporary directory and the path to the script.
///
/// # Errors
///
/// Fails when the script cannot be written or made executable.
pub fn fake_script(name: &str, body: &str) -> Result<(TempDir, Utf8PathBuf)> {
    let dir = TempDir::new().context("create script dir")?;
    let path = Utf8PathBuf::from_path_buf(dir.path().join(name))
        .map_err(|path| anyhow::anyhow!("non-UTF-8 script path {}", path.display()))?;
    let mut file = File::create(&path).with_context(|| format!("create {path}"))?;
    writeln!(file, "#!/bin/sh\n{body}").with_context(|| format!("write {path}"))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&path)
            .with_context(|| format!("stat {path}"))?
            .permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).with_context(|| format!("chmod {path}"))?;
    }
    Ok((dir, path))
}
