//! Serialised environment mutation for tests.
//!
//! `std::env::set_var` and `remove_var` are `unsafe` in Rust 2024 because
//! they mutate process-global state. [`EnvVarGuard`] constructors borrow an
//! [`EnvLock`], so a guard cannot outlive the lock that serialises it. Tests
//! touching `STEPCORE_*` variables should also be marked `#[serial]`.

use std::{
    ffi::OsString,
    fmt,
    sync::{Mutex, MutexGuard},
};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// RAII guard holding the process-wide environment lock.
pub struct EnvLock {
    _guard: MutexGuard<'static, ()>,
}

impl fmt::Debug for EnvLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvLock").finish_non_exhaustive()
    }
}

impl EnvLock {
    /// Acquire the lock, recovering it if a previous holder panicked.
    #[must_use]
    pub fn acquire() -> Self {
        let guard = ENV_LOCK
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Self { _guard: guard }
    }

    /// Set `name` to `value` until the returned guard drops.
    #[must_use]
    pub fn set(&self, name: &str, value: &str) -> EnvVarGuard<'_> {
        EnvVarGuard::new(self, name, Some(value))
    }

    /// Remove `name` until the returned guard drops.
    #[must_use]
    pub fn remove(&self, name: &str) -> EnvVarGuard<'_> {
        EnvVarGuard::new(self, name, None)
    }
}

/// Restores an environment variable to its previous value on drop.
#[derive(Debug)]
pub struct EnvVarGuard<'lock> {
    _lock: &'lock EnvLock,
    name: String,
    previous: Option<OsString>,
}

impl<'lock> EnvVarGuard<'lock> {
    fn new(lock: &'lock EnvLock, name: &str, value: Option<&str>) -> Self {
        let previous = std::env::var_os(name);
        // SAFETY: `lock` serialises mutations of the process environment.
        unsafe {
            match value {
                Some(text) => std::env::set_var(name, text),
                None => std::env::remove_var(name),
            }
        }
        Self {
            _lock: lock,
            name: name.to_owned(),
            previous,
        }
    }
}

impl Drop for EnvVarGuard<'_> {
    fn drop(&mut self) {
        // SAFETY: the borrowed `EnvLock` is still held while restoring.
        unsafe {
            match &self.previous {
                Some(value) => std::env::set_var(&self.name, value),
                None => std::env::remove_var(&self.name),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restores_previous_value() {
        let lock = EnvLock::acquire();
        let name = "STEPCORE_TEST_SUPPORT_GUARD";
        {
            let _outer = lock.set(name, "outer");
            {
                let _inner = lock.set(name, "inner");
                assert_eq!(std::env::var(name).as_deref(), Ok("inner"));
            }
            assert_eq!(std::env::var(name).as_deref(), Ok("outer"));
        }
        assert!(std::env::var_os(name).is_none());
    }
}
