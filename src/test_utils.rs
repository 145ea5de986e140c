#![expect(
    clippy::unwrap_used,
    reason = "Test utilities use .unwrap() for brevity"
)]

//! Shared test utilities for `common-utils` unit tests.
//!
//! This module provides common test infrastructure used across multiple test modules.
//! It is only compiled during testing (`#[cfg(test)]`).

use std::ffi::{OsStr, OsString};
use std::sync::Mutex;
use tempfile::TempDir;

/// Global mutex to serialize tests that modify process environment variables.
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Helper function to create a temporary test directory using tempfile.
/// Returns a `TempDir` that automatically cleans up when dropped.
pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// RAII guard that sets environment variables for a test scope and restores the
/// original values when dropped.
///
/// # Safety Considerations
///
/// `std::env::set_var` and `std::env::remove_var` are unsafe because another
/// thread may read the environment concurrently. Within this crate only tests
/// holding `ENV_LOCK` touch the process environment, and library code reads it
/// only through `Locations::new`, which those same tests call while holding the
/// guard.
pub struct EnvGuard {
    originals: Vec<(String, Option<OsString>)>,
    // Held for the lifetime of the guard so environment changes never interleave
    _lock: std::sync::MutexGuard<'static, ()>,
}

#[expect(
    unsafe_code,
    reason = "Test-only code that modifies environment variables under ENV_LOCK"
)]
impl EnvGuard {
    /// Set every `(key, value)` pair, remembering what was there before.
    pub fn set(vars: &[(&str, &OsStr)]) -> Self {
        // A panicking test poisons the lock; the environment is restored by Drop anyway.
        let lock = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        let originals = vars
            .iter()
            .map(|(key, _)| ((*key).to_string(), std::env::var_os(key)))
            .collect();
        for (key, value) in vars {
            // SAFETY: ENV_LOCK is held, see struct-level documentation.
            unsafe {
                std::env::set_var(key, value);
            }
        }
        Self {
            originals,
            _lock: lock,
        }
    }
}

#[expect(
    unsafe_code,
    reason = "Test-only code that restores environment variables under ENV_LOCK"
)]
impl Drop for EnvGuard {
    fn drop(&mut self) {
        // Restore in reverse so a key listed twice ends at its true original value.
        for (key, original) in self.originals.iter().rev() {
            // SAFETY: ENV_LOCK is still held by `self._lock`.
            unsafe {
                match original {
                    Some(value) => std::env::set_var(key, value),
                    None => std::env::remove_var(key),
                }
            }
        }
    }
}

#[test]
fn test_env_guard_restores_previous_value() {
    let key = "COMMON_UTILS_ENV_GUARD_TEST";
    {
        let _guard = EnvGuard::set(&[(key, OsStr::new("inside"))]);
        assert_eq!(std::env::var(key).unwrap(), "inside");
    }
    assert!(std::env::var_os(key).is_none());
}
