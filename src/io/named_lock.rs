//! Cross-process named locks
//!
//! A [`NamedLock`] serializes access to a shared resource between threads of this
//! process and between processes. Two levels are taken in order:
//!
//! 1. an in-process `parking_lot` mutex looked up by name in a global registry, so
//!    threads never contend on the OS object (Windows mutexes are re-entrant per
//!    thread, and advisory file locks are per open file);
//! 2. the OS-level object: a `Local\` named mutex on Windows, an advisory lock on a
//!    lock file in the temp directory elsewhere.
//!
//! The OS object name is the hex SHA-256 digest of the lock name, so any string,
//! including a full path, is usable as a name.

use crate::error::{CommonError, Result};
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};
use tracing::debug;

#[cfg(windows)]
use windows::Win32::Foundation::{CloseHandle, HANDLE, WAIT_ABANDONED, WAIT_OBJECT_0, WAIT_TIMEOUT};
#[cfg(windows)]
use windows::Win32::System::Threading::{CreateMutexW, ReleaseMutex, WaitForSingleObject};

/// Timeout used by [`NamedLock::acquire`]
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Prefix of lock files created in the temp directory on non-Windows platforms
#[cfg(not(windows))]
const LOCK_FILE_PREFIX: &str = "common-utils-";

/// In-process half of every named lock, keyed by OS object name
static REGISTRY: LazyLock<Mutex<HashMap<String, Arc<Mutex<()>>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// A mutex identified by name and shared across processes
#[derive(Debug)]
pub struct NamedLock {
    name: String,
    os_name: String,
    local: Arc<Mutex<()>>,
}

impl NamedLock {
    /// Create a lock handle for `name`
    ///
    /// Creating the handle does not acquire anything. Handles created with the same
    /// name, in this process or another, refer to the same lock.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let os_name = digest_name(&name);
        let local = Arc::clone(
            REGISTRY
                .lock()
                .entry(os_name.clone())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        );
        Self {
            name,
            os_name,
            local,
        }
    }

    /// Create the lock guarding a file path
    ///
    /// The path is made absolute and lexically normalized first, so `./a/../b.txt`
    /// and the absolute form of `b.txt` share a lock. On Windows the comparison is
    /// case-insensitive, matching the file system.
    pub fn for_path(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(path_lock_name(path.as_ref())?))
    }

    /// Name this lock was created with
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Acquire the lock, waiting up to [`DEFAULT_LOCK_TIMEOUT`]
    pub fn acquire(&self) -> Result<NamedLockGuard> {
        self.acquire_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    /// Acquire the lock, waiting at most `timeout`
    ///
    /// Returns `CommonError::LockTimeout` if the lock is still held elsewhere when
    /// the timeout elapses.
    pub fn acquire_timeout(&self, timeout: Duration) -> Result<NamedLockGuard> {
        self.acquire_until(Some(timeout))?
            .ok_or_else(|| CommonError::LockTimeout {
                name: self.name.clone(),
                waited: timeout,
            })
    }

    /// Acquire the lock only if it is free right now
    ///
    /// `Ok(None)` means another thread or process holds it, which makes this the
    /// building block for single-instance checks.
    pub fn try_acquire(&self) -> Result<Option<NamedLockGuard>> {
        self.acquire_until(None)
    }

    fn acquire_until(&self, timeout: Option<Duration>) -> Result<Option<NamedLockGuard>> {
        let started = Instant::now();

        // In-process mutex first: only one thread per process ever waits on the OS object
        let local = match timeout {
            Some(timeout) => self.local.try_lock_arc_for(timeout),
            None => self.local.try_lock_arc(),
        };
        let Some(local) = local else {
            debug!(lock = %self.name, "Named lock busy in this process");
            return Ok(None);
        };

        // Whatever the local wait used up comes off the OS wait
        let remaining = timeout.map(|t| t.saturating_sub(started.elapsed()));
        match os::acquire(&self.os_name, remaining)? {
            Some(os) => {
                debug!(lock = %self.name, "Named lock acquired");
                Ok(Some(NamedLockGuard {
                    name: self.name.clone(),
                    os_name: self.os_name.clone(),
                    _os: os,
                    local,
                }))
            }
            None => {
                // `local` drops here, letting the next thread of this process try
                debug!(lock = %self.name, "Named lock held by another process");
                Ok(None)
            }
        }
    }
}

impl Drop for NamedLock {
    fn drop(&mut self) {
        // An outstanding guard prunes the entry itself when it drops
        if !self.local.is_locked() {
            prune_registry(&self.os_name, &self.local);
        }
    }
}

/// Drop the registry entry for `os_name` once `local` is its only other owner
///
/// Runs under the registry lock, so no new handle can clone the entry between
/// the count check and the removal.
fn prune_registry(os_name: &str, local: &Arc<Mutex<()>>) {
    let mut registry = REGISTRY.lock();
    if Arc::strong_count(local) == 2 {
        registry.remove(os_name);
    }
}

/// Proof of ownership of a [`NamedLock`]; released on drop
///
/// Fields drop in declaration order, so the OS object is released before the
/// in-process mutex lets the next thread in.
pub struct NamedLockGuard {
    name: String,
    os_name: String,
    _os: os::OsGuard,
    local: ArcMutexGuard<RawMutex, ()>,
}

impl NamedLockGuard {
    /// Name of the held lock
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for NamedLockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedLockGuard")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Drop for NamedLockGuard {
    fn drop(&mut self) {
        // Still locked here; the fields release the OS object and then the mutex.
        // A handle created after the prune gets a fresh mutex and waits on the OS
        // object instead.
        prune_registry(&self.os_name, ArcMutexGuard::mutex(&self.local));
        debug!(lock = %self.name, "Named lock released");
    }
}

/// Lock name shared by every handle guarding `path`
fn path_lock_name(path: &Path) -> Result<String> {
    let normalized = normalize_path(&std::path::absolute(path)?);
    let text = normalized.to_string_lossy();
    // Windows file systems compare names case-insensitively
    let key = if cfg!(windows) {
        text.to_lowercase()
    } else {
        text.into_owned()
    };
    Ok(format!("path:{key}"))
}

/// Whether the in-process registry holds an entry for `path`'s lock
#[cfg(test)]
pub(crate) fn is_path_registered(path: &Path) -> bool {
    path_lock_name(path).is_ok_and(|name| REGISTRY.lock().contains_key(&digest_name(&name)))
}

/// Hex digest used as the OS object name (first 128 bits of SHA-256)
fn digest_name(name: &str) -> String {
    let digest = Sha256::digest(name.as_bytes());
    digest[..16]
        .iter()
        .fold(String::with_capacity(32), |mut out, byte| {
            let _ = write!(out, "{byte:02x}");
            out
        })
}

/// Resolve `.` and `..` components without touching the file system
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(windows)]
mod os {
    use super::{CloseHandle, CreateMutexW, HANDLE, ReleaseMutex, WaitForSingleObject};
    use super::{WAIT_ABANDONED, WAIT_OBJECT_0, WAIT_TIMEOUT};
    use crate::error::{CommonError, Result};
    use std::time::Duration;
    use tracing::warn;
    use windows::core::HSTRING;

    /// Owned handle of a held named mutex
    pub(super) struct OsGuard {
        handle: HANDLE,
    }

    /// Open (or create) the named mutex and wait for ownership
    #[allow(unsafe_code)] // Windows FFI for mutex
    pub(super) fn acquire(os_name: &str, timeout: Option<Duration>) -> Result<Option<OsGuard>> {
        let mutex_name = HSTRING::from(format!("Local\\common-utils-{os_name}"));
        // INFINITE is u32::MAX; clamp below it so a huge timeout still ends.
        let millis = timeout.map_or(0, |t| {
            u32::try_from(t.as_millis()).unwrap_or(u32::MAX - 1).min(u32::MAX - 1)
        });

        unsafe {
            let handle = CreateMutexW(None, false, &mutex_name)?;
            let wait = WaitForSingleObject(handle, millis);
            if wait == WAIT_OBJECT_0 {
                Ok(Some(OsGuard { handle }))
            } else if wait == WAIT_ABANDONED {
                // Previous owner exited without releasing; ownership passes to us.
                warn!("Named mutex was abandoned by its previous owner");
                Ok(Some(OsGuard { handle }))
            } else if wait == WAIT_TIMEOUT {
                let _ = CloseHandle(handle);
                Ok(None)
            } else {
                let error = std::io::Error::last_os_error();
                let _ = CloseHandle(handle);
                Err(CommonError::LockError(Box::new(error)))
            }
        }
    }

    impl Drop for OsGuard {
        #[allow(unsafe_code)] // Windows FFI for mutex cleanup
        fn drop(&mut self) {
            unsafe {
                let _ = ReleaseMutex(self.handle);
                let _ = CloseHandle(self.handle);
            }
        }
    }
}

#[cfg(not(windows))]
mod os {
    use super::LOCK_FILE_PREFIX;
    use crate::error::{CommonError, Result};
    use std::fs::{File, OpenOptions, TryLockError};
    use std::io::ErrorKind;
    use std::path::{Path, PathBuf};
    use std::time::{Duration, Instant};

    /// First retry delay while another process holds the lock
    const INITIAL_BACKOFF: Duration = Duration::from_millis(1);
    /// Upper bound for the retry delay
    const MAX_BACKOFF: Duration = Duration::from_millis(50);

    /// Open lock file holding an exclusive advisory lock
    pub(super) struct OsGuard {
        file: File,
    }

    pub(super) fn lock_file_path(os_name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("{LOCK_FILE_PREFIX}{os_name}.lock"))
    }

    fn open_lock_file(path: &Path) -> std::io::Result<File> {
        match OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
        {
            // Created by another user: a read-only handle can still be locked.
            Err(e) if e.kind() == ErrorKind::PermissionDenied => File::open(path),
            other => other,
        }
    }

    /// Poll the advisory lock until it is granted or `timeout` elapses
    pub(super) fn acquire(os_name: &str, timeout: Option<Duration>) -> Result<Option<OsGuard>> {
        let file = open_lock_file(&lock_file_path(os_name))?;
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut backoff = INITIAL_BACKOFF;

        loop {
            match file.try_lock() {
                Ok(()) => return Ok(Some(OsGuard { file })),
                Err(TryLockError::WouldBlock) => {
                    let now = Instant::now();
                    match deadline {
                        Some(deadline) if now < deadline => {
                            std::thread::sleep(backoff.min(deadline - now));
                            backoff = (backoff * 2).min(MAX_BACKOFF);
                        }
                        _ => return Ok(None),
                    }
                }
                Err(TryLockError::Error(e)) => return Err(CommonError::LockError(Box::new(e))),
            }
        }
    }

    impl Drop for OsGuard {
        fn drop(&mut self) {
            let _ = self.file.unlock();
        }
    }
}
