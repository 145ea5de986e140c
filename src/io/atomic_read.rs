//! Reads that never observe a half-replaced file
//!
//! [`AtomicReader`] holds the destination's [`NamedLock`] for as long as it is
//! open, so an [`AtomicWriter`](super::AtomicWriter) commit cannot swap the file
//! (or leave it briefly missing during the Windows backup fallback) mid-read.

use crate::error::Result;
use crate::io::atomic_write::recover_backup;
use crate::io::named_lock::{DEFAULT_LOCK_TIMEOUT, NamedLock, NamedLockGuard};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Open file plus the lock that keeps writers out
#[derive(Debug)]
pub struct AtomicReader {
    path: PathBuf,
    file: File,
    // Declared after `file` so the file is closed before the lock is released.
    _guard: NamedLockGuard,
}

impl AtomicReader {
    /// Open `path` for reading, waiting up to [`DEFAULT_LOCK_TIMEOUT`] for writers
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_timeout(path, DEFAULT_LOCK_TIMEOUT)
    }

    /// Open `path` for reading, waiting at most `timeout` for writers
    ///
    /// A backup left by an interrupted commit is restored first, so the caller sees
    /// the last complete version.
    pub fn open_with_timeout(path: impl AsRef<Path>, timeout: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let guard = NamedLock::for_path(&path)?.acquire_timeout(timeout)?;
        recover_backup(&path)?;
        let file = File::open(&path)?;
        debug!(path = %path.display(), "Atomic read opened");
        Ok(Self {
            path,
            file,
            _guard: guard,
        })
    }

    /// Path being read
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Length of the file in bytes
    pub fn len(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Whether the file is empty
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl Read for AtomicReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

/// Read the whole of `path` under its lock
pub fn atomic_read(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let mut reader = AtomicReader::open(path)?;
    let mut bytes = Vec::with_capacity(usize::try_from(reader.len()?).unwrap_or(0));
    reader.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Read the whole of `path` as UTF-8 under its lock
pub fn atomic_read_to_string(path: impl AsRef<Path>) -> Result<String> {
    let mut reader = AtomicReader::open(path)?;
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    Ok(text)
}

/// Like [`atomic_read`], but a missing file is `Ok(None)`
pub fn atomic_read_optional(path: impl AsRef<Path>) -> Result<Option<Vec<u8>>> {
    match atomic_read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(crate::CommonError::IoError(e)) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
