//! Crash-safe file replacement
//!
//! [`AtomicWriter`] writes into a temporary file next to the destination and only
//! renames it over the destination on [`AtomicWriter::commit`]. Until then the
//! destination keeps its previous contents, and a writer that is dropped or aborted
//! leaves nothing behind.
//!
//! The rename runs under the destination's [`NamedLock`], the same lock
//! [`AtomicReader`](super::AtomicReader) holds while reading. On Windows a rename
//! over an existing file can fail; the fallback moves the old file to `<path>.bak`
//! first and restores it if the second attempt fails too.
//!
//! # Example
//!
//! ```no_run
//! use common_utils::io::AtomicWriter;
//! use std::io::Write;
//!
//! let mut writer = AtomicWriter::create("settings.json")?;
//! writer.write_all(b"{\"theme\":\"dark\"}")?;
//! writer.commit()?;
//! # Ok::<(), common_utils::CommonError>(())
//! ```

use crate::error::{CommonError, Result};
use crate::io::named_lock::{DEFAULT_LOCK_TIMEOUT, NamedLock};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Extension of the backup kept while an existing destination is being replaced
const BACKUP_EXTENSION: &str = "bak";

/// Whether the temp file is flushed to disk before the rename
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSyncPolicy {
    /// `sync_all` the temp file before renaming it
    SyncAll,
    /// Leave flushing to the OS
    SkipSync,
}

/// Whether the parent directory is flushed after the rename
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentDirSyncPolicy {
    /// `sync_all` the directory; failures are logged, not returned
    SyncBestEffort,
    /// Leave flushing to the OS
    SkipSync,
}

/// Tunables for [`AtomicWriter`]
#[derive(Debug, Clone, Copy)]
pub struct AtomicWriteOptions {
    /// File sync policy for the temp file before persisting
    pub file_sync: FileSyncPolicy,
    /// Parent directory sync policy after the file has been persisted
    pub parent_dir_sync: ParentDirSyncPolicy,
    /// Create missing parent directories of the destination
    pub create_parent_dirs: bool,
    /// Copy the permissions of an existing destination onto the replacement
    ///
    /// Only an existing destination has permissions to copy. A file created by
    /// the first commit, or any file when this is `false`, keeps the temp file's
    /// owner-only mode (`0600` on Unix) rather than the umask default `fs::write`
    /// would give it. Call `fs::set_permissions` after the first commit to widen it.
    pub preserve_permissions: bool,
    /// How long `commit` waits for readers holding the destination's lock
    pub lock_timeout: Duration,
}

impl Default for AtomicWriteOptions {
    fn default() -> Self {
        Self {
            file_sync: FileSyncPolicy::SyncAll,
            parent_dir_sync: ParentDirSyncPolicy::SkipSync,
            create_parent_dirs: true,
            preserve_permissions: true,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

/// Pending replacement of a file
///
/// Implements [`Write`]; everything written lands in the temp file until
/// [`commit`](Self::commit).
#[derive(Debug)]
pub struct AtomicWriter {
    target: PathBuf,
    temp: Option<NamedTempFile>,
    options: AtomicWriteOptions,
}

impl AtomicWriter {
    /// Start replacing `path` with default options
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_options(path, AtomicWriteOptions::default())
    }

    /// Start replacing `path`
    ///
    /// The temp file is named `.<file name>.<random>.tmp` and lives in the same
    /// directory as `path`, so the final rename never crosses file systems.
    pub fn with_options(path: impl AsRef<Path>, options: AtomicWriteOptions) -> Result<Self> {
        let target = path.as_ref().to_path_buf();
        let parent = parent_dir(&target);
        if options.create_parent_dirs {
            fs::create_dir_all(parent)?;
        }

        let file_name = target.file_name().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} does not name a file", target.display()),
            )
        })?;
        let prefix = format!(".{}.", file_name.to_string_lossy());

        let temp = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".tmp")
            .tempfile_in(parent)?;
        debug!(target = %target.display(), temp = %temp.path().display(), "Atomic write started");

        Ok(Self {
            target,
            temp: Some(temp),
            options,
        })
    }

    /// Destination that `commit` replaces
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Current location of the temp file
    pub fn temp_path(&self) -> &Path {
        self.temp
            .as_ref()
            .map_or_else(|| self.target.as_path(), NamedTempFile::path)
    }

    /// Replace the destination with everything written so far
    ///
    /// On error the destination still holds its previous contents and the temp
    /// file is removed.
    pub fn commit(mut self) -> Result<()> {
        let Some(mut temp) = self.temp.take() else {
            return Ok(());
        };

        temp.flush()?;
        if self.options.preserve_permissions {
            copy_permissions(&self.target, temp.path());
        }
        if self.options.file_sync == FileSyncPolicy::SyncAll {
            temp.as_file().sync_all()?;
        }

        let lock = NamedLock::for_path(&self.target)?;
        let _guard = lock.acquire_timeout(self.options.lock_timeout)?;
        persist(temp, &self.target)?;

        if self.options.parent_dir_sync == ParentDirSyncPolicy::SyncBestEffort {
            best_effort_sync_parent_dir(parent_dir(&self.target));
        }

        info!(target = %self.target.display(), "Atomic write committed");
        Ok(())
    }

    /// Discard everything written and delete the temp file
    pub fn abort(mut self) -> Result<()> {
        if let Some(temp) = self.temp.take() {
            temp.close()?;
            debug!(target = %self.target.display(), "Atomic write aborted");
        }
        Ok(())
    }

    fn temp_mut(&mut self) -> io::Result<&mut NamedTempFile> {
        self.temp
            .as_mut()
            .ok_or_else(|| io::Error::other("atomic writer already finished"))
    }
}

impl Write for AtomicWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.temp_mut()?.write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.temp_mut()?.write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.temp_mut()?.flush()
    }
}

impl Drop for AtomicWriter {
    fn drop(&mut self) {
        // NamedTempFile deletes itself; only note that the write was abandoned.
        if self.temp.is_some() {
            debug!(target = %self.target.display(), "Discarding uncommitted atomic write");
        }
    }
}

/// Replace `path` with `bytes` using default options
pub fn atomic_write(path: impl AsRef<Path>, bytes: &[u8]) -> Result<()> {
    atomic_write_with_options(path, bytes, AtomicWriteOptions::default())
}

/// Replace `path` with `bytes`
pub fn atomic_write_with_options(
    path: impl AsRef<Path>,
    bytes: &[u8],
    options: AtomicWriteOptions,
) -> Result<()> {
    atomic_write_with(path, options, |writer| {
        writer.write_all(bytes)?;
        Ok(())
    })
}

/// Replace `path` with whatever `write` produces
///
/// The destination is only replaced if `write` returns `Ok`; otherwise the error
/// is passed through and the destination is untouched. This is the hook for
/// streaming serializers:
///
/// ```no_run
/// use common_utils::io::{AtomicWriteOptions, atomic_write_with};
/// use std::io::Write;
///
/// atomic_write_with("notes.txt", AtomicWriteOptions::default(), |w| {
///     for line in ["first", "second"] {
///         writeln!(w, "{line}")?;
///     }
///     Ok(())
/// })?;
/// # Ok::<(), common_utils::CommonError>(())
/// ```
pub fn atomic_write_with<F>(
    path: impl AsRef<Path>,
    options: AtomicWriteOptions,
    write: F,
) -> Result<()>
where
    F: FnOnce(&mut AtomicWriter) -> Result<()>,
{
    let mut writer = AtomicWriter::with_options(path, options)?;
    match write(&mut writer) {
        Ok(()) => writer.commit(),
        Err(e) => {
            if let Err(abort_err) = writer.abort() {
                warn!("Failed to remove temp file after aborted write: {abort_err}");
            }
            Err(e)
        }
    }
}

/// Restore `<path>.bak` left behind by a replacement interrupted mid-way
///
/// Returns `true` if a backup was moved back into place. Does nothing when `path`
/// exists, because then the backup is only stale.
pub fn recover_backup(path: impl AsRef<Path>) -> Result<bool> {
    let path = path.as_ref();
    let backup = backup_path(path);
    if path.exists() || !backup.exists() {
        return Ok(false);
    }

    fs::rename(&backup, path)?;
    warn!(path = %path.display(), "Recovered backup from interrupted atomic write");
    Ok(true)
}

/// `<path>.bak`, appended rather than replacing an existing extension
pub(crate) fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(BACKUP_EXTENSION);
    PathBuf::from(name)
}

/// Directory that holds `path`, `.` for bare file names
fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Rename the temp file over `target`, with the backup-and-restore fallback
fn persist(temp: NamedTempFile, target: &Path) -> Result<()> {
    let err = match temp.persist(target) {
        Ok(_) => return Ok(()),
        Err(err) => err,
    };

    if !needs_backup_fallback(&err.error, target) {
        return Err(commit_failed(target, err.error));
    }

    let temp = err.file;
    replace_via_backup(target, || temp.persist(target).map(drop).map_err(|e| e.error))
}

/// Whether a failed rename is the Windows "destination exists" case
///
/// Anything else (a directory in the way, a missing parent, a read-only volume)
/// is reported as is; moving the destination aside would only make it worse.
fn needs_backup_fallback(error: &io::Error, target: &Path) -> bool {
    cfg!(windows)
        && matches!(
            error.kind(),
            io::ErrorKind::PermissionDenied | io::ErrorKind::AlreadyExists
        )
        && target.is_file()
}

/// Move `target` to `<target>.bak`, run `rename`, and put the backup back if it fails
fn replace_via_backup<F>(target: &Path, rename: F) -> Result<()>
where
    F: FnOnce() -> io::Result<()>,
{
    let backup = backup_path(target);
    // A leftover backup from an older crash is stale once `target` exists
    let _ = fs::remove_file(&backup);
    fs::rename(target, &backup).map_err(|e| commit_failed(target, e))?;

    // Backup window: until the rename lands, `target` is missing and only
    // `recover_backup` (run by every reader) can bring it back after a crash.
    if let Err(retry) = rename() {
        if let Err(restore) = fs::rename(&backup, target) {
            warn!(
                path = %target.display(),
                "Failed to restore backup after failed commit: {restore}"
            );
        }
        return Err(commit_failed(target, retry));
    }

    if let Err(e) = fs::remove_file(&backup) {
        warn!(path = %backup.display(), "Failed to remove backup after atomic write: {e}");
    }
    Ok(())
}

fn commit_failed(path: &Path, source: io::Error) -> CommonError {
    CommonError::CommitFailed {
        path: path.to_path_buf(),
        source,
    }
}

/// Give the temp file the destination's permissions; the temp file is created
/// owner-only, which would otherwise narrow access on every save
fn copy_permissions(from: &Path, to: &Path) {
    match fs::metadata(from) {
        Ok(metadata) => {
            if let Err(e) = fs::set_permissions(to, metadata.permissions()) {
                debug!(path = %from.display(), "Could not copy permissions to temp file: {e}");
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => debug!(path = %from.display(), "Could not read permissions: {e}"),
    }
}

fn best_effort_sync_parent_dir(parent: &Path) {
    #[cfg(unix)]
    {
        if let Err(e) = File::open(parent).and_then(|d| d.sync_all()) {
            debug!(path = %parent.display(), "Parent directory sync_all failed (best-effort): {e}");
        }
    }

    #[cfg(windows)]
    {
        use std::os::windows::fs::OpenOptionsExt;

        // From winbase.h. Required to open a directory handle on Windows.
        const FILE_FLAG_BACKUP_SEMANTICS: u32 = 0x0200_0000;

        let result = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(FILE_FLAG_BACKUP_SEMANTICS)
            .open(parent)
            .and_then(|d: File| d.sync_all());
        if let Err(e) = result {
            debug!(path = %parent.display(), "Parent directory sync_all failed (best-effort): {e}");
        }
    }
}
