//! Atomic file I/O
//!
//! Writers replace files through a temp file and a rename; readers hold the same
//! per-path named lock the rename is done under. Together they guarantee a reader
//! sees either the old or the new contents of a file, never a mixture.

pub mod atomic_read;
pub mod atomic_write;
pub mod named_lock;

pub use atomic_read::{AtomicReader, atomic_read, atomic_read_optional, atomic_read_to_string};
pub use atomic_write::{
    AtomicWriteOptions, AtomicWriter, FileSyncPolicy, ParentDirSyncPolicy, atomic_write,
    atomic_write_with, atomic_write_with_options, recover_backup,
};
pub use named_lock::{DEFAULT_LOCK_TIMEOUT, NamedLock, NamedLockGuard};
