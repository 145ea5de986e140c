//! `common-utils` - Building blocks for desktop and command-line tools
//!
//! - [`io`]: atomic file replacement and lock-protected reads, built on cross-process
//!   [`NamedLock`](io::NamedLock)s
//! - [`locations`]: per-user config, data, cache, state and log directories (XDG or
//!   Windows known folders)
//! - [`collections`]: [`MultiMap`](collections::MultiMap),
//!   [`NamedCollection`](collections::NamedCollection) and
//!   [`LanguageSet`](collections::LanguageSet)
//! - [`logging`]: file logging with per-session rotation
//!
//! # Example
//!
//! ```no_run
//! use common_utils::io::{atomic_read_to_string, atomic_write};
//! use common_utils::locations::Locations;
//!
//! let locations = Locations::new("MyTool")?;
//! let path = locations.config_file("settings.toml");
//! atomic_write(&path, b"theme = \"dark\"\n")?;
//! assert_eq!(atomic_read_to_string(&path)?, "theme = \"dark\"\n");
//! # Ok::<(), common_utils::CommonError>(())
//! ```

pub mod collections;
pub mod error;
pub mod io;
pub mod locations;
pub mod logging;

#[cfg(test)]
mod test_utils;

pub use error::{CommonError, Result};
