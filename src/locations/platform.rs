//! Platform conventions for per-user base directories
//!
//! Each platform turns an environment lookup into a set of base directories that
//! do not yet include the application name. [`Locations`](super::Locations) joins
//! the application name on top.

use crate::error::{CommonError, Result};
use crate::locations::LocationKind;
use std::ffi::OsString;
use std::path::PathBuf;

/// Directory layout convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Platform {
    /// freedesktop.org XDG base directory layout (Linux, BSD, macOS)
    Xdg,
    /// Windows known folders (`%APPDATA%`, `%LOCALAPPDATA%`)
    Windows,
}

impl Platform {
    /// Convention of the platform this binary was built for
    pub const fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Xdg
        }
    }
}

/// Base directories before the application name is appended
///
/// `cache` and `log` carry the platform's sub-directory (if any) as a suffix that
/// goes after the application name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BaseDirs {
    pub config: PathBuf,
    pub data: PathBuf,
    pub cache: (PathBuf, Option<&'static str>),
    pub state: PathBuf,
    pub log: (PathBuf, Option<&'static str>),
    pub runtime: Option<PathBuf>,
    pub config_dirs: Vec<PathBuf>,
    pub data_dirs: Vec<PathBuf>,
}

/// Default for `$XDG_CONFIG_DIRS`
const XDG_DEFAULT_CONFIG_DIRS: &str = "/etc/xdg";
/// Default for `$XDG_DATA_DIRS`
const XDG_DEFAULT_DATA_DIRS: &str = "/usr/local/share:/usr/share";

impl BaseDirs {
    pub(crate) fn resolve<F>(platform: Platform, env: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        match platform {
            Platform::Xdg => Self::xdg(env),
            Platform::Windows => Self::windows(env),
        }
    }

    fn xdg<F>(env: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        // Only needed when some XDG_*_HOME is unset, so resolve lazily per kind.
        let home = || non_empty(env, "HOME").ok_or("HOME is not set");
        let home_dir = |var: &str, fallback: &[&str], kind: LocationKind| -> Result<PathBuf> {
            // An absolute XDG_*_HOME wins over the HOME-relative default
            if let Some(dir) = xdg_absolute(env, var) {
                return Ok(dir);
            }
            let mut dir = home().map_err(|reason| CommonError::LocationUnavailable {
                kind,
                reason: format!("{var} is unusable and {reason}"),
            })?;
            dir.extend(fallback);
            Ok(dir)
        };

        let state = home_dir("XDG_STATE_HOME", &[".local", "state"], LocationKind::State)?;
        Ok(Self {
            config: home_dir("XDG_CONFIG_HOME", &[".config"], LocationKind::Config)?,
            data: home_dir("XDG_DATA_HOME", &[".local", "share"], LocationKind::Data)?,
            cache: (home_dir("XDG_CACHE_HOME", &[".cache"], LocationKind::Cache)?, None),
            log: (state.clone(), Some("log")),
            state,
            runtime: xdg_absolute(env, "XDG_RUNTIME_DIR"),
            config_dirs: xdg_search_list(env, "XDG_CONFIG_DIRS", XDG_DEFAULT_CONFIG_DIRS),
            data_dirs: xdg_search_list(env, "XDG_DATA_DIRS", XDG_DEFAULT_DATA_DIRS),
        })
    }

    fn windows<F>(env: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let profile_subdir = |subdir: &str| {
            non_empty(env, "USERPROFILE").map(|mut profile| {
                profile.extend(["AppData", subdir]);
                profile
            })
        };

        let roaming = non_empty(env, "APPDATA")
            .or_else(|| profile_subdir("Roaming"))
            .ok_or_else(|| CommonError::LocationUnavailable {
                kind: LocationKind::Config,
                reason: "neither APPDATA nor USERPROFILE is set".to_string(),
            })?;
        let local = non_empty(env, "LOCALAPPDATA")
            .or_else(|| profile_subdir("Local"))
            .ok_or_else(|| CommonError::LocationUnavailable {
                kind: LocationKind::Cache,
                reason: "neither LOCALAPPDATA nor USERPROFILE is set".to_string(),
            })?;

        Ok(Self {
            config: roaming.clone(),
            data: roaming,
            cache: (local.clone(), Some("Cache")),
            log: (local.clone(), Some("Logs")),
            state: local,
            runtime: None,
            config_dirs: Vec::new(),
            data_dirs: Vec::new(),
        })
    }
}

/// Environment value, treating empty as unset
fn non_empty<F>(env: &F, key: &str) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<OsString>,
{
    env(key).filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// XDG variable that holds an absolute path; relative values must be ignored
fn xdg_absolute<F>(env: &F, key: &str) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<OsString>,
{
    non_empty(env, key).filter(|p| p.has_root())
}

/// Colon separated XDG search list with relative entries dropped
///
/// Entries are split without a UTF-8 round trip, so non-UTF-8 paths survive.
fn xdg_search_list<F>(env: &F, key: &str, default: &str) -> Vec<PathBuf>
where
    F: Fn(&str) -> Option<OsString>,
{
    // An empty variable means "use the default", same as an unset one
    let value = env(key)
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| OsString::from(default));

    std::env::split_paths(&value)
        .filter(|p| p.has_root())
        .collect()
}
