//! Per-user directory resolution
//!
//! [`Locations`] answers "where does this application keep its configuration,
//! data, cache, state and logs" following the platform convention:
//!
//! | Kind   | XDG (default)                 | Windows                        |
//! |--------|-------------------------------|--------------------------------|
//! | Config | `~/.config/<app>`             | `%APPDATA%\<app>`              |
//! | Data   | `~/.local/share/<app>`        | `%APPDATA%\<app>`              |
//! | Cache  | `~/.cache/<app>`              | `%LOCALAPPDATA%\<app>\Cache`   |
//! | State  | `~/.local/state/<app>`        | `%LOCALAPPDATA%\<app>`         |
//! | Log    | `~/.local/state/<app>/log`    | `%LOCALAPPDATA%\<app>\Logs`    |
//!
//! On XDG platforms the `XDG_*_HOME` variables override the defaults when they hold
//! absolute paths, and `XDG_CONFIG_DIRS` / `XDG_DATA_DIRS` add system-wide search
//! paths for read-only lookups.
//!
//! # Example
//!
//! ```no_run
//! use common_utils::locations::{LocationKind, Locations};
//!
//! let locations = Locations::new("MyTool")?;
//! let settings = locations.config_file("settings.json");
//! locations.ensure_dir(LocationKind::Config)?;
//! # Ok::<(), common_utils::CommonError>(())
//! ```

mod platform;

pub use platform::Platform;

use crate::error::{CommonError, Result};
use platform::BaseDirs;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Category of per-user directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LocationKind {
    /// User-editable settings
    Config,
    /// Data the application owns and the user expects to keep
    Data,
    /// Disposable data that can be rebuilt
    Cache,
    /// Data that survives restarts but is not worth backing up (history, layout)
    State,
    /// Log files
    Log,
}

impl LocationKind {
    /// Every kind, in declaration order
    pub const ALL: [Self; 5] = [Self::Config, Self::Data, Self::Cache, Self::State, Self::Log];

    /// Lowercase name used in messages
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Data => "data",
            Self::Cache => "cache",
            Self::State => "state",
            Self::Log => "log",
        }
    }
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved per-user directories of one application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locations {
    app_name: String,
    platform: Platform,
    config_dir: PathBuf,
    data_dir: PathBuf,
    cache_dir: PathBuf,
    state_dir: PathBuf,
    log_dir: PathBuf,
    runtime_dir: Option<PathBuf>,
    config_system_dirs: Vec<PathBuf>,
    data_system_dirs: Vec<PathBuf>,
}

impl Locations {
    /// Resolve directories for `app_name` from the process environment
    ///
    /// Base variables that are unset or empty fall back to what the OS reports:
    /// the passwd entry for `HOME`, the known-folder API for `APPDATA` and
    /// `LOCALAPPDATA`.
    pub fn new(app_name: impl Into<String>) -> Result<Self> {
        Self::resolve(app_name, Platform::current(), |key| {
            std::env::var_os(key)
                .filter(|value| !value.is_empty())
                .or_else(|| os_base_dir(key))
        })
    }

    /// Resolve directories for `app_name` with an explicit platform and environment
    ///
    /// `env` is consulted for `HOME`, `XDG_*`, `APPDATA`, `LOCALAPPDATA` and
    /// `USERPROFILE`; nothing else is read from the process.
    pub fn resolve<F>(app_name: impl Into<String>, platform: Platform, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let app_name = app_name.into();
        validate_app_name(&app_name)?;
        let base = BaseDirs::resolve(platform, &env)?;

        let under_app = |(dir, suffix): (PathBuf, Option<&str>)| {
            let dir = dir.join(&app_name);
            match suffix {
                Some(suffix) => dir.join(suffix),
                None => dir,
            }
        };
        let app_dirs = |dirs: Vec<PathBuf>| -> Vec<PathBuf> {
            dirs.into_iter().map(|dir| dir.join(&app_name)).collect()
        };

        let locations = Self {
            config_dir: base.config.join(&app_name),
            data_dir: base.data.join(&app_name),
            cache_dir: under_app(base.cache),
            state_dir: base.state.join(&app_name),
            log_dir: under_app(base.log),
            runtime_dir: base.runtime.map(|dir| dir.join(&app_name)),
            config_system_dirs: app_dirs(base.config_dirs),
            data_system_dirs: app_dirs(base.data_dirs),
            platform,
            app_name,
        };
        debug!(
            app = %locations.app_name,
            config = %locations.config_dir.display(),
            data = %locations.data_dir.display(),
            "Resolved application locations"
        );
        Ok(locations)
    }

    /// Application name the directories were resolved for
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Convention the directories follow
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Directory for `kind`
    pub fn dir(&self, kind: LocationKind) -> &Path {
        match kind {
            LocationKind::Config => &self.config_dir,
            LocationKind::Data => &self.data_dir,
            LocationKind::Cache => &self.cache_dir,
            LocationKind::State => &self.state_dir,
            LocationKind::Log => &self.log_dir,
        }
    }

    /// Configuration directory
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Data directory
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Cache directory
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// State directory
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Log directory
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Per-session runtime directory (`$XDG_RUNTIME_DIR/<app>`), if the platform has one
    pub fn runtime_dir(&self) -> Option<&Path> {
        self.runtime_dir.as_deref()
    }

    /// Path of `file_name` inside the directory for `kind`
    pub fn file(&self, kind: LocationKind, file_name: impl AsRef<Path>) -> PathBuf {
        self.dir(kind).join(file_name)
    }

    /// Path of `file_name` inside the configuration directory
    pub fn config_file(&self, file_name: impl AsRef<Path>) -> PathBuf {
        self.file(LocationKind::Config, file_name)
    }

    /// Path of `file_name` inside the data directory
    pub fn data_file(&self, file_name: impl AsRef<Path>) -> PathBuf {
        self.file(LocationKind::Data, file_name)
    }

    /// Create the directory for `kind` (and its parents) if missing
    ///
    /// On Unix newly created directories are private to the user (mode 0700).
    pub fn ensure_dir(&self, kind: LocationKind) -> Result<PathBuf> {
        let dir = self.dir(kind);
        if !dir.is_dir() {
            create_private_dir(dir)?;
            debug!(kind = %kind, path = %dir.display(), "Created application directory");
        }
        Ok(dir.to_path_buf())
    }

    /// Configuration directories in lookup order: the user's first, then system-wide
    pub fn config_search_paths(&self) -> Vec<PathBuf> {
        std::iter::once(self.config_dir.clone())
            .chain(self.config_system_dirs.iter().cloned())
            .collect()
    }

    /// Data directories in lookup order: the user's first, then system-wide
    pub fn data_search_paths(&self) -> Vec<PathBuf> {
        std::iter::once(self.data_dir.clone())
            .chain(self.data_system_dirs.iter().cloned())
            .collect()
    }

    /// First existing `file_name` along [`config_search_paths`](Self::config_search_paths)
    pub fn find_config_file(&self, file_name: impl AsRef<Path>) -> Option<PathBuf> {
        find_in(&self.config_search_paths(), file_name.as_ref())
    }

    /// First existing `file_name` along [`data_search_paths`](Self::data_search_paths)
    pub fn find_data_file(&self, file_name: impl AsRef<Path>) -> Option<PathBuf> {
        find_in(&self.data_search_paths(), file_name.as_ref())
    }
}

fn find_in(dirs: &[PathBuf], file_name: &Path) -> Option<PathBuf> {
    dirs.iter()
        .map(|dir| dir.join(file_name))
        .find(|candidate| candidate.is_file())
}

/// Reject names that would escape or collapse the per-app directory
fn validate_app_name(name: &str) -> Result<()> {
    let invalid = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(CommonError::InvalidAppName(name.to_string()));
    }
    Ok(())
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(dir)
}

/// Directory the OS reports for a base variable missing from the environment
fn os_base_dir(key: &str) -> Option<OsString> {
    let dir = match key {
        "HOME" | "USERPROFILE" => dirs::home_dir(),
        // On Windows these are FOLDERID_RoamingAppData and FOLDERID_LocalAppData
        "APPDATA" if cfg!(windows) => dirs::config_dir(),
        "LOCALAPPDATA" if cfg!(windows) => dirs::data_local_dir(),
        _ => None,
    }?;
    debug!(var = key, path = %dir.display(), "Using OS-reported base directory");
    Some(dir.into_os_string())
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{EnvGuard, create_test_dir};
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &Path)]) -> impl Fn(&str) -> Option<OsString> + use<> {
        let map: HashMap<String, OsString> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.as_os_str().to_os_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_xdg_layout() {
        let home = Path::new("/home/ada");
        let locations =
            Locations::resolve("mytool", Platform::Xdg, env_of(&[("HOME", home)])).unwrap();

        assert_eq!(locations.app_name(), "mytool");
        assert_eq!(locations.platform(), Platform::Xdg);
        assert_eq!(locations.config_dir(), home.join(".config").join("mytool"));
        assert_eq!(locations.data_dir(), home.join(".local").join("share").join("mytool"));
        assert_eq!(locations.cache_dir(), home.join(".cache").join("mytool"));
        assert_eq!(locations.state_dir(), home.join(".local").join("state").join("mytool"));
        assert_eq!(
            locations.log_dir(),
            home.join(".local").join("state").join("mytool").join("log")
        );
        assert_eq!(locations.runtime_dir(), None);
    }

    #[test]
    fn test_windows_layout() {
        let roaming = Path::new("/profile/Roaming");
        let local = Path::new("/profile/Local");
        let env = env_of(&[("APPDATA", roaming), ("LOCALAPPDATA", local)]);
        let locations = Locations::resolve("MyTool", Platform::Windows, env).unwrap();

        assert_eq!(locations.config_dir(), roaming.join("MyTool"));
        assert_eq!(locations.data_dir(), roaming.join("MyTool"));
        assert_eq!(locations.state_dir(), local.join("MyTool"));
        assert_eq!(locations.cache_dir(), local.join("MyTool").join("Cache"));
        assert_eq!(locations.log_dir(), local.join("MyTool").join("Logs"));
        assert_eq!(locations.config_search_paths(), vec![roaming.join("MyTool")]);
    }

    #[test]
    fn test_dir_matches_named_accessors() {
        let env = env_of(&[("HOME", Path::new("/home/ada"))]);
        let locations = Locations::resolve("app", Platform::Xdg, env).unwrap();
        for kind in LocationKind::ALL {
            let direct = match kind {
                LocationKind::Config => locations.config_dir(),
                LocationKind::Data => locations.data_dir(),
                LocationKind::Cache => locations.cache_dir(),
                LocationKind::State => locations.state_dir(),
                LocationKind::Log => locations.log_dir(),
            };
            assert_eq!(locations.dir(kind), direct, "{kind}");
        }
        assert_eq!(
            locations.config_file("settings.toml"),
            locations.config_dir().join("settings.toml")
        );
        assert_eq!(
            locations.data_file("db.sqlite"),
            locations.data_dir().join("db.sqlite")
        );
    }

    #[test]
    fn test_invalid_app_names_are_rejected() {
        let env = || env_of(&[("HOME", Path::new("/home/ada"))]);
        for name in ["", "  ", ".", "..", "a/b", "a\\b", "nul\0byte"] {
            let result = Locations::resolve(name, Platform::Xdg, env());
            assert!(
                matches!(result, Err(CommonError::InvalidAppName(ref n)) if n == name),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_search_paths_put_user_dir_first() {
        let env = env_of(&[
            ("HOME", Path::new("/home/ada")),
            ("XDG_CONFIG_DIRS", Path::new("/etc/xdg:/opt/xdg")),
        ]);
        let locations = Locations::resolve("app", Platform::Xdg, env).unwrap();
        assert_eq!(
            locations.config_search_paths(),
            vec![
                PathBuf::from("/home/ada/.config/app"),
                PathBuf::from("/etc/xdg/app"),
                PathBuf::from("/opt/xdg/app"),
            ]
        );
    }

    // XDG search lists are colon separated, which clashes with Windows drive letters.
    #[cfg(unix)]
    #[test]
    fn test_find_config_file_prefers_user_copy() {
        let root = create_test_dir();
        let home = root.path().join("home");
        let system = root.path().join("etc");
        let env = env_of(&[("HOME", home.as_path()), ("XDG_CONFIG_DIRS", system.as_path())]);
        let locations = Locations::resolve("app", Platform::Xdg, env).unwrap();

        let system_copy = system.join("app").join("defaults.toml");
        std::fs::create_dir_all(system_copy.parent().unwrap()).unwrap();
        std::fs::write(&system_copy, "system").unwrap();
        assert_eq!(locations.find_config_file("defaults.toml"), Some(system_copy));

        let user_copy = locations.config_file("defaults.toml");
        locations.ensure_dir(LocationKind::Config).unwrap();
        std::fs::write(&user_copy, "user").unwrap();
        assert_eq!(locations.find_config_file("defaults.toml"), Some(user_copy));

        assert_eq!(locations.find_data_file("defaults.toml"), None);
    }

    #[test]
    fn test_ensure_dir_creates_nested_directory() {
        let root = create_test_dir();
        let env = env_of(&[("HOME", root.path())]);
        let locations = Locations::resolve("app", Platform::Xdg, env).unwrap();

        let log_dir = locations.ensure_dir(LocationKind::Log).unwrap();
        assert!(log_dir.is_dir());
        assert_eq!(log_dir, locations.log_dir());
        // Second call is a no-op
        assert_eq!(locations.ensure_dir(LocationKind::Log).unwrap(), log_dir);
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_dir_is_private_on_unix() {
        use std::os::unix::fs::PermissionsExt;

        let root = create_test_dir();
        let env = env_of(&[("HOME", root.path())]);
        let locations = Locations::resolve("app", Platform::Xdg, env).unwrap();

        let dir = locations.ensure_dir(LocationKind::Data).unwrap();
        let mode = std::fs::metadata(&dir).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o700);
    }

    #[test]
    fn test_new_reads_process_environment() {
        let root = create_test_dir();
        let _env = EnvGuard::set(&[
            ("HOME", root.path().as_os_str()),
            ("USERPROFILE", root.path().as_os_str()),
            ("APPDATA", root.path().join("Roaming").as_os_str()),
            ("LOCALAPPDATA", root.path().join("Local").as_os_str()),
            ("XDG_CONFIG_HOME", root.path().join("cfg").as_os_str()),
        ]);

        let locations = Locations::new("envtest").unwrap();
        if cfg!(windows) {
            assert_eq!(locations.config_dir(), root.path().join("Roaming").join("envtest"));
        } else {
            assert_eq!(locations.config_dir(), root.path().join("cfg").join("envtest"));
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_new_falls_back_to_passwd_home() {
        let _env = EnvGuard::set(&[
            ("HOME", std::ffi::OsStr::new("")),
            ("XDG_CONFIG_HOME", std::ffi::OsStr::new("")),
        ]);

        let locations = Locations::new("fallbacktest").unwrap();
        let home = dirs::home_dir().unwrap();
        assert_eq!(
            locations.config_dir(),
            home.join(".config").join("fallbacktest")
        );
    }

    #[test]
    fn test_os_base_dir_ignores_unrelated_keys() {
        assert_eq!(os_base_dir("XDG_CONFIG_HOME"), None);
        assert_eq!(os_base_dir("PATH"), None);
        if !cfg!(windows) {
            assert_eq!(os_base_dir("APPDATA"), None);
        }
    }

    #[test]
    fn test_location_kind_display() {
        let names: Vec<String> = LocationKind::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(names, ["config", "data", "cache", "state", "log"]);
    }
}
