//! Discovery and creation of the `.beanconf/` directory.
//!
//! The `.beanconf/` directory holds a project's configuration, its schema
//! definition files and, by default, the bean database.

use std::path::{Path, PathBuf};

use crate::config::ConfigError;

/// The name of the beanconf metadata directory.
pub const BEANCONF_DIR_NAME: &str = ".beanconf";

/// The environment variable that overrides directory discovery.
pub const BEANCONF_DIR_ENV: &str = "BEANCONF_DIR";

/// Walk up the directory tree from `start` looking for `.beanconf/`.
///
/// The `BEANCONF_DIR` environment variable is checked first and wins when
/// it names an existing directory.
///
/// # Examples
///
/// ```no_run
/// use beanconf_config::beanconf_dir::find_beanconf_dir;
/// use std::path::Path;
///
/// if let Some(dir) = find_beanconf_dir(Path::new(".")) {
///     println!("Found beanconf dir at {}", dir.display());
/// }
/// ```
pub fn find_beanconf_dir(start: &Path) -> Option<PathBuf> {
    if let Ok(env_dir) = std::env::var(BEANCONF_DIR_ENV) {
        let env_path = PathBuf::from(&env_dir);
        if env_path.is_dir() {
            return Some(env_path);
        }
    }

    let start = start.canonicalize().ok()?;
    start
        .ancestors()
        .map(|dir| dir.join(BEANCONF_DIR_NAME))
        .find(|candidate| candidate.is_dir())
}

/// Like [`find_beanconf_dir`], but fails with
/// [`ConfigError::BeanconfDirNotFound`].
pub fn find_beanconf_dir_or_error(start: &Path) -> Result<PathBuf, ConfigError> {
    find_beanconf_dir(start).ok_or(ConfigError::BeanconfDirNotFound)
}

/// Ensure a `.beanconf/` directory exists at `path`.
///
/// If `path` itself is not called `.beanconf`, a `.beanconf/` subdirectory
/// is created under it. Returns the path to the directory.
pub fn ensure_beanconf_dir(path: &Path) -> Result<PathBuf, ConfigError> {
    let dir = if path.ends_with(BEANCONF_DIR_NAME) {
        path.to_path_buf()
    } else {
        path.join(BEANCONF_DIR_NAME)
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
