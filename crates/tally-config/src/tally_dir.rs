//! Discovery of the `.tally/` directory.

use std::path::{Path, PathBuf};

/// The name of the tally metadata directory.
const TALLY_DIR_NAME: &str = ".tally";

/// Environment variable that overrides discovery.
const TALLY_DIR_ENV: &str = "TALLY_DIR";

/// The configuration file inside the `.tally/` directory.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Walk up from `start` looking for a `.tally/` directory.
///
/// `TALLY_DIR` wins when it names an existing directory. Returns `None` if
/// the filesystem root is reached without finding one.
pub fn find_tally_dir(start: &Path) -> Option<PathBuf> {
    if let Ok(env_dir) = std::env::var(TALLY_DIR_ENV) {
        let env_path = PathBuf::from(env_dir);
        if env_path.is_dir() {
            return Some(env_path);
        }
    }

    let start = start.canonicalize().ok()?;
    start
        .ancestors()
        .map(|dir| dir.join(TALLY_DIR_NAME))
        .find(|candidate| candidate.is_dir())
}

/// Locates the configuration file to load, if any.
///
/// An explicit path is returned as-is; otherwise the discovered
/// `.tally/config.yaml` is used when it exists.
pub fn config_file(explicit: Option<&Path>, start: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let candidate = find_tally_dir(start)?.join(CONFIG_FILE_NAME);
    candidate.is_file().then_some(candidate)
}
