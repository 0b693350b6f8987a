//! Config path resolution helpers.

use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "dropship.toml";

/// Default global config directory (`~/.config/dropship` on Linux)
pub fn default_global_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("dropship"))
}

pub fn global_config_path(global_dir: &Path) -> PathBuf {
    global_dir.join(CONFIG_FILE_NAME)
}

pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_FILE_NAME)
}
