//! Client-local storage locations.

use std::{
    path::PathBuf,
    sync::{Mutex, MutexGuard},
};

static CONFIG_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

fn override_guard() -> MutexGuard<'static, Option<PathBuf>> {
    CONFIG_DIR_OVERRIDE.lock().unwrap_or_else(|e| e.into_inner())
}

/// Returns the user-global config directory (`~/.config/concord/`).
pub fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = override_guard().clone() {
        return Some(dir);
    }
    directories::ProjectDirs::from("", "", "concord").map(|d| d.config_dir().to_path_buf())
}

/// Point [`config_dir`] at an explicit directory (tests, portable installs).
pub fn set_config_dir(dir: PathBuf) {
    *override_guard() = Some(dir);
}

/// Undo [`set_config_dir`].
pub fn clear_config_dir() {
    *override_guard() = None;
}
