//! Centralized path definitions for all data files.
//!
//! This module is the single source of truth for leaf filenames and the app
//! config directory. No other module should hard-code these strings.

use std::path::{Path, PathBuf};

// ── Application identity ─────────────────────────────────────────

pub const APP_ID: &str = "com.bitwigassist.app";

/// Environment variable that overrides the config directory.
pub const CONFIG_DIR_ENV: &str = "BITWIG_ASSIST_CONFIG_DIR";

// ── Leaf filenames ───────────────────────────────────────────────

pub const SETTINGS_FILE: &str = "settings.json";
pub const PROFILE_FILE: &str = "profile.json";
pub const PORT_FILE: &str = ".bitwig-assist-port";

// ── Config-dir functions (take app_config_dir) ───────────────────

pub fn settings_path(app_config_dir: &Path) -> PathBuf {
    app_config_dir.join(SETTINGS_FILE)
}

pub fn profile_path(app_config_dir: &Path) -> PathBuf {
    app_config_dir.join(PROFILE_FILE)
}

pub fn port_file_path(app_config_dir: &Path) -> PathBuf {
    app_config_dir.join(PORT_FILE)
}

/// Resolve the app config directory: `$BITWIG_ASSIST_CONFIG_DIR` if set,
/// otherwise `<os config dir>/com.bitwigassist.app`.
pub fn app_config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        return PathBuf::from(dir);
    }
    let base = if cfg!(target_os = "windows") {
        std::env::var("APPDATA")
            .map_or_else(|_| PathBuf::from("C:\\Users\\Default\\AppData\\Roaming"), PathBuf::from)
    } else if cfg!(target_os = "macos") {
        home_dir().join("Library/Application Support")
    } else {
        std::env::var("XDG_CONFIG_HOME").map_or_else(|_| home_dir().join(".config"), PathBuf::from)
    };
    base.join(APP_ID)
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_or_else(|_| PathBuf::from("."), PathBuf::from)
}
