//! The user's preferences and favorites, persisted as `profile.json`.

use std::collections::VecDeque;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::store::{read_json, write_json};

const RECENT_ACTIONS_CAP: usize = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Preferences {
    pub theme: Theme,
    pub show_suggestions: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            show_suggestions: true,
        }
    }
}

/// Which favorites list an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FavoriteKind {
    Plugin,
    Device,
    Template,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct UserProfile {
    pub favorite_plugins: Vec<String>,
    pub favorite_devices: Vec<String>,
    pub favorite_templates: Vec<String>,
    pub plugin_folders: Vec<String>,
    pub preferences: Preferences,
    /// Newest first. Kept for the session only.
    #[serde(skip)]
    recent_actions: VecDeque<String>,
}

pub fn default_plugin_folders() -> Vec<String> {
    [
        "C:/Program Files/VSTPlugins",
        "C:/Program Files/Common Files/VST2",
        "C:/Program Files/Common Files/VST3",
        "C:/VSTPlugins",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            favorite_plugins: Vec::new(),
            favorite_devices: Vec::new(),
            favorite_templates: Vec::new(),
            plugin_folders: default_plugin_folders(),
            preferences: Preferences::default(),
            recent_actions: VecDeque::new(),
        }
    }
}

impl UserProfile {
    fn favorites_mut(&mut self, kind: FavoriteKind) -> &mut Vec<String> {
        match kind {
            FavoriteKind::Plugin => &mut self.favorite_plugins,
            FavoriteKind::Device => &mut self.favorite_devices,
            FavoriteKind::Template => &mut self.favorite_templates,
        }
    }

    pub fn favorites(&self, kind: FavoriteKind) -> &[String] {
        match kind {
            FavoriteKind::Plugin => &self.favorite_plugins,
            FavoriteKind::Device => &self.favorite_devices,
            FavoriteKind::Template => &self.favorite_templates,
        }
    }

    /// Add a favorite. Returns false when it was already there.
    pub fn add_favorite(&mut self, kind: FavoriteKind, name: &str) -> Result<bool, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::ValidationError {
                message: "Favorite name must not be empty".to_string(),
            });
        }
        let list = self.favorites_mut(kind);
        if list.iter().any(|existing| existing == name) {
            return Ok(false);
        }
        list.push(name.to_string());
        Ok(true)
    }

    pub fn add_favorite_plugin(&mut self, name: &str) -> Result<bool, AppError> {
        self.add_favorite(FavoriteKind::Plugin, name)
    }

    pub fn add_favorite_device(&mut self, name: &str) -> Result<bool, AppError> {
        self.add_favorite(FavoriteKind::Device, name)
    }

    pub fn add_favorite_template(&mut self, name: &str) -> Result<bool, AppError> {
        self.add_favorite(FavoriteKind::Template, name)
    }

    /// Replace the plugin folder list, dropping blanks and repeats.
    pub fn set_plugin_folders(&mut self, folders: Vec<String>) {
        let mut cleaned: Vec<String> = Vec::with_capacity(folders.len());
        for folder in folders {
            let folder = folder.trim().to_string();
            if !folder.is_empty() && !cleaned.contains(&folder) {
                cleaned.push(folder);
            }
        }
        self.plugin_folders = cleaned;
    }

    pub fn set_preferences(&mut self, preferences: Preferences) {
        self.preferences = preferences;
    }

    pub fn add_recent_action(&mut self, action: impl Into<String>) {
        self.recent_actions.push_front(action.into());
        self.recent_actions.truncate(RECENT_ACTIONS_CAP);
    }

    pub fn recent_actions(&self) -> impl Iterator<Item = &str> {
        self.recent_actions.iter().map(String::as_str)
    }
}

/// Load the profile. A missing file yields defaults; fields absent from the
/// file are filled from defaults too.
pub fn load_profile(app_config_dir: &Path) -> Result<UserProfile, AppError> {
    let path = crate::paths::profile_path(app_config_dir);
    if !path.exists() {
        return Ok(UserProfile::default());
    }
    Ok(read_json(&path)?)
}

pub fn save_profile(app_config_dir: &Path, profile: &UserProfile) -> Result<(), AppError> {
    std::fs::create_dir_all(app_config_dir)?;
    write_json(&crate::paths::profile_path(app_config_dir), profile)?;
    tracing::debug!("Saved user profile");
    Ok(())
}
