#![allow(clippy::needless_pass_by_value)]

use std::sync::Arc;

use crate::error::AppError;
use crate::profile::Preferences;
use crate::registry::params::{AddFavoriteParams, SetPluginFoldersParams};
use crate::registry::{CommandOutput, CommandResult};
use crate::state::AppState;

pub fn get_profile(state: &Arc<AppState>) -> Result<CommandOutput, AppError> {
    let profile = state.profile.lock().clone();
    Ok(CommandOutput::new("Profile", CommandResult::GetProfile(profile)))
}

pub fn add_favorite(state: &Arc<AppState>, p: AddFavoriteParams) -> Result<CommandOutput, AppError> {
    let added = state.update_profile(|profile| profile.add_favorite(p.kind, &p.name))?;
    let message = if added {
        format!("Added '{}' to favorites", p.name.trim())
    } else {
        format!("'{}' is already a favorite", p.name.trim())
    };
    Ok(CommandOutput::new(message, CommandResult::AddFavorite(added)))
}

pub fn set_plugin_folders(
    state: &Arc<AppState>,
    p: SetPluginFoldersParams,
) -> Result<CommandOutput, AppError> {
    let folders = state.update_profile(|profile| {
        profile.set_plugin_folders(p.folders);
        Ok(profile.plugin_folders.clone())
    })?;
    Ok(CommandOutput::new(
        format!("{} plugin folders", folders.len()),
        CommandResult::SetPluginFolders(folders),
    ))
}

pub fn set_preferences(state: &Arc<AppState>, p: Preferences) -> Result<CommandOutput, AppError> {
    let preferences = state.update_profile(|profile| {
        profile.set_preferences(p);
        Ok(profile.preferences.clone())
    })?;
    Ok(CommandOutput::new(
        "Preferences updated",
        CommandResult::SetPreferences(preferences),
    ))
}
