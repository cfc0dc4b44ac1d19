use std::sync::Arc;

use crate::error::AppError;
use crate::registry::{CommandOutput, CommandResult};
use crate::state::AppState;

pub fn get_settings(state: &Arc<AppState>) -> Result<CommandOutput, AppError> {
    let settings = state.settings.lock().clone();
    Ok(CommandOutput::new("Settings", CommandResult::GetSettings(settings)))
}
