use std::sync::Arc;

use serde_json::Value;

use crate::error::AppError;
use crate::state::AppState;

use super::{Command, CommandOutput};

/// Execute a sync Command against the application state.
/// Async commands are rejected; use [`execute_async`] for those.
pub fn execute(state: &Arc<AppState>, cmd: Command) -> Result<CommandOutput, AppError> {
    cmd.dispatch(state)
}

/// Execute any Command. This is the single dispatch point for the CLI and
/// the HTTP API.
pub async fn execute_async(state: Arc<AppState>, cmd: Command) -> Result<CommandOutput, AppError> {
    let name = cmd.info().name;
    tracing::debug!(command = name, "Dispatching command");
    let out = cmd.dispatch_async(state).await;
    if let Err(ref e) = out {
        tracing::warn!(command = name, error = %e, "Command failed");
    }
    out
}

/// Look up a command by name, parse its params, and run it.
pub async fn run_named(
    state: Arc<AppState>,
    name: &str,
    params: &Value,
) -> Result<CommandOutput, AppError> {
    let cmd = Command::from_tool_call(name, params).map_err(|message| {
        AppError::ValidationError { message }
    })?;
    execute_async(state, cmd).await
}
