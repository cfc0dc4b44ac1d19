#![allow(clippy::needless_pass_by_value)]

use std::sync::Arc;

use serde::Serialize;

use crate::controller::ConnectionState;
use crate::error::AppError;
use crate::registry::{CommandOutput, CommandResult};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub connected: bool,
    pub target: String,
}

fn connection_message(state: &AppState, connected: bool) -> String {
    let name = state.controller.display_name();
    if connected {
        format!("{name} is running")
    } else {
        format!("{name} is not running")
    }
}

pub fn get_connection_status(state: &Arc<AppState>) -> Result<CommandOutput, AppError> {
    let current = state.controller.connection_state();
    let status = ConnectionStatus {
        state: current,
        connected: current.is_connected(),
        target: state.controller.display_name().to_string(),
    };
    Ok(CommandOutput::new(
        format!("{}: {current}", status.target),
        CommandResult::GetConnectionStatus(status),
    ))
}

pub fn get_system_info(state: &Arc<AppState>) -> Result<CommandOutput, AppError> {
    let info = state.controller.system_info();
    let message = format!(
        "{} ({}), backend {}",
        info.platform,
        if info.supported { "supported" } else { "unsupported" },
        info.backend
    );
    Ok(CommandOutput::new(message, CommandResult::GetSystemInfo(info)))
}

pub async fn reconnect(state: Arc<AppState>) -> Result<CommandOutput, AppError> {
    let connected = state.controller.reconnect().await;
    Ok(CommandOutput::new(
        connection_message(&state, connected),
        CommandResult::Reconnect(connected),
    ))
}

pub async fn check_connection(state: Arc<AppState>) -> Result<CommandOutput, AppError> {
    let connected = state.controller.probe_connection().await;
    Ok(CommandOutput::new(
        connection_message(&state, connected),
        CommandResult::CheckConnection(connected),
    ))
}

pub async fn wait_ready(state: Arc<AppState>) -> Result<CommandOutput, AppError> {
    let connected = state.controller.wait_for_initialization().await;
    Ok(CommandOutput::new(
        connection_message(&state, connected),
        CommandResult::WaitReady(connected),
    ))
}
