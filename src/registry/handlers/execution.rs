#![allow(clippy::needless_pass_by_value)]

use std::sync::Arc;

use serde::Serialize;

use crate::assistant;
use crate::controller::CompositeOperation;
use crate::error::AppError;
use crate::model::Action;
use crate::registry::params::{ExecuteActionsParams, ExecuteMessageParams};
use crate::registry::{CommandOutput, CommandResult};
use crate::state::AppState;

/// A composite as listed for discovery.
#[derive(Debug, Clone, Serialize)]
pub struct CompositeSummary {
    pub name: &'static str,
    pub example: CompositeOperation,
    pub actions: Vec<Action>,
}

pub fn cancel_execution(state: &Arc<AppState>) -> Result<CommandOutput, AppError> {
    let cancelled = state.with_assistant_mut(|a| a.cancel());
    let message = if cancelled {
        "Cancellation requested"
    } else {
        "Nothing is executing"
    };
    Ok(CommandOutput::new(message, CommandResult::CancelExecution(cancelled)))
}

pub fn list_composites(_state: &Arc<AppState>) -> Result<CommandOutput, AppError> {
    let composites: Vec<CompositeSummary> = CompositeOperation::catalog()
        .into_iter()
        .map(|op| CompositeSummary {
            name: op.name(),
            actions: op.actions(),
            example: op,
        })
        .collect();
    Ok(CommandOutput::new(
        format!("{} composite operations", composites.len()),
        CommandResult::ListComposites(composites),
    ))
}

pub async fn execute_message(
    state: Arc<AppState>,
    p: ExecuteMessageParams,
) -> Result<CommandOutput, AppError> {
    let report =
        assistant::execute_message(&state.assistant, &state.controller, p.message_id, p.policy)
            .await?;
    state
        .profile
        .lock()
        .add_recent_action(format!("message {}: {}", p.message_id, report.summary));
    Ok(CommandOutput::new(
        report.summary.clone(),
        CommandResult::ExecuteMessage(report),
    ))
}

pub async fn execute_actions(
    state: Arc<AppState>,
    p: ExecuteActionsParams,
) -> Result<CommandOutput, AppError> {
    state.controller.wait_for_initialization().await;
    let results = state.controller.execute_actions(&p.actions).await;
    {
        let mut profile = state.profile.lock();
        for action in &p.actions {
            profile.add_recent_action(action.description.clone());
        }
    }
    Ok(CommandOutput::new(
        results.join("\n"),
        CommandResult::ExecuteActions(results),
    ))
}

pub async fn run_composite(
    state: Arc<AppState>,
    op: CompositeOperation,
) -> Result<CommandOutput, AppError> {
    state.controller.wait_for_initialization().await;
    let report = state.controller.run_composite(&op).await;
    state.profile.lock().add_recent_action(op.name());
    Ok(CommandOutput::new(
        report.result.message.clone(),
        CommandResult::RunComposite(report),
    ))
}
