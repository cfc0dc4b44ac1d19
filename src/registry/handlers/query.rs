#![allow(clippy::needless_pass_by_value)]

use std::sync::Arc;

use serde::Serialize;

use crate::error::AppError;
use crate::registry::catalog;
use crate::registry::params::{AskParams, HelpParams, ResolveParams};
use crate::registry::{CommandOutput, CommandResult};
use crate::state::AppState;

/// One knowledge topic as shown in listings.
#[derive(Debug, Clone, Serialize)]
pub struct TopicSummary {
    pub key: String,
    pub keywords: Vec<String>,
    pub steps: usize,
    pub actions: usize,
    pub can_execute: bool,
}

pub fn ask(state: &Arc<AppState>, p: AskParams) -> Result<CommandOutput, AppError> {
    let reply = state.with_assistant_mut(|a| a.ask(&p.query));
    Ok(CommandOutput::new(
        reply.resolution.bundle.answer.clone(),
        CommandResult::Ask(reply),
    ))
}

pub fn resolve(state: &Arc<AppState>, p: ResolveParams) -> Result<CommandOutput, AppError> {
    let resolution = state.resolver.resolve_detailed(&p.query);
    let message = match &resolution.topic {
        Some(topic) => format!("Resolved to '{topic}'"),
        None => "No topic matched".to_string(),
    };
    Ok(CommandOutput::new(message, CommandResult::Resolve(resolution)))
}

pub fn help(_state: &Arc<AppState>, p: HelpParams) -> Result<CommandOutput, AppError> {
    let text = catalog::help_text(p.topic.as_deref());
    Ok(CommandOutput::new(text.clone(), CommandResult::Help(text)))
}

pub fn list_topics(state: &Arc<AppState>) -> Result<CommandOutput, AppError> {
    let kb = state.knowledge();
    let topics: Vec<TopicSummary> = kb
        .topic_keys()
        .into_iter()
        .filter_map(|key| {
            let bundle = kb.topic(key)?;
            Some(TopicSummary {
                key: key.to_string(),
                keywords: kb
                    .keywords()
                    .iter()
                    .filter(|rule| rule.topic == key)
                    .map(|rule| rule.keyword.clone())
                    .collect(),
                steps: bundle.steps.len(),
                actions: bundle.actions.len(),
                can_execute: bundle.is_executable(),
            })
        })
        .collect();
    let message = topics
        .iter()
        .map(|t| t.key.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    Ok(CommandOutput::new(message, CommandResult::ListTopics(topics)))
}

pub fn get_history(state: &Arc<AppState>) -> Result<CommandOutput, AppError> {
    let history = state.with_assistant(|a| a.history_for_display());
    Ok(CommandOutput::new(
        format!("{} messages", history.len()),
        CommandResult::GetHistory(history),
    ))
}

pub fn clear_history(state: &Arc<AppState>) -> Result<CommandOutput, AppError> {
    state.with_assistant_mut(|a| a.clear());
    Ok(CommandOutput::new("History cleared", CommandResult::ClearHistory))
}
