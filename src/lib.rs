//! Bitwig Studio assistant: resolves free-text questions to canned answers
//! with executable action plans, and drives the running DAW through a
//! pluggable input backend.

#[cfg(feature = "server")]
pub mod api;
pub mod assistant;
pub mod backend;
pub mod controller;
pub mod error;
pub mod events;
pub mod executor;
pub mod knowledge;
pub mod logging;
pub mod model;
pub mod paths;
pub mod profile;
pub mod registry;
pub mod session;
pub mod settings;
pub mod state;
pub mod store;

use crate::controller::ActionController;
use crate::knowledge::IntentResolver;
use crate::model::{Action, ResponseBundle};

/// Resolve a query to its canned reply. Never fails.
pub fn process_query(resolver: &IntentResolver, text: &str) -> ResponseBundle {
    resolver.resolve(text)
}

/// Execute actions in order and return one message per action.
pub async fn execute_actions(controller: &ActionController, actions: &[Action]) -> Vec<String> {
    controller.execute_actions(actions).await
}
