use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::action::Action;

/// Pointer gesture a step hints at. Display-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum MouseGesture {
    Click,
    Drag,
    Hover,
    DoubleClick,
}

/// Where the user's pointer should go for a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MousePosition {
    pub x: i32,
    pub y: i32,
    pub action: MouseGesture,
    pub description: String,
}

/// One entry of the step-by-step guide shown next to an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Step {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mouse_position: Option<MousePosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
}

/// The resolver's reply to one query.
///
/// `steps` and `actions` are authored in parallel but are independent lists;
/// only `actions` is ever executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResponseBundle {
    pub answer: String,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub can_execute: bool,
}

impl ResponseBundle {
    /// A prose-only reply with nothing to execute.
    pub fn answer_only(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            steps: Vec::new(),
            actions: Vec::new(),
            can_execute: false,
        }
    }

    /// True when the bundle is flagged executable and has something to run.
    pub fn is_executable(&self) -> bool {
        self.can_execute && !self.actions.is_empty()
    }
}
