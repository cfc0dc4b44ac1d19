use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::Action;
use crate::profile::FavoriteKind;
use crate::session::FailurePolicy;

// ── Query params ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AskParams {
    /// Free-text question, matched case-insensitively.
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResolveParams {
    pub query: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct HelpParams {
    /// Category slug or command name. Omit to list categories.
    #[serde(default)]
    pub topic: Option<String>,
}

// ── Execution params ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExecuteMessageParams {
    /// Id of an assistant message whose reply can be executed.
    pub message_id: u64,
    #[serde(default)]
    pub policy: FailurePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExecuteActionsParams {
    pub actions: Vec<Action>,
}

// ── Profile params ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AddFavoriteParams {
    pub kind: FavoriteKind,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SetPluginFoldersParams {
    pub folders: Vec<String>,
}
