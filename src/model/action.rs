use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A screen position in target-window pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ── Action kind ─────────────────────────────────────────────────────

/// What sort of input an action stands for. The executor dispatches on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Click,
    Drag,
    Keyboard,
    Menu,
    Parameter,
    Device,
    Track,
}

impl ActionKind {
    pub fn slug(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Drag => "drag",
            Self::Keyboard => "keyboard",
            Self::Menu => "menu",
            Self::Parameter => "parameter",
            Self::Device => "device",
            Self::Track => "track",
        }
    }

    pub fn all() -> &'static [ActionKind] {
        &[
            Self::Click,
            Self::Drag,
            Self::Keyboard,
            Self::Menu,
            Self::Parameter,
            Self::Device,
            Self::Track,
        ]
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

// ── Action value ────────────────────────────────────────────────────

/// Kind-dependent payload: a level for `parameter`, a destination for `drag`,
/// a named choice for anything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ActionValue {
    Point(Point),
    Number(f64),
    Text(String),
}

impl ActionValue {
    pub fn as_point(&self) -> Option<Point> {
        match self {
            ActionValue::Point(p) => Some(*p),
            _ => None,
        }
    }
}

impl fmt::Display for ActionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionValue::Point(p) => write!(f, "{p}"),
            ActionValue::Number(n) => write!(f, "{n}"),
            ActionValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for ActionValue {
    fn from(n: f64) -> Self {
        ActionValue::Number(n)
    }
}

impl From<Point> for ActionValue {
    fn from(p: Point) -> Self {
        ActionValue::Point(p)
    }
}

impl From<&str> for ActionValue {
    fn from(s: &str) -> Self {
        ActionValue::Text(s.to_string())
    }
}

// ── Action ──────────────────────────────────────────────────────────

/// One typed instruction against the target application.
///
/// `type` is accepted as an alias of `kind` so documents written for the
/// browser front-end deserialize unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Action {
    #[serde(alias = "type")]
    pub kind: ActionKind,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ActionValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Point>,
    pub description: String,
}

impl Action {
    pub fn new(kind: ActionKind, target: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
            value: None,
            coordinates: None,
            description: description.into(),
        }
    }

    pub fn click(target: impl Into<String>, at: Point, description: impl Into<String>) -> Self {
        Self::new(ActionKind::Click, target, description).with_coordinates(at)
    }

    pub fn keyboard(combo: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(ActionKind::Keyboard, combo, description)
    }

    pub fn parameter(
        target: impl Into<String>,
        value: impl Into<ActionValue>,
        description: impl Into<String>,
    ) -> Self {
        Self::new(ActionKind::Parameter, target, description).with_value(value)
    }

    pub fn with_value(mut self, value: impl Into<ActionValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_coordinates(mut self, at: Point) -> Self {
        self.coordinates = Some(at);
        self
    }
}

// ── Action result ───────────────────────────────────────────────────

/// Outcome of one dispatched action. Failures are values, not errors, so
/// callers can narrate them like any other reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ActionResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}
