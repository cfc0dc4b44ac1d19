pub mod action;
pub mod bundle;

// Re-export commonly used types at the model level.
pub use action::{Action, ActionKind, ActionResult, ActionValue, Point};
pub use bundle::{MouseGesture, MousePosition, ResponseBundle, Step};
