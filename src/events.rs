//! Single source of truth for event names pushed to front-ends.

pub const MESSAGE_ADDED: &str = "assistant:message";
pub const ACTION_RESULT: &str = "assistant:action_result";
pub const SESSION_STATUS: &str = "assistant:session_status";
pub const TRANSCRIPT_CLEARED: &str = "assistant:cleared";
pub const CONNECTION_CHANGED: &str = "connection:changed";

pub const ALL: &[&str] = &[
    MESSAGE_ADDED,
    ACTION_RESULT,
    SESSION_STATUS,
    TRANSCRIPT_CLEARED,
    CONNECTION_CHANGED,
];
