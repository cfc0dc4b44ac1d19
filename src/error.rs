use std::fmt;

use serde::Serialize;

/// Structured error type for the application. Callers match on the error code
/// and render the detail; the action pipeline itself never returns these
/// (failures there are `ActionResult`s).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", content = "detail")]
pub enum AppError {
    NotFound { what: String },
    ValidationError { message: String },
    IoError { message: String },
    KnowledgeError { message: String },
    SettingsSaveError { message: String },
    InvalidTransition { from: String, to: String },
    UnsupportedPlatform { platform: String },
    ProbeFailed { message: String },
    BackendError { message: String },
    Timeout { what: String, millis: u64 },
    NotExecutable { message_id: u64 },
    AlreadyExecuting { message_id: u64 },
    ApiError { message: String },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound { what } => write!(f, "{what} not found"),
            AppError::ValidationError { message } => write!(f, "{message}"),
            AppError::IoError { message } => write!(f, "I/O error: {message}"),
            AppError::KnowledgeError { message } => {
                write!(f, "Invalid knowledge base: {message}")
            }
            AppError::SettingsSaveError { message } => {
                write!(f, "Failed to save settings: {message}")
            }
            AppError::InvalidTransition { from, to } => {
                write!(f, "Invalid session transition: {from} → {to}")
            }
            AppError::UnsupportedPlatform { platform } => {
                write!(f, "Target control is not supported on {platform}")
            }
            AppError::ProbeFailed { message } => write!(f, "Process probe failed: {message}"),
            AppError::BackendError { message } => write!(f, "{message}"),
            AppError::Timeout { what, millis } => write!(f, "{what} timed out after {millis}ms"),
            AppError::NotExecutable { message_id } => {
                write!(f, "Message {message_id} has no executable actions")
            }
            AppError::AlreadyExecuting { message_id } => {
                write!(f, "Message {message_id} is already executing")
            }
            AppError::ApiError { message } => write!(f, "API error: {message}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::IoError {
            message: e.to_string(),
        }
    }
}

impl From<crate::store::StoreError> for AppError {
    fn from(e: crate::store::StoreError) -> Self {
        match e {
            crate::store::StoreError::Io(io_err) => AppError::IoError {
                message: io_err.to_string(),
            },
            crate::store::StoreError::Json(json_err) => AppError::ValidationError {
                message: json_err.to_string(),
            },
        }
    }
}

/// Allow converting AppError to String for HTTP and CLI error bodies.
impl From<AppError> for String {
    fn from(e: AppError) -> String {
        e.to_string()
    }
}

impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::ValidationError { message: s }
    }
}

impl From<&str> for AppError {
    fn from(s: &str) -> Self {
        AppError::ValidationError {
            message: s.to_string(),
        }
    }
}
