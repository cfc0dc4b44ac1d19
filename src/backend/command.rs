use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;

use super::{InputBackend, PlatformSupport};
use crate::error::AppError;
use crate::model::Point;

/// Drives an external automation program (an xdotool or AutoHotkey wrapper,
/// for instance), one invocation per input event:
///
/// ```text
/// <program> [args..] focus <window title>
/// <program> [args..] click <x> <y>
/// <program> [args..] drag <x1> <y1> <x2> <y2>
/// <program> [args..] keys <combo>
/// ```
///
/// Exit status 0 means the input was delivered; any other status is a refusal.
pub struct CommandBackend {
    program: PathBuf,
    base_args: Vec<String>,
    window_title: String,
}

impl CommandBackend {
    pub fn new(program: PathBuf, base_args: Vec<String>, window_title: String) -> Self {
        Self {
            program,
            base_args,
            window_title,
        }
    }

    async fn invoke(&self, verb: &str, operands: &[String]) -> Result<bool, AppError> {
        let output = tokio::process::Command::new(&self.program)
            .args(&self.base_args)
            .arg(verb)
            .args(operands)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AppError::BackendError {
                message: format!("{}: {e}", self.program.display()),
            })?;

        if output.status.success() {
            tracing::debug!(verb, ?operands, "Input command delivered");
            return Ok(true);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::warn!(
            verb,
            ?operands,
            status = ?output.status.code(),
            stderr = %stderr.trim(),
            "Input command refused"
        );
        Ok(false)
    }
}

#[async_trait]
impl InputBackend for CommandBackend {
    fn name(&self) -> &'static str {
        "command"
    }

    fn support(&self) -> PlatformSupport {
        PlatformSupport::Supported
    }

    async fn focus_target(&self) -> Result<bool, AppError> {
        self.invoke("focus", &[self.window_title.clone()]).await
    }

    async fn click(&self, at: Point) -> Result<bool, AppError> {
        self.invoke("click", &[at.x.to_string(), at.y.to_string()]).await
    }

    async fn drag(&self, from: Point, to: Point) -> Result<bool, AppError> {
        self.invoke(
            "drag",
            &[
                from.x.to_string(),
                from.y.to_string(),
                to.x.to_string(),
                to.y.to_string(),
            ],
        )
        .await
    }

    async fn send_keys(&self, combo: &str) -> Result<bool, AppError> {
        self.invoke("keys", &[combo.to_string()]).await
    }
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exit_status_maps_to_delivery() {
        let ok = CommandBackend::new("true".into(), vec![], "Bitwig Studio".into());
        assert!(ok.click(Point::new(10, 20)).await.unwrap());

        let refused = CommandBackend::new("false".into(), vec![], "Bitwig Studio".into());
        assert!(!refused.send_keys("Ctrl+N").await.unwrap());
    }

    #[tokio::test]
    async fn missing_program_is_a_backend_error() {
        let backend = CommandBackend::new(
            "/nonexistent/bitwig-inject".into(),
            vec![],
            "Bitwig Studio".into(),
        );
        let err = backend.focus_target().await.unwrap_err();
        assert!(matches!(err, AppError::BackendError { .. }));
    }

    #[tokio::test]
    async fn operands_follow_base_args() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("args.txt");
        // sh -c '<script>' <$0> <$1..>: base args supply the script and $0.
        let script = format!("echo \"$@\" > {}", log.display());
        let backend = CommandBackend::new(
            "sh".into(),
            vec!["-c".into(), script, "inject".into()],
            "Bitwig Studio".into(),
        );
        assert!(backend
            .drag(Point::new(1, 2), Point::new(3, 4))
            .await
            .unwrap());
        let written = std::fs::read_to_string(&log).unwrap();
        assert_eq!(written.trim(), "drag 1 2 3 4");
    }
}
