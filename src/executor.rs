//! Performs one typed action against the target through an [`InputBackend`].
//!
//! The executor never returns an error: malformed actions, refused input,
//! backend faults, panics and timeouts all come back as a failed
//! [`ActionResult`].

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::FutureExt;

use crate::backend::InputBackend;
use crate::error::AppError;
use crate::model::{Action, ActionKind, ActionResult, Point};
use crate::settings::PacingConfig;

/// Anything that can carry out a single action. The controller only knows
/// this seam, so tests can substitute a scripted dispatcher.
#[async_trait]
pub trait ActionDispatcher: Send + Sync {
    async fn execute(&self, action: &Action) -> ActionResult;
}

pub struct ActionExecutor {
    backend: Arc<dyn InputBackend>,
    pacing: PacingConfig,
    dispatch_timeout: Duration,
}

impl ActionExecutor {
    pub fn new(backend: Arc<dyn InputBackend>, pacing: PacingConfig, dispatch_timeout: Duration) -> Self {
        Self {
            backend,
            pacing,
            dispatch_timeout,
        }
    }

    pub fn backend(&self) -> &Arc<dyn InputBackend> {
        &self.backend
    }

    async fn dispatch(&self, action: &Action) -> Result<ActionResult, AppError> {
        match action.kind {
            ActionKind::Click => self.perform_click(action).await,
            ActionKind::Drag => self.perform_drag(action).await,
            // Menus are reached through their shortcuts.
            ActionKind::Keyboard | ActionKind::Menu => self.perform_keys(action).await,
            ActionKind::Parameter => Ok(Self::perform_parameter(action)),
            ActionKind::Device => self.perform_device(action).await,
            ActionKind::Track => Ok(Self::perform_track(action)),
        }
    }

    /// Bring the target to the front and let it settle.
    async fn focus(&self) -> Result<bool, AppError> {
        if !self.backend.focus_target().await? {
            tracing::warn!(backend = self.backend.name(), "Could not focus target window");
            return Ok(false);
        }
        settle(self.pacing.focus_settle()).await;
        Ok(true)
    }

    async fn click(&self, at: Point) -> Result<bool, AppError> {
        Ok(self.focus().await? && self.backend.click(at).await?)
    }

    async fn drag(&self, from: Point, to: Point) -> Result<bool, AppError> {
        Ok(self.focus().await? && self.backend.drag(from, to).await?)
    }

    async fn keys(&self, combo: &str) -> Result<bool, AppError> {
        Ok(self.focus().await? && self.backend.send_keys(combo).await?)
    }

    async fn perform_click(&self, action: &Action) -> Result<ActionResult, AppError> {
        let Some(at) = action.coordinates else {
            return Ok(ActionResult::failed("No coordinates provided for click action"));
        };
        if self.click(at).await? {
            Ok(ActionResult::ok(format!(
                "Clicked {} at coordinates {at}",
                action.target
            )))
        } else {
            Ok(ActionResult::failed(format!(
                "Failed to click at coordinates {at}"
            )))
        }
    }

    async fn perform_drag(&self, action: &Action) -> Result<ActionResult, AppError> {
        let (Some(from), Some(to)) = (
            action.coordinates,
            action.value.as_ref().and_then(|v| v.as_point()),
        ) else {
            return Ok(ActionResult::failed("Invalid drag parameters"));
        };
        if self.drag(from, to).await? {
            Ok(ActionResult::ok(format!("Dragged from {from} to {to}")))
        } else {
            Ok(ActionResult::failed(format!(
                "Failed to drag from {from} to {to}"
            )))
        }
    }

    async fn perform_keys(&self, action: &Action) -> Result<ActionResult, AppError> {
        let combo = action.target.as_str();
        if self.keys(combo).await? {
            Ok(ActionResult::ok(format!("Sent keyboard input: {combo}")))
        } else {
            Ok(ActionResult::failed(format!(
                "Failed to send keyboard input: {combo}"
            )))
        }
    }

    /// Recorded only; the target gives no feedback on parameter changes.
    fn perform_parameter(action: &Action) -> ActionResult {
        tracing::info!(param = %action.target, value = ?action.value, "Setting parameter");
        let message = match &action.value {
            Some(value) => format!("Set parameter {} to {value}", action.target),
            None => format!("Set parameter {}", action.target),
        };
        let data = serde_json::json!({
            "target": action.target,
            "value": action.value,
        });
        ActionResult::ok(message).with_data(data)
    }

    async fn perform_device(&self, action: &Action) -> Result<ActionResult, AppError> {
        match action.target.as_str() {
            "add_eq_device" => {
                if !self.keys("F4").await? {
                    return Ok(ActionResult::failed("Failed to open device browser"));
                }
                settle(self.pacing.device_browser()).await;
                Ok(ActionResult::ok("EQ+ device added to track"))
            }
            "add_selected_device" => Ok(ActionResult::ok("Selected device added to track")),
            other => Ok(ActionResult::ok(format!("Device action completed: {other}"))),
        }
    }

    fn perform_track(action: &Action) -> ActionResult {
        match action.target.as_str() {
            "add_midi_track" => ActionResult::ok("MIDI track added successfully"),
            other => ActionResult::ok(format!("Track action completed: {other}")),
        }
    }
}

#[async_trait]
impl ActionDispatcher for ActionExecutor {
    async fn execute(&self, action: &Action) -> ActionResult {
        let guarded = AssertUnwindSafe(self.dispatch(action)).catch_unwind();
        let result = match tokio::time::timeout(self.dispatch_timeout, guarded).await {
            Ok(Ok(Ok(result))) => result,
            Ok(Ok(Err(e))) => ActionResult::failed(format!("Failed to execute action: {e}")),
            Ok(Err(panic)) => ActionResult::failed(format!(
                "Failed to execute action: {}",
                panic_message(panic.as_ref())
            )),
            Err(_) => ActionResult::failed(format!(
                "Action timed out after {}ms: {}",
                self.dispatch_timeout.as_millis(),
                action.description
            )),
        };
        tracing::info!(
            kind = %action.kind,
            action_target = %action.target,
            success = result.success,
            message = %result.message,
            "Action executed"
        );
        result
    }
}

async fn settle(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic during dispatch".to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::backend::{InputEvent, PlatformSupport, SimulatedBackend};

    fn executor() -> (ActionExecutor, Arc<SimulatedBackend>) {
        let backend = Arc::new(SimulatedBackend::default());
        let exec = ActionExecutor::new(
            backend.clone(),
            PacingConfig::immediate(),
            Duration::from_secs(5),
        );
        (exec, backend)
    }

    #[tokio::test]
    async fn click_without_coordinates_fails_with_fixed_text() {
        let (exec, backend) = executor();
        let action = Action::new(ActionKind::Click, "record_arm_button", "Arm");
        let result = exec.execute(&action).await;
        assert!(!result.success);
        assert_eq!(result.message, "No coordinates provided for click action");
        assert!(backend.journal().is_empty());
    }

    #[tokio::test]
    async fn click_focuses_then_clicks() {
        let (exec, backend) = executor();
        let action = Action::click("main_record_button", Point::new(400, 50), "Record");
        let result = exec.execute(&action).await;
        assert!(result.success);
        assert_eq!(
            result.message,
            "Clicked main_record_button at coordinates (400, 50)"
        );
        assert_eq!(
            backend.journal(),
            vec![
                InputEvent::Focus,
                InputEvent::Click {
                    at: Point::new(400, 50)
                }
            ]
        );
    }

    #[tokio::test]
    async fn refused_focus_fails_the_click() {
        let (exec, backend) = executor();
        backend.set_refuse_focus(true);
        let result = exec
            .execute(&Action::click("x", Point::new(1, 2), "x"))
            .await;
        assert!(!result.success);
        assert_eq!(result.message, "Failed to click at coordinates (1, 2)");
    }

    #[tokio::test]
    async fn drag_requires_a_point_value() {
        let (exec, _) = executor();
        let bad = Action::new(ActionKind::Drag, "clip", "Move clip")
            .with_coordinates(Point::new(0, 0))
            .with_value("somewhere");
        assert_eq!(exec.execute(&bad).await.message, "Invalid drag parameters");

        let good = Action::new(ActionKind::Drag, "clip", "Move clip")
            .with_coordinates(Point::new(10, 10))
            .with_value(Point::new(90, 10));
        let result = exec.execute(&good).await;
        assert!(result.success);
        assert_eq!(result.message, "Dragged from (10, 10) to (90, 10)");
    }

    #[tokio::test]
    async fn menu_goes_through_the_keyboard_path() {
        let (exec, backend) = executor();
        let result = exec
            .execute(&Action::new(ActionKind::Menu, "Ctrl+T", "Add track"))
            .await;
        assert_eq!(result.message, "Sent keyboard input: Ctrl+T");
        assert!(backend.journal().contains(&InputEvent::Keys {
            combo: "Ctrl+T".into()
        }));
    }

    #[tokio::test]
    async fn parameter_reports_target_and_value() {
        let (exec, backend) = executor();
        let action = Action::parameter("track_volume", -6.0, "Lower the volume");
        let result = exec.execute(&action).await;
        assert!(result.success);
        assert!(result.message.contains("track_volume"));
        assert!(result.message.contains("-6"));
        assert!(backend.journal().is_empty());
    }

    #[tokio::test]
    async fn device_and_track_tables() {
        let (exec, backend) = executor();
        let eq = exec
            .execute(&Action::new(ActionKind::Device, "add_eq_device", "EQ"))
            .await;
        assert_eq!(eq.message, "EQ+ device added to track");
        assert!(backend.journal().contains(&InputEvent::Keys {
            combo: "F4".into()
        }));

        let other = exec
            .execute(&Action::new(ActionKind::Device, "bypass", "Bypass"))
            .await;
        assert_eq!(other.message, "Device action completed: bypass");

        let midi = exec
            .execute(&Action::new(ActionKind::Track, "add_midi_track", "MIDI"))
            .await;
        assert_eq!(midi.message, "MIDI track added successfully");
        let other = exec
            .execute(&Action::new(ActionKind::Track, "solo", "Solo"))
            .await;
        assert_eq!(other.message, "Track action completed: solo");
    }

    struct FaultyBackend {
        panic: bool,
    }

    #[async_trait]
    impl InputBackend for FaultyBackend {
        fn name(&self) -> &'static str {
            "faulty"
        }
        fn support(&self) -> PlatformSupport {
            PlatformSupport::Supported
        }
        async fn focus_target(&self) -> Result<bool, AppError> {
            if self.panic {
                panic!("window handle vanished");
            }
            Err(AppError::BackendError {
                message: "injector crashed".into(),
            })
        }
        async fn click(&self, _at: Point) -> Result<bool, AppError> {
            Ok(true)
        }
        async fn drag(&self, _from: Point, _to: Point) -> Result<bool, AppError> {
            Ok(true)
        }
        async fn send_keys(&self, _combo: &str) -> Result<bool, AppError> {
            Ok(true)
        }
    }

    #[tokio::test]
    async fn backend_faults_and_panics_become_failed_results() {
        let action = Action::keyboard("Space", "Play");

        let erroring = ActionExecutor::new(
            Arc::new(FaultyBackend { panic: false }),
            PacingConfig::immediate(),
            Duration::from_secs(5),
        );
        let result = erroring.execute(&action).await;
        assert!(!result.success);
        assert_eq!(result.message, "Failed to execute action: injector crashed");

        let panicking = ActionExecutor::new(
            Arc::new(FaultyBackend { panic: true }),
            PacingConfig::immediate(),
            Duration::from_secs(5),
        );
        let result = panicking.execute(&action).await;
        assert!(!result.success);
        assert_eq!(
            result.message,
            "Failed to execute action: window handle vanished"
        );
    }

    #[tokio::test]
    async fn slow_dispatch_times_out() {
        let slow = Arc::new(SimulatedBackend::new(Duration::from_secs(30)));
        let exec = ActionExecutor::new(slow, PacingConfig::immediate(), Duration::from_millis(20));
        let result = exec.execute(&Action::keyboard("Ctrl+S", "Save")).await;
        assert!(!result.success);
        assert_eq!(result.message, "Action timed out after 20ms: Save");
    }
}
