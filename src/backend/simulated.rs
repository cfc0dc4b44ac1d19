use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;

use super::{InputBackend, PlatformSupport, TargetProbe};
use crate::error::AppError;
use crate::model::Point;

/// One input the simulated backend accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InputEvent {
    Focus,
    Click { at: Point },
    Drag { from: Point, to: Point },
    Keys { combo: String },
}

/// Logs and journals input instead of injecting it. Each call sleeps for
/// `latency` so pacing behaves like a real target.
pub struct SimulatedBackend {
    latency: Duration,
    journal: Mutex<Vec<InputEvent>>,
    refuse_focus: AtomicBool,
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl SimulatedBackend {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            journal: Mutex::new(Vec::new()),
            refuse_focus: AtomicBool::new(false),
        }
    }

    /// Make subsequent focus requests fail, as if the window had vanished.
    pub fn set_refuse_focus(&self, refuse: bool) {
        self.refuse_focus.store(refuse, Ordering::Relaxed);
    }

    /// Everything accepted so far, oldest first.
    pub fn journal(&self) -> Vec<InputEvent> {
        self.journal.lock().clone()
    }

    async fn record(&self, event: InputEvent) -> Result<bool, AppError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        tracing::info!(?event, "Simulated input");
        self.journal.lock().push(event);
        Ok(true)
    }
}

#[async_trait]
impl InputBackend for SimulatedBackend {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn support(&self) -> PlatformSupport {
        PlatformSupport::Supported
    }

    async fn focus_target(&self) -> Result<bool, AppError> {
        if self.refuse_focus.load(Ordering::Relaxed) {
            tracing::warn!("Simulated focus refused");
            return Ok(false);
        }
        self.record(InputEvent::Focus).await
    }

    async fn click(&self, at: Point) -> Result<bool, AppError> {
        self.record(InputEvent::Click { at }).await
    }

    async fn drag(&self, from: Point, to: Point) -> Result<bool, AppError> {
        self.record(InputEvent::Drag { from, to }).await
    }

    async fn send_keys(&self, combo: &str) -> Result<bool, AppError> {
        self.record(InputEvent::Keys {
            combo: combo.to_string(),
        })
        .await
    }
}

// ── Probe ────────────────────────────────────────────────────────

/// Probe with a switchable answer. Useful off Windows and in tests.
pub struct SimulatedProbe {
    running: AtomicBool,
}

impl SimulatedProbe {
    pub fn new(running: bool) -> Self {
        Self {
            running: AtomicBool::new(running),
        }
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Relaxed);
    }
}

#[async_trait]
impl TargetProbe for SimulatedProbe {
    fn support(&self) -> PlatformSupport {
        PlatformSupport::Supported
    }

    async fn is_target_running(&self) -> Result<bool, AppError> {
        Ok(self.running.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn journals_events_in_order() {
        let backend = SimulatedBackend::default();
        assert!(backend.focus_target().await.unwrap());
        assert!(backend.click(Point::new(1, 2)).await.unwrap());
        assert!(backend.send_keys("Ctrl+S").await.unwrap());

        assert_eq!(
            backend.journal(),
            vec![
                InputEvent::Focus,
                InputEvent::Click { at: Point::new(1, 2) },
                InputEvent::Keys {
                    combo: "Ctrl+S".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn refused_focus_is_not_journaled() {
        let backend = SimulatedBackend::default();
        backend.set_refuse_focus(true);
        assert!(!backend.focus_target().await.unwrap());
        assert!(backend.journal().is_empty());
    }

    #[tokio::test]
    async fn probe_answer_can_be_flipped() {
        let probe = SimulatedProbe::new(false);
        assert!(!probe.is_target_running().await.unwrap());
        probe.set_running(true);
        assert!(probe.is_target_running().await.unwrap());
    }
}
