//! Connectivity to the target application and sequenced dispatch.
//!
//! The controller owns the process-wide [`ConnectionState`]. Nothing reaches
//! the executor unless the state is `Connected`; every other case comes back
//! as a failed [`ActionResult`] carrying an advisory message.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};

use crate::backend::{self, PlatformSupport, TargetProbe};
use crate::error::AppError;
use crate::events;
use crate::executor::{ActionDispatcher, ActionExecutor};
use crate::model::{Action, ActionResult, Point};
use crate::settings::{AssistantSettings, PacingConfig};

// ── Connection state ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Unknown,
    Connected,
    Disconnected,
}

impl ConnectionState {
    pub fn is_known(self) -> bool {
        !matches!(self, ConnectionState::Unknown)
    }

    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionState::Unknown => "unknown",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
        })
    }
}

/// What `get_system_info` reports.
#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub platform: String,
    pub supported: bool,
    pub backend: String,
    pub connection: ConnectionState,
}

// ── Composite operations ─────────────────────────────────────────

/// Named, fixed action sequences. Every composite stops at its first failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum CompositeOperation {
    CreateProject,
    RecordAudio,
    AddEqDevice,
    SetTrackVolume { track: u32, volume: f64 },
    EnableAutomation,
    StartRecording,
    ToggleSnapToGrid,
    PlayStop,
    ToggleMetronome,
    Undo,
    Redo,
    SaveProject,
    OpenProject,
    ExportAudio,
}

/// Wording for a composite's outcome. `None` passes the action's own message
/// through.
struct Narration {
    success: Option<&'static str>,
    failure: Option<&'static str>,
}

impl Narration {
    const RAW: Narration = Narration {
        success: None,
        failure: None,
    };

    const fn both(success: &'static str, failure: &'static str) -> Self {
        Narration {
            success: Some(success),
            failure: Some(failure),
        }
    }
}

impl CompositeOperation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateProject => "create_project",
            Self::RecordAudio => "record_audio",
            Self::AddEqDevice => "add_eq_device",
            Self::SetTrackVolume { .. } => "set_track_volume",
            Self::EnableAutomation => "enable_automation",
            Self::StartRecording => "start_recording",
            Self::ToggleSnapToGrid => "toggle_snap_to_grid",
            Self::PlayStop => "play_stop",
            Self::ToggleMetronome => "toggle_metronome",
            Self::Undo => "undo",
            Self::Redo => "redo",
            Self::SaveProject => "save_project",
            Self::OpenProject => "open_project",
            Self::ExportAudio => "export_audio",
        }
    }

    /// The action list this composite runs, in order.
    pub fn actions(&self) -> Vec<Action> {
        let key = |combo: &str, description: &str| vec![Action::keyboard(combo, description)];
        match self {
            Self::CreateProject => key("Ctrl+N", "Create new project"),
            Self::RecordAudio => vec![
                Action::click(
                    "record_arm_button",
                    Point::new(150, 100),
                    "Arm track for recording",
                ),
                Action::click("main_record_button", Point::new(400, 50), "Start recording"),
            ],
            Self::AddEqDevice => vec![Action::new(
                crate::model::ActionKind::Device,
                "add_eq_device",
                "Add EQ+ device to track",
            )],
            Self::SetTrackVolume { track, volume } => vec![Action::parameter(
                "track_volume",
                *volume,
                format!("Set track {track} volume to {volume}dB"),
            )],
            Self::EnableAutomation => key("A", "Toggle automation write"),
            Self::StartRecording => key("R", "Start recording"),
            Self::ToggleSnapToGrid => key("S", "Toggle snap to grid"),
            Self::PlayStop => key("Space", "Play/Stop"),
            Self::ToggleMetronome => key("M", "Toggle metronome"),
            Self::Undo => key("Ctrl+Z", "Undo"),
            Self::Redo => key("Ctrl+Y", "Redo"),
            Self::SaveProject => key("Ctrl+S", "Save project"),
            Self::OpenProject => key("Ctrl+O", "Open project"),
            Self::ExportAudio => key("Ctrl+E", "Export audio"),
        }
    }

    fn narration(&self) -> Narration {
        match self {
            Self::CreateProject => {
                Narration::both("New project created successfully", "Failed to create new project")
            }
            Self::RecordAudio => Narration {
                success: Some("Audio recording started"),
                failure: None,
            },
            Self::AddEqDevice | Self::SetTrackVolume { .. } => Narration::RAW,
            Self::EnableAutomation => {
                Narration::both("Automation mode enabled", "Failed to enable automation")
            }
            Self::StartRecording => Narration::both("Recording started", "Failed to start recording"),
            Self::ToggleSnapToGrid => {
                Narration::both("Snap to grid toggled", "Failed to toggle snap to grid")
            }
            Self::PlayStop => Narration::both("Playback toggled", "Failed to toggle playback"),
            Self::ToggleMetronome => Narration::both("Metronome toggled", "Failed to toggle metronome"),
            Self::Undo => Narration::both("Undo performed", "Failed to undo"),
            Self::Redo => Narration::both("Redo performed", "Failed to redo"),
            Self::SaveProject => Narration::both("Project saved", "Failed to save project"),
            Self::OpenProject => Narration::both("Project opened", "Failed to open project"),
            Self::ExportAudio => {
                Narration::both("Audio export started", "Failed to start audio export")
            }
        }
    }

    /// Every parameterless composite, plus `set_track_volume` with sample
    /// arguments. Used by catalogs and help output.
    pub fn catalog() -> Vec<CompositeOperation> {
        vec![
            Self::CreateProject,
            Self::RecordAudio,
            Self::AddEqDevice,
            Self::SetTrackVolume {
                track: 1,
                volume: 0.0,
            },
            Self::EnableAutomation,
            Self::StartRecording,
            Self::ToggleSnapToGrid,
            Self::PlayStop,
            Self::ToggleMetronome,
            Self::Undo,
            Self::Redo,
            Self::SaveProject,
            Self::OpenProject,
            Self::ExportAudio,
        ]
    }
}

/// Outcome of a composite: the summarizing result plus every per-action
/// result actually produced, so callers can see where a run stopped.
#[derive(Debug, Clone, Serialize)]
pub struct CompositeReport {
    pub operation: String,
    pub result: ActionResult,
    pub executed: Vec<ActionResult>,
}

// ── Controller ───────────────────────────────────────────────────

/// Tuning that does not depend on which collaborators are plugged in.
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub display_name: String,
    pub pacing: PacingConfig,
    pub probe_timeout: Duration,
    pub backend_name: String,
    pub backend_support: PlatformSupport,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            display_name: "Bitwig Studio".to_string(),
            pacing: PacingConfig::default(),
            probe_timeout: Duration::from_secs(5),
            backend_name: "custom".to_string(),
            backend_support: PlatformSupport::Supported,
        }
    }
}

pub struct ActionController {
    probe: Arc<dyn TargetProbe>,
    dispatcher: Arc<dyn ActionDispatcher>,
    options: ControllerOptions,
    state: watch::Sender<ConnectionState>,
    /// Serializes probes. Held for the whole external check.
    probe_lock: Mutex<()>,
    /// Bumped after every completed probe, so a caller that queued behind
    /// one can tell it already has a fresh answer.
    probe_generation: AtomicU64,
    /// One action in flight at a time, whoever the caller is.
    dispatch_lock: Mutex<()>,
}

impl ActionController {
    pub fn new(
        probe: Arc<dyn TargetProbe>,
        dispatcher: Arc<dyn ActionDispatcher>,
        options: ControllerOptions,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Unknown);
        Self {
            probe,
            dispatcher,
            options,
            state,
            probe_lock: Mutex::new(()),
            probe_generation: AtomicU64::new(0),
            dispatch_lock: Mutex::new(()),
        }
    }

    /// Wire up backend, executor and probe as the settings describe.
    pub fn from_settings(settings: &AssistantSettings) -> Self {
        let input = backend::backend_from_settings(settings);
        let options = ControllerOptions {
            display_name: settings.target.display_name.clone(),
            pacing: settings.pacing,
            probe_timeout: settings.timeouts.probe(),
            backend_name: input.name().to_string(),
            backend_support: input.support(),
        };
        let executor = ActionExecutor::new(input, settings.pacing, settings.timeouts.dispatch());
        Self::new(
            backend::probe_from_settings(settings),
            Arc::new(executor),
            options,
        )
    }

    // ── State queries ────────────────────────────────────────────

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state().is_connected()
    }

    /// Watch the state without polling.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn platform_support(&self) -> PlatformSupport {
        self.probe
            .support()
            .and(self.options.backend_support.clone())
    }

    pub fn ensure_supported(&self) -> Result<(), AppError> {
        self.platform_support().ensure()
    }

    pub fn display_name(&self) -> &str {
        &self.options.display_name
    }

    pub fn system_info(&self) -> SystemInfo {
        SystemInfo {
            platform: backend::current_platform().to_string(),
            supported: self.platform_support().is_supported(),
            backend: self.options.backend_name.clone(),
            connection: self.connection_state(),
        }
    }

    fn not_running_message(&self) -> String {
        let name = &self.options.display_name;
        format!("{name} is not running. Please start {name} first.")
    }

    fn set_state(&self, next: ConnectionState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            tracing::info!(
                event = events::CONNECTION_CHANGED,
                from = %prev,
                to = %next,
                "Connection state changed"
            );
        }
    }

    // ── Probing ──────────────────────────────────────────────────

    async fn run_probe(&self) -> ConnectionState {
        if let PlatformSupport::Unsupported { platform } = self.platform_support() {
            tracing::warn!(%platform, "Target control not supported on this platform");
            return ConnectionState::Disconnected;
        }
        let name = &self.options.display_name;
        match tokio::time::timeout(self.options.probe_timeout, self.probe.is_target_running()).await {
            Ok(Ok(true)) => {
                tracing::info!("{name} detected and ready for control");
                ConnectionState::Connected
            }
            Ok(Ok(false)) => {
                tracing::info!("{name} not detected");
                ConnectionState::Disconnected
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Connection probe failed");
                ConnectionState::Disconnected
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.options.probe_timeout.as_millis(),
                    "Connection probe timed out"
                );
                ConnectionState::Disconnected
            }
        }
    }

    /// Caller must hold `probe_lock`.
    async fn probe_locked(&self) -> bool {
        let next = self.run_probe().await;
        self.set_state(next);
        self.probe_generation.fetch_add(1, Ordering::SeqCst);
        next.is_connected()
    }

    /// Run one status check and update the state. A caller that had to wait
    /// for an in-flight probe takes that probe's answer instead of starting
    /// another one.
    pub async fn probe_connection(&self) -> bool {
        let seen = self.probe_generation.load(Ordering::SeqCst);
        let _guard = self.probe_lock.lock().await;
        if self.probe_generation.load(Ordering::SeqCst) != seen {
            return self.is_connected();
        }
        self.probe_locked().await
    }

    /// Suspend until the state is known. The first caller to find nothing in
    /// flight runs the initial probe; everyone else waits on the channel, so
    /// all of them observe the same value.
    pub async fn wait_for_initialization(&self) -> bool {
        let mut rx = self.state.subscribe();
        if let Ok(_guard) = self.probe_lock.try_lock() {
            if !self.connection_state().is_known() {
                return self.probe_locked().await;
            }
        }
        let connected = match rx.wait_for(|s| s.is_known()).await {
            Ok(state) => state.is_connected(),
            Err(_) => false,
        };
        connected
    }

    /// Forget what we know, probe again, and report the new answer.
    /// Observers see the state pass through `Unknown`.
    pub async fn reconnect(&self) -> bool {
        let _guard = self.probe_lock.lock().await;
        tracing::info!("Reconnecting");
        self.set_state(ConnectionState::Unknown);
        self.probe_locked().await
    }

    // ── Dispatch ─────────────────────────────────────────────────

    /// Fail fast unless connected; otherwise hand the action to the
    /// executor and return its result unchanged.
    pub async fn execute_action(&self, action: &Action) -> ActionResult {
        if !self.is_connected() {
            tracing::warn!(
                kind = %action.kind,
                action_target = %action.target,
                state = %self.connection_state(),
                "Refusing to dispatch while not connected"
            );
            return ActionResult::failed(self.not_running_message());
        }
        let _guard = self.dispatch_lock.lock().await;
        self.dispatcher.execute(action).await
    }

    /// The gap between consecutive actions of a plain action list.
    pub async fn pause_between_actions(&self) {
        pause(self.options.pacing.action_pause()).await;
    }

    /// Run every action in order, pausing between them. Never stops early;
    /// returns exactly one result per action.
    pub async fn execute_all(&self, actions: &[Action]) -> Vec<ActionResult> {
        let mut results = Vec::with_capacity(actions.len());
        for (i, action) in actions.iter().enumerate() {
            if i > 0 {
                self.pause_between_actions().await;
            }
            results.push(self.execute_action(action).await);
        }
        results
    }

    /// Like [`execute_all`](Self::execute_all) but only the messages.
    pub async fn execute_actions(&self, actions: &[Action]) -> Vec<String> {
        self.execute_all(actions)
            .await
            .into_iter()
            .map(|r| r.message)
            .collect()
    }

    /// Run a composite, stopping at the first failed action.
    pub async fn run_composite(&self, op: &CompositeOperation) -> CompositeReport {
        let actions = op.actions();
        let narration = op.narration();
        let was_connected = self.is_connected();
        let mut executed = Vec::with_capacity(actions.len());

        for (i, action) in actions.iter().enumerate() {
            if i > 0 {
                pause(self.options.pacing.composite_pause()).await;
            }
            let result = self.execute_action(action).await;
            let failed = !result.success;
            executed.push(result.clone());
            if failed {
                tracing::warn!(operation = op.name(), step = i, "Composite stopped at failed action");
                // The disconnected advisory is more useful than a generic failure line.
                let result = match narration.failure {
                    Some(message) if was_connected => ActionResult {
                        message: message.to_string(),
                        ..result
                    },
                    _ => result,
                };
                return CompositeReport {
                    operation: op.name().to_string(),
                    result,
                    executed,
                };
            }
        }

        let result = match (narration.success, executed.last()) {
            (Some(message), _) => ActionResult::ok(message),
            (None, Some(last)) => last.clone(),
            (None, None) => ActionResult::ok(format!("{} completed", op.name())),
        };
        tracing::info!(operation = op.name(), "Composite completed");
        CompositeReport {
            operation: op.name().to_string(),
            result,
            executed,
        }
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

// ── Background refresh ───────────────────────────────────────────

/// Re-probe on a fixed interval until the returned handle is aborted.
pub fn spawn_refresh_loop(
    controller: Arc<ActionController>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let connected = controller.probe_connection().await;
            tracing::debug!(connected, "Periodic connection probe");
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::backend::SimulatedProbe;
    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;
    use std::sync::atomic::AtomicUsize;

    /// Records every action it sees and fails the ones named in `fail_targets`.
    #[derive(Default)]
    struct ScriptedDispatcher {
        seen: SyncMutex<Vec<Action>>,
        fail_targets: Vec<&'static str>,
    }

    #[async_trait]
    impl ActionDispatcher for ScriptedDispatcher {
        async fn execute(&self, action: &Action) -> ActionResult {
            self.seen.lock().push(action.clone());
            if self.fail_targets.contains(&action.target.as_str()) {
                ActionResult::failed(format!("scripted failure: {}", action.target))
            } else {
                ActionResult::ok(format!("ok: {}", action.target))
            }
        }
    }

    fn options() -> ControllerOptions {
        ControllerOptions {
            pacing: PacingConfig::immediate(),
            ..ControllerOptions::default()
        }
    }

    fn controller(
        running: bool,
        dispatcher: Arc<ScriptedDispatcher>,
    ) -> (ActionController, Arc<SimulatedProbe>) {
        let probe = Arc::new(SimulatedProbe::new(running));
        (
            ActionController::new(probe.clone(), dispatcher, options()),
            probe,
        )
    }

    #[tokio::test]
    async fn starts_unknown_and_refuses_dispatch() {
        let dispatcher = Arc::new(ScriptedDispatcher::default());
        let (ctl, _) = controller(true, dispatcher.clone());
        assert_eq!(ctl.connection_state(), ConnectionState::Unknown);

        let result = ctl.execute_action(&Action::keyboard("Space", "Play")).await;
        assert!(!result.success);
        assert_eq!(
            result.message,
            "Bitwig Studio is not running. Please start Bitwig Studio first."
        );
        assert!(dispatcher.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn execute_actions_never_short_circuits() {
        let dispatcher = Arc::new(ScriptedDispatcher {
            fail_targets: vec!["B"],
            ..ScriptedDispatcher::default()
        });
        let (ctl, _) = controller(true, dispatcher.clone());
        assert!(ctl.wait_for_initialization().await);

        let messages = ctl
            .execute_actions(&[
                Action::keyboard("A", "a"),
                Action::keyboard("B", "b"),
                Action::keyboard("C", "c"),
            ])
            .await;
        assert_eq!(messages, vec!["ok: A", "scripted failure: B", "ok: C"]);
        assert_eq!(dispatcher.seen.lock().len(), 3);
    }

    #[tokio::test]
    async fn record_audio_stops_at_failed_arm_click() {
        let dispatcher = Arc::new(ScriptedDispatcher {
            fail_targets: vec!["record_arm_button"],
            ..ScriptedDispatcher::default()
        });
        let (ctl, _) = controller(true, dispatcher.clone());
        ctl.probe_connection().await;

        let report = ctl.run_composite(&CompositeOperation::RecordAudio).await;
        assert!(!report.result.success);
        assert_eq!(report.result.message, "scripted failure: record_arm_button");
        assert_eq!(report.executed.len(), 1);
        assert_eq!(dispatcher.seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn composite_narration() {
        let dispatcher = Arc::new(ScriptedDispatcher {
            fail_targets: vec!["Space"],
            ..ScriptedDispatcher::default()
        });
        let (ctl, _) = controller(true, dispatcher);
        ctl.probe_connection().await;

        let record = ctl.run_composite(&CompositeOperation::RecordAudio).await;
        assert!(record.result.success);
        assert_eq!(record.result.message, "Audio recording started");
        assert_eq!(record.executed.len(), 2);

        let play = ctl.run_composite(&CompositeOperation::PlayStop).await;
        assert_eq!(play.result.message, "Failed to toggle playback");

        let volume = ctl
            .run_composite(&CompositeOperation::SetTrackVolume {
                track: 2,
                volume: -6.0,
            })
            .await;
        assert_eq!(volume.result.message, "ok: track_volume");
    }

    #[tokio::test]
    async fn composite_keeps_advisory_when_disconnected() {
        let (ctl, _) = controller(false, Arc::new(ScriptedDispatcher::default()));
        assert!(!ctl.wait_for_initialization().await);
        let report = ctl.run_composite(&CompositeOperation::SaveProject).await;
        assert!(report.result.message.contains("is not running"));
    }

    #[tokio::test]
    async fn reconnect_passes_through_unknown() {
        let probe = Arc::new(GatedProbe {
            gate: tokio::sync::Notify::new(),
            calls: AtomicUsize::new(0),
        });
        let ctl = Arc::new(ActionController::new(
            probe.clone(),
            Arc::new(ScriptedDispatcher::default()),
            options(),
        ));
        probe.gate.notify_one();
        assert!(ctl.wait_for_initialization().await);
        assert_eq!(ctl.connection_state(), ConnectionState::Connected);

        let reconnecting = {
            let ctl = ctl.clone();
            tokio::spawn(async move { ctl.reconnect().await })
        };
        while probe.calls.load(Ordering::SeqCst) < 2 {
            tokio::task::yield_now().await;
        }
        assert_eq!(ctl.connection_state(), ConnectionState::Unknown);
        assert!(!ctl.is_connected());

        probe.gate.notify_one();
        assert!(reconnecting.await.unwrap());
        assert_eq!(ctl.connection_state(), ConnectionState::Connected);
    }

    /// Probe that blocks until released and counts invocations.
    struct GatedProbe {
        gate: tokio::sync::Notify,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TargetProbe for GatedProbe {
        fn support(&self) -> PlatformSupport {
            PlatformSupport::Supported
        }
        async fn is_target_running(&self) -> Result<bool, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            Ok(true)
        }
    }

    #[tokio::test]
    async fn concurrent_waiters_share_one_probe() {
        let probe = Arc::new(GatedProbe {
            gate: tokio::sync::Notify::new(),
            calls: AtomicUsize::new(0),
        });
        let ctl = Arc::new(ActionController::new(
            probe.clone(),
            Arc::new(ScriptedDispatcher::default()),
            options(),
        ));

        let waiters: Vec<_> = (0..5)
            .map(|_| {
                let ctl = ctl.clone();
                tokio::spawn(async move { ctl.wait_for_initialization().await })
            })
            .collect();

        while probe.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        probe.gate.notify_one();

        for w in waiters {
            assert!(w.await.unwrap());
        }
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn queued_probe_reuses_in_flight_answer() {
        let probe = Arc::new(GatedProbe {
            gate: tokio::sync::Notify::new(),
            calls: AtomicUsize::new(0),
        });
        let ctl = Arc::new(ActionController::new(
            probe.clone(),
            Arc::new(ScriptedDispatcher::default()),
            options(),
        ));

        let first = {
            let ctl = ctl.clone();
            tokio::spawn(async move { ctl.probe_connection().await })
        };
        while probe.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        let second = {
            let ctl = ctl.clone();
            tokio::spawn(async move { ctl.probe_connection().await })
        };
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        probe.gate.notify_one();

        assert!(first.await.unwrap());
        assert!(second.await.unwrap());
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    struct HangingProbe;

    #[async_trait]
    impl TargetProbe for HangingProbe {
        fn support(&self) -> PlatformSupport {
            PlatformSupport::Supported
        }
        async fn is_target_running(&self) -> Result<bool, AppError> {
            std::future::pending::<()>().await;
            Ok(true)
        }
    }

    #[tokio::test]
    async fn probe_timeout_means_disconnected() {
        let ctl = ActionController::new(
            Arc::new(HangingProbe),
            Arc::new(ScriptedDispatcher::default()),
            ControllerOptions {
                probe_timeout: Duration::from_millis(20),
                ..options()
            },
        );
        assert!(!ctl.probe_connection().await);
        assert_eq!(ctl.connection_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn unsupported_platform_never_probes() {
        let probe = Arc::new(GatedProbe {
            gate: tokio::sync::Notify::new(),
            calls: AtomicUsize::new(0),
        });
        let ctl = ActionController::new(
            probe.clone(),
            Arc::new(ScriptedDispatcher::default()),
            ControllerOptions {
                backend_support: PlatformSupport::Unsupported {
                    platform: "plan9".into(),
                },
                ..options()
            },
        );
        assert!(!ctl.wait_for_initialization().await);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            ctl.ensure_supported().unwrap_err().to_string(),
            "Target control is not supported on plan9"
        );
        assert!(!ctl.system_info().supported);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_loop_picks_up_target_start() {
        let (ctl, probe) = controller(false, Arc::new(ScriptedDispatcher::default()));
        let ctl = Arc::new(ctl);
        let handle = spawn_refresh_loop(ctl.clone(), Duration::from_secs(5));

        let mut rx = ctl.subscribe();
        rx.wait_for(|s| s.is_known()).await.unwrap();
        assert!(!ctl.is_connected());

        probe.set_running(true);
        rx.wait_for(|s| s.is_connected()).await.unwrap();
        handle.abort();
    }

    /// Tracks how many actions are inside the dispatcher at once.
    #[derive(Default)]
    struct OverlapDispatcher {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl ActionDispatcher for OverlapDispatcher {
        async fn execute(&self, action: &Action) -> ActionResult {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            ActionResult::ok(format!("ok: {}", action.target))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_never_overlap_dispatch() {
        let dispatcher = Arc::new(OverlapDispatcher::default());
        let ctl = Arc::new(ActionController::new(
            Arc::new(SimulatedProbe::new(true)),
            dispatcher.clone(),
            options(),
        ));
        assert!(ctl.wait_for_initialization().await);

        let runs: Vec<_> = (0..4)
            .map(|_| {
                let ctl = ctl.clone();
                tokio::spawn(async move {
                    ctl.execute_all(&[
                        Action::keyboard("A", "a"),
                        Action::keyboard("B", "b"),
                        Action::keyboard("C", "c"),
                    ])
                    .await
                })
            })
            .collect();
        for run in runs {
            assert!(run.await.unwrap().iter().all(|r| r.success));
        }
        assert_eq!(dispatcher.max_in_flight.load(Ordering::SeqCst), 1);
    }
}
