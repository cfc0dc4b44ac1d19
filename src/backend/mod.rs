//! Pluggable capabilities the controller depends on: an input backend that
//! injects pointer and keyboard input into the target, and a probe that says
//! whether the target process is running.
//!
//! Implementations are chosen once at construction from settings.

pub mod command;
pub mod probe;
pub mod simulated;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::model::Point;
use crate::settings::{AssistantSettings, BackendConfig, ProbeConfig};

pub use command::CommandBackend;
pub use probe::{HttpStatusProbe, TasklistProbe};
pub use simulated::{InputEvent, SimulatedBackend, SimulatedProbe};

// ── Platform capability ──────────────────────────────────────────

/// Whether a capability can work on the current platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlatformSupport {
    Supported,
    Unsupported { platform: String },
}

impl PlatformSupport {
    /// `Unsupported` tagged with the OS we are running on.
    pub fn unsupported_here() -> Self {
        PlatformSupport::Unsupported {
            platform: current_platform().to_string(),
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, PlatformSupport::Supported)
    }

    /// Turn the capability into a typed error the caller must handle.
    pub fn ensure(&self) -> Result<(), AppError> {
        match self {
            PlatformSupport::Supported => Ok(()),
            PlatformSupport::Unsupported { platform } => Err(AppError::UnsupportedPlatform {
                platform: platform.clone(),
            }),
        }
    }

    /// Both capabilities must be supported; the first refusal wins.
    pub fn and(self, other: PlatformSupport) -> PlatformSupport {
        match self {
            PlatformSupport::Supported => other,
            unsupported @ PlatformSupport::Unsupported { .. } => unsupported,
        }
    }
}

pub fn current_platform() -> &'static str {
    std::env::consts::OS
}

// ── Traits ───────────────────────────────────────────────────────

/// Injects input into the target application.
///
/// `Ok(false)` means the backend ran but the target refused the input (e.g.
/// the window could not be focused). `Err` is reserved for unexpected faults.
#[async_trait]
pub trait InputBackend: Send + Sync {
    fn name(&self) -> &'static str;
    fn support(&self) -> PlatformSupport;
    async fn focus_target(&self) -> Result<bool, AppError>;
    async fn click(&self, at: Point) -> Result<bool, AppError>;
    async fn drag(&self, from: Point, to: Point) -> Result<bool, AppError>;
    async fn send_keys(&self, combo: &str) -> Result<bool, AppError>;
}

/// Reports whether the target application is running.
#[async_trait]
pub trait TargetProbe: Send + Sync {
    fn support(&self) -> PlatformSupport;
    async fn is_target_running(&self) -> Result<bool, AppError>;
}

// ── Construction from settings ───────────────────────────────────

pub fn backend_from_settings(settings: &AssistantSettings) -> Arc<dyn InputBackend> {
    match &settings.backend {
        BackendConfig::Simulated { latency_ms } => Arc::new(SimulatedBackend::new(
            std::time::Duration::from_millis(*latency_ms),
        )),
        BackendConfig::Command { program, args } => Arc::new(CommandBackend::new(
            program.clone(),
            args.clone(),
            settings.target.window_title.clone(),
        )),
    }
}

pub fn probe_from_settings(settings: &AssistantSettings) -> Arc<dyn TargetProbe> {
    match &settings.probe {
        ProbeConfig::Tasklist => Arc::new(TasklistProbe::new(settings.target.process_name.clone())),
        ProbeConfig::Http { url } => Arc::new(HttpStatusProbe::new(url.clone())),
        ProbeConfig::Simulated { running } => Arc::new(SimulatedProbe::new(*running)),
    }
}
