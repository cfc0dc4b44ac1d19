use std::path::{Path, PathBuf};
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::store::{read_json, write_json, StoreError};

// ── Target application ───────────────────────────────────────────

/// Identity of the application the assistant drives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TargetConfig {
    /// Name shown to the user in advisory messages.
    pub display_name: String,
    /// Executable image name the process probe looks for.
    pub process_name: String,
    /// Window title the backend focuses before injecting input.
    pub window_title: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            display_name: "Bitwig Studio".to_string(),
            process_name: "Bitwig Studio.exe".to_string(),
            window_title: "Bitwig Studio".to_string(),
        }
    }
}

// ── Collaborators ────────────────────────────────────────────────

/// Which input backend the executor drives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    Simulated {
        #[serde(default)]
        latency_ms: u64,
    },
    /// External automation program, invoked once per input event.
    Command {
        program: PathBuf,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Simulated { latency_ms: 50 }
    }
}

/// How the controller decides whether the target is running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeConfig {
    Tasklist,
    Http { url: String },
    Simulated {
        #[serde(default)]
        running: bool,
    },
}

impl Default for ProbeConfig {
    fn default() -> Self {
        if cfg!(target_os = "windows") {
            ProbeConfig::Tasklist
        } else {
            ProbeConfig::Simulated { running: true }
        }
    }
}

// ── Pacing and timeouts ──────────────────────────────────────────

/// Artificial delays between injected inputs, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PacingConfig {
    /// Between actions of a plain action list.
    pub action_pause_ms: u64,
    /// Between actions of a composite operation.
    pub composite_pause_ms: u64,
    /// After focusing the target window.
    pub focus_settle_ms: u64,
    /// After opening the device browser.
    pub device_browser_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            action_pause_ms: 500,
            composite_pause_ms: 200,
            focus_settle_ms: 100,
            device_browser_ms: 500,
        }
    }
}

impl PacingConfig {
    /// No delays at all. Tests and scripted runs use this.
    pub const fn immediate() -> Self {
        Self {
            action_pause_ms: 0,
            composite_pause_ms: 0,
            focus_settle_ms: 0,
            device_browser_ms: 0,
        }
    }

    pub fn action_pause(&self) -> Duration {
        Duration::from_millis(self.action_pause_ms)
    }

    pub fn composite_pause(&self) -> Duration {
        Duration::from_millis(self.composite_pause_ms)
    }

    pub fn focus_settle(&self) -> Duration {
        Duration::from_millis(self.focus_settle_ms)
    }

    pub fn device_browser(&self) -> Duration {
        Duration::from_millis(self.device_browser_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TimeoutConfig {
    pub probe_ms: u64,
    pub dispatch_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            probe_ms: 5_000,
            dispatch_ms: 10_000,
        }
    }
}

impl TimeoutConfig {
    pub fn probe(&self) -> Duration {
        Duration::from_millis(self.probe_ms)
    }

    pub fn dispatch(&self) -> Duration {
        Duration::from_millis(self.dispatch_ms)
    }
}

// ── App settings ─────────────────────────────────────────────────

/// Application-level settings stored in the config directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AssistantSettings {
    pub version: u32,
    pub target: TargetConfig,
    pub backend: BackendConfig,
    pub probe: ProbeConfig,
    pub pacing: PacingConfig,
    pub timeouts: TimeoutConfig,
    /// Seconds between background connection probes. 0 disables polling.
    pub poll_interval_secs: u64,
    /// Substitute knowledge table. None = the built-in one.
    pub knowledge_path: Option<PathBuf>,
    /// HTTP API port. 0 = pick a free port.
    pub server_port: u16,
}

const SETTINGS_VERSION: u32 = 1;

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            target: TargetConfig::default(),
            backend: BackendConfig::default(),
            probe: ProbeConfig::default(),
            pacing: PacingConfig::default(),
            timeouts: TimeoutConfig::default(),
            poll_interval_secs: 5,
            knowledge_path: None,
            server_port: 0,
        }
    }
}

impl AssistantSettings {
    pub fn poll_interval(&self) -> Option<Duration> {
        (self.poll_interval_secs > 0).then(|| Duration::from_secs(self.poll_interval_secs))
    }
}

/// Load settings from the config directory. A missing file yields defaults;
/// a malformed one is reported so the user's edits are not silently lost.
pub fn load_settings(app_config_dir: &Path) -> Result<AssistantSettings, AppError> {
    let path = crate::paths::settings_path(app_config_dir);
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No settings file; using defaults");
        return Ok(AssistantSettings::default());
    }
    let settings = read_json::<AssistantSettings>(&path)?;
    tracing::info!(path = %path.display(), "Loaded settings");
    Ok(settings)
}

/// Save settings to the config directory.
pub fn save_settings(app_config_dir: &Path, settings: &AssistantSettings) -> Result<(), AppError> {
    let save = || -> Result<(), StoreError> {
        std::fs::create_dir_all(app_config_dir)?;
        write_json(&crate::paths::settings_path(app_config_dir), settings)
    };
    save().map_err(|e| AppError::SettingsSaveError {
        message: e.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn settings_round_trip() {
        let dir = tempfile::tempdir().unwrap();

        let settings = AssistantSettings {
            backend: BackendConfig::Command {
                program: PathBuf::from("/usr/local/bin/inject"),
                args: vec!["--display".into(), ":0".into()],
            },
            probe: ProbeConfig::Http {
                url: "http://127.0.0.1:3000/api/check-target".into(),
            },
            poll_interval_secs: 0,
            ..AssistantSettings::default()
        };
        save_settings(dir.path(), &settings).unwrap();

        let loaded = load_settings(dir.path()).unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.poll_interval(), None);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_settings(&dir.path().join("nowhere")).unwrap();
        assert_eq!(loaded.target.display_name, "Bitwig Studio");
        assert_eq!(loaded.pacing.action_pause_ms, 500);
        assert_eq!(loaded.pacing.composite_pause_ms, 200);
        assert_eq!(loaded.timeouts.probe_ms, 5_000);
        assert_eq!(loaded.poll_interval(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            crate::paths::settings_path(dir.path()),
            r#"{ "pacing": { "action_pause_ms": 0 }, "probe": { "kind": "simulated" } }"#,
        )
        .unwrap();

        let loaded = load_settings(dir.path()).unwrap();
        assert_eq!(loaded.pacing.action_pause_ms, 0);
        assert_eq!(loaded.pacing.focus_settle_ms, 100);
        assert_eq!(loaded.probe, ProbeConfig::Simulated { running: false });
        assert_eq!(loaded.target.process_name, "Bitwig Studio.exe");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(crate::paths::settings_path(dir.path()), "{ not json").unwrap();
        assert!(load_settings(dir.path()).is_err());
    }
}
