use std::path::PathBuf;
use std::sync::atomic::AtomicU16;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::assistant::{Assistant, AssistantEmitter, LogEmitter};
use crate::controller::ActionController;
use crate::error::AppError;
use crate::knowledge::{IntentResolver, KnowledgeBase};
use crate::profile::{self, UserProfile};
use crate::settings::{self, AssistantSettings};

// ── Application State ──────────────────────────────────────────────

/// Application state shared by the registry, the HTTP API and the CLI.
pub struct AppState {
    pub resolver: IntentResolver,
    pub controller: Arc<ActionController>,
    pub assistant: Mutex<Assistant>,
    pub settings: Mutex<AssistantSettings>,
    pub profile: Mutex<UserProfile>,
    pub app_config_dir: PathBuf,
    /// Port the HTTP API is listening on (0 = not running).
    pub api_port: AtomicU16,
}

impl AppState {
    pub fn new(
        app_config_dir: PathBuf,
        settings: AssistantSettings,
        profile: UserProfile,
        knowledge: Arc<KnowledgeBase>,
        controller: Arc<ActionController>,
        emitter: Arc<dyn AssistantEmitter>,
    ) -> Self {
        let resolver = IntentResolver::new(knowledge);
        Self {
            assistant: Mutex::new(Assistant::new(resolver.clone(), emitter)),
            resolver,
            controller,
            settings: Mutex::new(settings),
            profile: Mutex::new(profile),
            app_config_dir,
            api_port: AtomicU16::new(0),
        }
    }

    /// Load settings, profile and knowledge from `app_config_dir` and wire
    /// the controller the settings describe.
    pub fn load(app_config_dir: PathBuf) -> Result<Self, AppError> {
        let settings = settings::load_settings(&app_config_dir)?;
        let profile = profile::load_profile(&app_config_dir)?;
        let knowledge = KnowledgeBase::load(settings.knowledge_path.as_deref())?;
        tracing::info!(
            topics = knowledge.len(),
            keywords = knowledge.keywords().len(),
            "Knowledge base loaded"
        );
        let controller = Arc::new(ActionController::from_settings(&settings));
        Ok(Self::new(
            app_config_dir,
            settings,
            profile,
            Arc::new(knowledge),
            controller,
            Arc::new(LogEmitter),
        ))
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        self.resolver.knowledge()
    }

    /// Read-only access to the transcript. Locks for the duration of `f`.
    pub fn with_assistant<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Assistant) -> R,
    {
        let guard = self.assistant.lock();
        f(&guard)
    }

    /// Mutating access to the transcript.
    pub fn with_assistant_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Assistant) -> R,
    {
        let mut guard = self.assistant.lock();
        f(&mut guard)
    }

    /// Mutate the profile and persist it. Nothing changes in memory when the
    /// closure or the save fails.
    pub fn update_profile<F, R>(&self, f: F) -> Result<R, AppError>
    where
        F: FnOnce(&mut UserProfile) -> Result<R, AppError>,
    {
        let mut guard = self.profile.lock();
        let mut draft = guard.clone();
        let out = f(&mut draft)?;
        profile::save_profile(&self.app_config_dir, &draft)?;
        *guard = draft;
        Ok(out)
    }
}
