use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::Serialize;

use crate::controller::ActionController;
use crate::error::AppError;
use crate::events;
use crate::knowledge::{IntentResolver, Resolution};
use crate::model::{ActionResult, ResponseBundle};
use crate::session::{CancelFlag, ExecutionSession, FailurePolicy, SessionStatus};

pub const GREETING: &str = "Hello! I'm your Bitwig Studio AI assistant. I can help you with:\n\n\
• Step-by-step tutorials\n\
• Technical recommendations\n\
• Workflow optimization\n\
• Troubleshooting\n\
• Advanced techniques\n\n\
What would you like to learn about Bitwig today?";

// ── AssistantEmitter trait ───────────────────────────────────────

/// Abstraction over event emission so the assistant works headless.
pub trait AssistantEmitter: Send + Sync {
    fn emit_message(&self, message: &TranscriptMessage);
    fn emit_action_result(&self, message_id: u64, result: &ActionResult);
    fn emit_session_status(&self, message_id: u64, status: SessionStatus);
    fn emit_cleared(&self);
}

/// No-op emitter for CLI/API use; results are returned in the response.
pub struct NoopEmitter;

impl AssistantEmitter for NoopEmitter {
    fn emit_message(&self, _message: &TranscriptMessage) {}
    fn emit_action_result(&self, _message_id: u64, _result: &ActionResult) {}
    fn emit_session_status(&self, _message_id: u64, _status: SessionStatus) {}
    fn emit_cleared(&self) {}
}

/// Emits every event as a tracing record under its event name.
pub struct LogEmitter;

impl AssistantEmitter for LogEmitter {
    fn emit_message(&self, message: &TranscriptMessage) {
        tracing::debug!(event = events::MESSAGE_ADDED, id = message.id, role = ?message.role);
    }
    fn emit_action_result(&self, message_id: u64, result: &ActionResult) {
        tracing::debug!(
            event = events::ACTION_RESULT,
            message_id,
            success = result.success,
            message = %result.message
        );
    }
    fn emit_session_status(&self, message_id: u64, status: SessionStatus) {
        tracing::debug!(event = events::SESSION_STATUS, message_id, %status);
    }
    fn emit_cleared(&self) {
        tracing::debug!(event = events::TRANSCRIPT_CLEARED);
    }
}

// ── Types ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Success/failure mark on a narrated execution outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranscriptMessage {
    pub id: u64,
    pub role: Role,
    pub text: String,
    /// Unix epoch milliseconds.
    pub timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle: Option<ResponseBundle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<ExecutionSession>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub id: u64,
    pub role: Role,
    pub text: String,
    pub can_execute: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SessionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
}

/// Reply to one query: the assistant message id plus the resolution.
#[derive(Debug, Clone, Serialize)]
pub struct AskReply {
    pub message_id: u64,
    #[serde(flatten)]
    pub resolution: Resolution,
}

/// What one message execution produced.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub message_id: u64,
    pub session_id: u64,
    pub status: SessionStatus,
    pub results: Vec<String>,
    pub outcomes: Vec<ActionResult>,
    pub summary: String,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

// ── Assistant ────────────────────────────────────────────────────

/// The in-memory transcript and the execution sessions attached to it.
pub struct Assistant {
    resolver: IntentResolver,
    emitter: Arc<dyn AssistantEmitter>,
    messages: Vec<TranscriptMessage>,
    next_id: u64,
    next_session_id: u64,
    /// Message currently executing and its cancellation handle.
    running: Option<(u64, CancelFlag)>,
}

impl Assistant {
    pub fn new(resolver: IntentResolver, emitter: Arc<dyn AssistantEmitter>) -> Self {
        let mut assistant = Self {
            resolver,
            emitter,
            messages: Vec::new(),
            next_id: 1,
            next_session_id: 1,
            running: None,
        };
        assistant.push(Role::Assistant, GREETING.to_string(), None, None);
        assistant
    }

    pub fn resolver(&self) -> &IntentResolver {
        &self.resolver
    }

    fn push(
        &mut self,
        role: Role,
        text: String,
        bundle: Option<ResponseBundle>,
        outcome: Option<Outcome>,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let message = TranscriptMessage {
            id,
            role,
            text,
            timestamp: now_millis(),
            bundle,
            session: None,
            outcome,
        };
        self.emitter.emit_message(&message);
        self.messages.push(message);
        id
    }

    /// Record the user's query and the canned reply. Never fails.
    pub fn ask(&mut self, query: &str) -> AskReply {
        let resolution = self.resolver.resolve_detailed(query);
        self.push(Role::User, query.to_string(), None, None);
        let message_id = self.push(
            Role::Assistant,
            resolution.bundle.answer.clone(),
            Some(resolution.bundle.clone()),
            None,
        );
        AskReply {
            message_id,
            resolution,
        }
    }

    pub fn message(&self, id: u64) -> Option<&TranscriptMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    fn message_mut(&mut self, id: u64) -> Result<&mut TranscriptMessage, AppError> {
        self.messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| AppError::NotFound {
                what: format!("Message {id}"),
            })
    }

    pub fn is_executing(&self) -> bool {
        self.running.is_some()
    }

    /// Open a fresh session for an executable assistant message. A terminal
    /// session on the same message is replaced; a running one is an error.
    pub fn begin_execution(
        &mut self,
        message_id: u64,
    ) -> Result<(ExecutionSession, CancelFlag), AppError> {
        if self.running.is_some() {
            return Err(AppError::AlreadyExecuting { message_id });
        }
        let session_id = self.next_session_id;
        let message = self.message_mut(message_id)?;
        let actions = match (&message.role, &message.bundle) {
            (Role::Assistant, Some(bundle)) if bundle.is_executable() => bundle.actions.clone(),
            _ => return Err(AppError::NotExecutable { message_id }),
        };

        let session = ExecutionSession::new(session_id, actions);
        message.session = Some(session.clone());
        self.next_session_id += 1;

        let cancel = CancelFlag::new();
        self.running = Some((message_id, cancel.clone()));
        self.emitter
            .emit_session_status(message_id, SessionStatus::Pending);
        Ok((session, cancel))
    }

    /// Move a freshly opened session to `executing` and show that on its
    /// message.
    pub fn start_execution(
        &mut self,
        message_id: u64,
        session: &mut ExecutionSession,
    ) -> Result<(), AppError> {
        session.start()?;
        if let Ok(message) = self.message_mut(message_id) {
            message.session = Some(session.clone());
        }
        self.emitter
            .emit_session_status(message_id, SessionStatus::Executing);
        Ok(())
    }

    /// Release the running slot, store the terminal session on its message
    /// and narrate the outcome. When the transcript was cleared mid-run the
    /// report is still returned but nothing is narrated.
    pub fn finish_execution(
        &mut self,
        message_id: u64,
        session: ExecutionSession,
    ) -> ExecutionReport {
        if self.running.as_ref().map(|(id, _)| *id) == Some(message_id) {
            self.running = None;
        }
        let status = session.status();
        let summary = session
            .results()
            .last()
            .cloned()
            .unwrap_or_else(|| session.summary());
        let report = ExecutionReport {
            message_id,
            session_id: session.id,
            status,
            results: session.results().to_vec(),
            outcomes: session.outcomes().to_vec(),
            summary: summary.clone(),
        };

        for result in session.outcomes() {
            self.emitter.emit_action_result(message_id, result);
        }
        self.emitter.emit_session_status(message_id, status);
        match self.message_mut(message_id) {
            Ok(message) => message.session = Some(session),
            Err(_) => {
                tracing::debug!(message_id, %status, "Transcript cleared during execution");
                return report;
            }
        }

        let all_ok = status == SessionStatus::Completed
            && report.outcomes.iter().all(|r| r.success);
        let outcome = if all_ok {
            Outcome::Success
        } else {
            Outcome::Failure
        };
        let mut narration = report.results.join("\n");
        if narration.is_empty() {
            narration = summary;
        }
        self.push(Role::Assistant, narration, None, Some(outcome));
        report
    }

    /// Ask the running session, if any, to stop before its next action.
    /// Returns whether there was anything to cancel.
    pub fn cancel(&mut self) -> bool {
        match &self.running {
            Some((message_id, flag)) => {
                tracing::info!(message_id, "Cancellation requested");
                flag.cancel();
                true
            }
            None => false,
        }
    }

    pub fn history_for_display(&self) -> Vec<HistoryEntry> {
        self.messages
            .iter()
            .map(|m| HistoryEntry {
                id: m.id,
                role: m.role,
                text: m.text.clone(),
                can_execute: m.bundle.as_ref().is_some_and(ResponseBundle::is_executable),
                status: m.session.as_ref().map(ExecutionSession::status),
                outcome: m.outcome,
            })
            .collect()
    }

    pub fn messages(&self) -> &[TranscriptMessage] {
        &self.messages
    }

    /// Back to just the greeting. Ids keep counting so stale ids stay invalid.
    /// A running session is cancelled but keeps the running slot until it
    /// finishes, so no second session can start alongside it.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.cancel();
        self.emitter.emit_cleared();
        self.push(Role::Assistant, GREETING.to_string(), None, None);
    }

    pub fn last_assistant_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.text.as_str())
    }
}

/// Execute the actions of one assistant message end to end.
///
/// The transcript lock is only held to open and close the session, never
/// across an await, so queries and cancellation stay responsive while the
/// run is in progress.
pub async fn execute_message(
    assistant: &Mutex<Assistant>,
    controller: &ActionController,
    message_id: u64,
    policy: FailurePolicy,
) -> Result<ExecutionReport, AppError> {
    let (mut session, cancel) = assistant.lock().begin_execution(message_id)?;
    controller.wait_for_initialization().await;
    if let Err(e) = assistant.lock().start_execution(message_id, &mut session) {
        tracing::warn!(error = %e, message_id, "Could not start session");
    }
    let run = session.run(controller, policy, &cancel).await;
    if let Err(e) = run {
        // Unreachable for a fresh session, but never leave the message stuck.
        tracing::error!(error = %e, message_id, "Session run failed");
        if !session.status().is_terminal() {
            if let Err(e) = session.fail(e.to_string()) {
                tracing::warn!(error = %e, message_id, "Could not mark session failed");
            }
        }
    }
    Ok(assistant.lock().finish_execution(message_id, session))
}
