//! Lifecycle of one executed action list.
//!
//! `pending → executing → completed | failed`, each step at most once. A
//! terminal session is never reused; retrying means a fresh session.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::controller::ActionController;
use crate::error::AppError;
use crate::model::{Action, ActionResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Executing,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Failed)
    }

    fn can_become(self, next: SessionStatus) -> bool {
        matches!(
            (self, next),
            (SessionStatus::Pending, SessionStatus::Executing)
                | (SessionStatus::Executing, SessionStatus::Completed)
                | (SessionStatus::Executing, SessionStatus::Failed)
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Executing => "executing",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
        })
    }
}

/// What a failed action does to the rest of the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Attempt every action; the session completes with a tally.
    #[default]
    Continue,
    /// The first failure ends the session as failed.
    StopOnFailure,
}

/// Cooperative cancellation, checked between actions.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub const CANCELLED_MESSAGE: &str = "Execution cancelled";

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionSession {
    pub id: u64,
    pub actions: Vec<Action>,
    status: SessionStatus,
    /// One line per attempted action, plus the closing line once terminal.
    results: Vec<String>,
    outcomes: Vec<ActionResult>,
}

impl ExecutionSession {
    pub fn new(id: u64, actions: Vec<Action>) -> Self {
        Self {
            id,
            actions,
            status: SessionStatus::Pending,
            results: Vec::new(),
            outcomes: Vec::new(),
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn results(&self) -> &[String] {
        &self.results
    }

    pub fn outcomes(&self) -> &[ActionResult] {
        &self.outcomes
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|r| r.success).count()
    }

    fn transition(&mut self, next: SessionStatus) -> Result<(), AppError> {
        if !self.status.can_become(next) {
            return Err(AppError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        tracing::info!(session = self.id, from = %self.status, to = %next, "Session transition");
        self.status = next;
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), AppError> {
        self.transition(SessionStatus::Executing)
    }

    pub fn record(&mut self, result: ActionResult) -> Result<(), AppError> {
        if self.status != SessionStatus::Executing {
            return Err(AppError::InvalidTransition {
                from: self.status.to_string(),
                to: "record".to_string(),
            });
        }
        self.results.push(result.message.clone());
        self.outcomes.push(result);
        Ok(())
    }

    pub fn complete(&mut self) -> Result<(), AppError> {
        self.transition(SessionStatus::Completed)?;
        let line = self.summary();
        self.results.push(line);
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), AppError> {
        self.transition(SessionStatus::Failed)?;
        self.results.push(reason.into());
        Ok(())
    }

    /// "Executed N of M actions successfully."
    pub fn summary(&self) -> String {
        format!(
            "Executed {} of {} actions successfully.",
            self.succeeded(),
            self.actions.len()
        )
    }

    /// Drive the controller through this session's actions in order.
    ///
    /// Starts the session if it is still pending. Cancellation is honored
    /// between actions, never mid-dispatch. Returns the terminal status.
    pub async fn run(
        &mut self,
        controller: &ActionController,
        policy: FailurePolicy,
        cancel: &CancelFlag,
    ) -> Result<SessionStatus, AppError> {
        if self.status == SessionStatus::Pending {
            self.start()?;
        }
        let actions = self.actions.clone();
        for (i, action) in actions.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(session = self.id, at = i, "Session cancelled");
                self.fail(CANCELLED_MESSAGE)?;
                return Ok(self.status);
            }
            if i > 0 {
                controller.pause_between_actions().await;
            }
            let result = controller.execute_action(action).await;
            let failed = !result.success;
            self.record(result)?;
            if failed && policy == FailurePolicy::StopOnFailure {
                let reason = format!(
                    "Stopped after action {} of {} failed.",
                    i + 1,
                    self.actions.len()
                );
                self.fail(reason)?;
                return Ok(self.status);
            }
        }
        self.complete()?;
        Ok(self.status)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn transitions_are_monotonic() {
        let mut s = ExecutionSession::new(1, vec![]);
        assert!(s.complete().is_err());
        s.start().unwrap();
        assert!(s.start().is_err());
        s.fail("boom").unwrap();
        assert_eq!(s.status(), SessionStatus::Failed);

        let err = s.complete().unwrap_err();
        assert_eq!(
            err,
            AppError::InvalidTransition {
                from: "failed".into(),
                to: "completed".into()
            }
        );
        assert!(s.record(ActionResult::ok("late")).is_err());
    }

    #[test]
    fn summary_counts_successes() {
        let mut s = ExecutionSession::new(
            7,
            vec![
                Action::keyboard("A", "a"),
                Action::keyboard("B", "b"),
                Action::keyboard("C", "c"),
            ],
        );
        s.start().unwrap();
        s.record(ActionResult::ok("a")).unwrap();
        s.record(ActionResult::failed("b")).unwrap();
        s.record(ActionResult::ok("c")).unwrap();
        s.complete().unwrap();
        assert_eq!(s.results().len(), 4);
        assert_eq!(s.results()[3], "Executed 2 of 3 actions successfully.");
    }

    use crate::backend::SimulatedProbe;
    use crate::controller::ControllerOptions;
    use crate::executor::ActionDispatcher;
    use crate::settings::PacingConfig;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Cancels the session's flag as soon as it dispatches its first action.
    struct CancellingDispatcher {
        cancel: CancelFlag,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ActionDispatcher for CancellingDispatcher {
        async fn execute(&self, action: &Action) -> ActionResult {
            self.seen.lock().push(action.target.clone());
            self.cancel.cancel();
            ActionResult::ok(format!("ok: {}", action.target))
        }
    }

    #[tokio::test]
    async fn cancel_between_actions_fails_the_session() {
        let cancel = CancelFlag::new();
        let dispatcher = Arc::new(CancellingDispatcher {
            cancel: cancel.clone(),
            seen: Mutex::new(Vec::new()),
        });
        let controller = ActionController::new(
            Arc::new(SimulatedProbe::new(true)),
            dispatcher.clone(),
            ControllerOptions {
                pacing: PacingConfig::immediate(),
                ..ControllerOptions::default()
            },
        );
        assert!(controller.wait_for_initialization().await);

        let mut s = ExecutionSession::new(
            3,
            vec![
                Action::keyboard("A", "first"),
                Action::keyboard("B", "second"),
                Action::keyboard("C", "third"),
            ],
        );
        let status = s
            .run(&controller, FailurePolicy::Continue, &cancel)
            .await
            .unwrap();

        assert_eq!(status, SessionStatus::Failed);
        assert_eq!(s.status(), SessionStatus::Failed);
        assert_eq!(dispatcher.seen.lock().len(), 1);
        assert_eq!(s.outcomes().len(), 1);
        assert_eq!(s.results().last().map(String::as_str), Some(CANCELLED_MESSAGE));
    }

    #[test]
    fn cancel_flag_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let other = flag.clone();
        other.cancel();
        assert!(flag.is_cancelled());
    }
}
