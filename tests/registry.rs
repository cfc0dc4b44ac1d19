//! Command registry dispatch against a headless state.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use bitwig_assist::assistant::NoopEmitter;
use bitwig_assist::backend::{SimulatedBackend, SimulatedProbe};
use bitwig_assist::controller::{ActionController, ControllerOptions};
use bitwig_assist::error::AppError;
use bitwig_assist::executor::ActionExecutor;
use bitwig_assist::knowledge::KnowledgeBase;
use bitwig_assist::profile::{self, FavoriteKind, UserProfile};
use bitwig_assist::registry::execute::{execute, execute_async, run_named};
use bitwig_assist::registry::{Command, CommandResult};
use bitwig_assist::session::SessionStatus;
use bitwig_assist::settings::{AssistantSettings, PacingConfig};
use bitwig_assist::state::AppState;

fn state(dir: &tempfile::TempDir) -> Arc<AppState> {
    let pacing = PacingConfig::immediate();
    let executor = ActionExecutor::new(
        Arc::new(SimulatedBackend::default()),
        pacing,
        Duration::from_secs(5),
    );
    let controller = ActionController::new(
        Arc::new(SimulatedProbe::new(true)),
        Arc::new(executor),
        ControllerOptions {
            pacing,
            ..ControllerOptions::default()
        },
    );
    Arc::new(AppState::new(
        dir.path().to_path_buf(),
        AssistantSettings::default(),
        UserProfile::default(),
        Arc::new(KnowledgeBase::builtin().unwrap()),
        Arc::new(controller),
        Arc::new(NoopEmitter),
    ))
}

#[tokio::test]
async fn ask_then_execute_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir);

    let out = run_named(Arc::clone(&state), "ask", &json!({ "query": "automation" }))
        .await
        .unwrap();
    let CommandResult::Ask(reply) = out.result else {
        panic!("expected Ask result");
    };
    assert_eq!(reply.resolution.topic.as_deref(), Some("automation"));

    let out = run_named(
        Arc::clone(&state),
        "execute_message",
        &json!({ "message_id": reply.message_id }),
    )
    .await
    .unwrap();
    let CommandResult::ExecuteMessage(report) = out.result else {
        panic!("expected ExecuteMessage result");
    };
    assert_eq!(report.status, SessionStatus::Completed);
    assert_eq!(out.message, report.summary);

    let profile = state.profile.lock();
    assert_eq!(profile.recent_actions().count(), 1);
}

#[tokio::test]
async fn composite_by_name_with_params() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir);

    let out = run_named(
        Arc::clone(&state),
        "run_composite",
        &json!({ "operation": "set_track_volume", "track": 2, "volume": -3.5 }),
    )
    .await
    .unwrap();
    let CommandResult::RunComposite(report) = out.result else {
        panic!("expected RunComposite result");
    };
    assert!(report.result.success);
    assert_eq!(report.result.message, "Set parameter track_volume to -3.5");

    let out = run_named(Arc::clone(&state), "run_composite", &json!({ "operation": "undo" }))
        .await
        .unwrap();
    assert_eq!(out.message, "Undo performed");
}

#[tokio::test]
async fn unknown_commands_and_bad_params_are_validation_errors() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir);

    let err = run_named(Arc::clone(&state), "fly", &json!({})).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError { .. }));

    let err = run_named(Arc::clone(&state), "execute_message", &json!({ "id": 1 }))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError { .. }));

    let err = run_named(state, "execute_message", &json!({ "message_id": 999 }))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));
}

#[test]
fn sync_dispatch_rejects_async_commands() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir);
    let err = execute(&state, Command::Reconnect).unwrap_err();
    assert!(matches!(err, AppError::ApiError { .. }));

    let out = execute(&state, Command::ListTopics).unwrap();
    let CommandResult::ListTopics(topics) = out.result else {
        panic!("expected ListTopics result");
    };
    assert_eq!(topics.len(), 9);
    assert_eq!(topics[0].key, "create_project");
}

#[tokio::test]
async fn profile_commands_persist() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir);

    let out = execute_async(
        Arc::clone(&state),
        Command::from_tool_call("add_favorite", &json!({ "kind": "plugin", "name": "Serum" }))
            .unwrap(),
    )
    .await
    .unwrap();
    assert!(matches!(out.result, CommandResult::AddFavorite(true)));

    let again = run_named(
        Arc::clone(&state),
        "add_favorite",
        &json!({ "kind": "plugin", "name": "Serum" }),
    )
    .await
    .unwrap();
    assert!(matches!(again.result, CommandResult::AddFavorite(false)));

    let err = run_named(
        Arc::clone(&state),
        "add_favorite",
        &json!({ "kind": "device", "name": "  " }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::ValidationError { .. }));

    let on_disk = profile::load_profile(dir.path()).unwrap();
    assert_eq!(on_disk.favorites(FavoriteKind::Plugin), ["Serum"]);
    assert!(on_disk.favorites(FavoriteKind::Device).is_empty());
}

#[tokio::test]
async fn history_round_trip_through_clear() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir);

    run_named(Arc::clone(&state), "ask", &json!({ "query": "record midi" }))
        .await
        .unwrap();
    let out = execute(&state, Command::GetHistory).unwrap();
    let CommandResult::GetHistory(history) = out.result else {
        panic!("expected GetHistory result");
    };
    assert_eq!(history.len(), 3);

    execute(&state, Command::ClearHistory).unwrap();
    let out = execute(&state, Command::GetHistory).unwrap();
    let CommandResult::GetHistory(history) = out.result else {
        panic!("expected GetHistory result");
    };
    assert_eq!(history.len(), 1);
}
