use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::backend::{self, PlatformSupport};
use crate::controller::CompositeOperation;
use crate::error::AppError;
use crate::registry::execute::{execute_async, run_named};
use crate::registry::params::{AskParams, ExecuteActionsParams, ExecuteMessageParams};
use crate::registry::{catalog, Command, CommandOutput, CommandResult};
use crate::session::FailurePolicy;
use crate::state::AppState;

// ── Response types ───────────────────────────────────────────────

#[derive(Serialize)]
struct ApiOk<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Serialize)]
struct ApiErr {
    ok: bool,
    error: AppError,
    message: String,
}

fn ok_json<T: Serialize>(data: T) -> Response {
    Json(ApiOk { ok: true, data }).into_response()
}

fn status_for(e: &AppError) -> StatusCode {
    match e {
        AppError::NotFound { .. } => StatusCode::NOT_FOUND,
        AppError::ValidationError { .. } | AppError::NotExecutable { .. } => {
            StatusCode::BAD_REQUEST
        }
        AppError::AlreadyExecuting { .. } | AppError::InvalidTransition { .. } => {
            StatusCode::CONFLICT
        }
        AppError::UnsupportedPlatform { .. } => StatusCode::NOT_IMPLEMENTED,
        AppError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn err_json(e: AppError) -> Response {
    let status = status_for(&e);
    let message = e.to_string();
    (
        status,
        Json(ApiErr {
            ok: false,
            error: e,
            message,
        }),
    )
        .into_response()
}

/// Command output as sent over the wire: the human-readable `message` plus
/// the typed `result`, discriminated by `command`.
#[derive(Serialize)]
pub struct CommandResponse {
    pub message: String,
    pub result: CommandResult,
}

impl From<CommandOutput> for CommandResponse {
    fn from(output: CommandOutput) -> Self {
        Self {
            message: output.message,
            result: output.result,
        }
    }
}

fn respond(out: Result<CommandOutput, AppError>) -> Response {
    match out {
        Ok(output) => ok_json(CommandResponse::from(output)),
        Err(e) => err_json(e),
    }
}

/// An empty body reads as `T::default()`.
fn parse_optional_body<T>(body: &[u8]) -> Result<T, AppError>
where
    T: serde::de::DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::ValidationError {
        message: format!("Invalid request body: {e}"),
    })
}

async fn run(state: Arc<AppState>, cmd: Command) -> Response {
    respond(execute_async(state, cmd).await)
}

// ── Handlers ─────────────────────────────────────────────────────

async fn post_query(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<AskParams>,
) -> Response {
    run(state, Command::Ask(body)).await
}

async fn post_execute(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<ExecuteActionsParams>,
) -> Response {
    run(state, Command::ExecuteActions(body)).await
}

#[derive(Debug, Default, Deserialize)]
struct ExecuteMessageBody {
    #[serde(default)]
    policy: FailurePolicy,
}

async fn post_execute_message(
    Extension(state): Extension<Arc<AppState>>,
    Path(message_id): Path<u64>,
    body: Bytes,
) -> Response {
    let policy = match parse_optional_body::<ExecuteMessageBody>(&body) {
        Ok(b) => b.policy,
        Err(e) => return err_json(e),
    };
    run(
        state,
        Command::ExecuteMessage(ExecuteMessageParams { message_id, policy }),
    )
    .await
}

async fn post_composite(
    Extension(state): Extension<Arc<AppState>>,
    Json(op): Json<CompositeOperation>,
) -> Response {
    run(state, Command::RunComposite(op)).await
}

async fn get_status(Extension(state): Extension<Arc<AppState>>) -> Response {
    ok_json(state.controller.system_info())
}

async fn post_reconnect(Extension(state): Extension<Arc<AppState>>) -> Response {
    run(state, Command::Reconnect).await
}

/// Process status in the shape remote `HttpStatusProbe`s read.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TargetStatus {
    is_running: bool,
    platform: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn get_check_target(Extension(state): Extension<Arc<AppState>>) -> Response {
    let platform = backend::current_platform();
    let status = match state.controller.platform_support() {
        PlatformSupport::Unsupported { platform: p } => TargetStatus {
            is_running: false,
            platform,
            error: Some(AppError::UnsupportedPlatform { platform: p }.to_string()),
        },
        PlatformSupport::Supported => TargetStatus {
            is_running: state.controller.probe_connection().await,
            platform,
            error: None,
        },
    };
    Json(status).into_response()
}

async fn get_history(Extension(state): Extension<Arc<AppState>>) -> Response {
    run(state, Command::GetHistory).await
}

async fn get_commands() -> Response {
    ok_json(catalog::to_json_schema())
}

async fn post_command(
    Extension(state): Extension<Arc<AppState>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Response {
    let params = match parse_optional_body::<Value>(&body) {
        Ok(Value::Null) => serde_json::json!({}),
        Ok(v) => v,
        Err(e) => return err_json(e),
    };
    respond(run_named(state, &name, &params).await)
}

// ── Server startup ───────────────────────────────────────────────

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/query", post(post_query))
        .route("/api/execute", post(post_execute))
        .route("/api/messages/{id}/execute", post(post_execute_message))
        .route("/api/composite", post(post_composite))
        .route("/api/status", get(get_status))
        .route("/api/reconnect", post(post_reconnect))
        .route("/api/check-target", get(get_check_target))
        .route("/api/history", get(get_history))
        .route("/api/commands", get(get_commands))
        .route("/api/commands/{name}", post(post_command))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(Extension(state))
}

/// Start the HTTP API on `127.0.0.1:port` (0 picks a free port). Returns
/// the bound port.
pub async fn start_api_server(state: Arc<AppState>, port: u16) -> Result<u16, AppError> {
    let app = router(Arc::clone(&state));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::ApiError {
            message: format!("Failed to bind API server: {e}"),
        })?;
    let port = listener
        .local_addr()
        .map_err(|e| AppError::ApiError {
            message: format!("Failed to get API server port: {e}"),
        })?
        .port();
    state
        .api_port
        .store(port, std::sync::atomic::Ordering::Relaxed);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "API server error");
        }
    });

    tracing::info!(port, "API server listening");
    Ok(port)
}
