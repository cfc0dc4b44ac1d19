use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;

use bitwig_assist::controller::CompositeOperation;
use bitwig_assist::error::AppError;
use bitwig_assist::logging;
use bitwig_assist::paths;
use bitwig_assist::profile::{FavoriteKind, Preferences, Theme};
use bitwig_assist::registry::execute::{execute_async, run_named};
use bitwig_assist::registry::params::{
    AddFavoriteParams, AskParams, ExecuteActionsParams, ExecuteMessageParams, HelpParams,
    SetPluginFoldersParams,
};
use bitwig_assist::registry::{Command, CommandOutput, CommandResult};
use bitwig_assist::session::FailurePolicy;
use bitwig_assist::state::AppState;

// ── CLI argument parsing ─────────────────────────────────────────

#[derive(Parser)]
#[command(name = "bitwig-assist-cli", about = "Bitwig Studio assistant (headless)", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config directory override
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Output raw JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question
    Ask {
        query: String,
        /// Execute the reply's actions when it has any
        #[arg(long)]
        execute: bool,
        /// Stop at the first failed action
        #[arg(long)]
        stop_on_failure: bool,
    },
    /// List knowledge topics
    Topics,
    /// Execute actions from a JSON array (inline or from a file)
    Run {
        /// JSON array of actions
        #[arg(long, conflicts_with = "file")]
        actions: Option<String>,
        /// File holding a JSON array of actions
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Run a composite operation, or list them when no name is given
    Composite {
        /// Operation name (e.g. "play_stop", "set_track_volume")
        name: Option<String>,
        #[arg(long)]
        track: Option<u32>,
        #[arg(long, allow_hyphen_values = true)]
        volume: Option<f64>,
    },
    /// Probe the target and show platform info
    Status,
    /// Reset the connection state and probe again
    Reconnect,
    /// User profile
    Profile {
        #[command(subcommand)]
        action: Option<ProfileAction>,
    },
    /// Show application settings
    Settings,
    /// List commands: categories, one category, or one command's params
    Describe { topic: Option<String> },
    /// Run any registry command by name with JSON params
    Call {
        name: String,
        #[arg(default_value = "{}")]
        params: String,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Add a favorite plugin, device or template
    AddFavorite {
        #[arg(value_enum)]
        kind: KindArg,
        name: String,
    },
    /// Replace the plugin folder list
    SetFolders { folders: Vec<String> },
    /// Set theme and suggestions
    SetPreferences {
        #[arg(long, value_enum)]
        theme: ThemeArg,
        #[arg(long)]
        no_suggestions: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Plugin,
    Device,
    Template,
}

impl From<KindArg> for FavoriteKind {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::Plugin => FavoriteKind::Plugin,
            KindArg::Device => FavoriteKind::Device,
            KindArg::Template => FavoriteKind::Template,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ThemeArg {
    Dark,
    Light,
}

// ── Command building ─────────────────────────────────────────────

fn parse_actions(actions: Option<&str>, file: Option<&PathBuf>) -> Result<ExecuteActionsParams, AppError> {
    let text = match (actions, file) {
        (Some(inline), _) => inline.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => {
            return Err(AppError::ValidationError {
                message: "Provide --actions or --file".to_string(),
            })
        }
    };
    let value: Value = serde_json::from_str(&text).map_err(|e| AppError::ValidationError {
        message: format!("Invalid actions JSON: {e}"),
    })?;
    // Accept a bare array or a full `{ "actions": [...] }` object.
    let value = if value.is_array() {
        serde_json::json!({ "actions": value })
    } else {
        value
    };
    serde_json::from_value(value).map_err(|e| AppError::ValidationError {
        message: format!("Invalid actions: {e}"),
    })
}

fn parse_composite(name: &str, track: Option<u32>, volume: Option<f64>) -> Result<CompositeOperation, AppError> {
    let mut json = serde_json::json!({ "operation": name });
    if let Some(track) = track {
        json["track"] = track.into();
    }
    if let Some(volume) = volume {
        json["volume"] = volume.into();
    }
    serde_json::from_value(json).map_err(|e| AppError::ValidationError {
        message: format!("Invalid composite '{name}': {e}"),
    })
}

fn build_command(cmd: &Commands) -> Result<Command, AppError> {
    Ok(match cmd {
        Commands::Ask { query, .. } => Command::Ask(AskParams {
            query: query.clone(),
        }),
        Commands::Topics => Command::ListTopics,
        Commands::Run { actions, file } => {
            Command::ExecuteActions(parse_actions(actions.as_deref(), file.as_ref())?)
        }
        Commands::Composite { name: None, .. } => Command::ListComposites,
        Commands::Composite {
            name: Some(name),
            track,
            volume,
        } => Command::RunComposite(parse_composite(name, *track, *volume)?),
        Commands::Status => Command::CheckConnection,
        Commands::Reconnect => Command::Reconnect,
        Commands::Profile { action: None } => Command::GetProfile,
        Commands::Profile {
            action: Some(ProfileAction::AddFavorite { kind, name }),
        } => Command::AddFavorite(AddFavoriteParams {
            kind: (*kind).into(),
            name: name.clone(),
        }),
        Commands::Profile {
            action: Some(ProfileAction::SetFolders { folders }),
        } => Command::SetPluginFolders(SetPluginFoldersParams {
            folders: folders.clone(),
        }),
        Commands::Profile {
            action:
                Some(ProfileAction::SetPreferences {
                    theme,
                    no_suggestions,
                }),
        } => Command::SetPreferences(Preferences {
            theme: match theme {
                ThemeArg::Dark => Theme::Dark,
                ThemeArg::Light => Theme::Light,
            },
            show_suggestions: !no_suggestions,
        }),
        Commands::Settings => Command::GetSettings,
        Commands::Describe { topic } => Command::Help(HelpParams {
            topic: topic.clone(),
        }),
        // Handled by `run_named` before this is called.
        Commands::Call { name, .. } => {
            return Err(AppError::ValidationError {
                message: format!("'{name}' must be dispatched by name"),
            })
        }
    })
}

// ── Output formatting ────────────────────────────────────────────

fn print_output(output: &CommandOutput, raw_json: bool) {
    if raw_json {
        let json = serde_json::json!({
            "message": output.message,
            "result": output.result,
        });
        println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        return;
    }

    println!("{}", output.message);

    match &output.result {
        // The message already is the data.
        CommandResult::Help(_)
        | CommandResult::ExecuteActions(_)
        | CommandResult::ClearHistory
        | CommandResult::Reconnect(_)
        | CommandResult::CheckConnection(_)
        | CommandResult::WaitReady(_) => {}
        CommandResult::Ask(reply) => {
            for (i, step) in reply.resolution.bundle.steps.iter().enumerate() {
                println!("  {}. {}: {}", i + 1, step.title, step.description);
            }
            if reply.resolution.bundle.is_executable() {
                println!(
                    "\n[{} executable actions; message {}]",
                    reply.resolution.bundle.actions.len(),
                    reply.message_id
                );
            }
        }
        CommandResult::ExecuteMessage(report) => {
            for line in &report.results {
                println!("  {line}");
            }
        }
        other => {
            let result_json = serde_json::to_value(other).unwrap_or(Value::Null);
            if let Some(data) = result_json.get("data") {
                println!("{}", serde_json::to_string_pretty(data).unwrap_or_default());
            }
        }
    }
}

fn fail(e: &AppError) -> ! {
    eprintln!("Error: {e}");
    process::exit(1);
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    logging::init_tracing();
    let cli = Cli::parse();
    let raw = cli.json;

    let dir = cli.config_dir.clone().unwrap_or_else(paths::app_config_dir);
    let state = match AppState::load(dir) {
        Ok(state) => Arc::new(state),
        Err(e) => fail(&e),
    };

    if let Commands::Call { name, params } = &cli.command {
        let params: Value = match serde_json::from_str(params) {
            Ok(v) => v,
            Err(e) => fail(&AppError::ValidationError {
                message: format!("Invalid params JSON: {e}"),
            }),
        };
        match run_named(Arc::clone(&state), name, &params).await {
            Ok(output) => print_output(&output, raw),
            Err(e) => fail(&e),
        }
        return;
    }

    let cmd = build_command(&cli.command).unwrap_or_else(|e| fail(&e));
    let output = execute_async(Arc::clone(&state), cmd)
        .await
        .unwrap_or_else(|e| fail(&e));
    print_output(&output, raw);

    // The transcript lives for one invocation, so `ask --execute` runs the
    // reply right away.
    if let Commands::Ask {
        execute: true,
        stop_on_failure,
        ..
    } = &cli.command
    {
        let CommandResult::Ask(reply) = &output.result else {
            return;
        };
        if !reply.resolution.bundle.is_executable() {
            eprintln!("Nothing to execute for this reply.");
            return;
        }
        let policy = if *stop_on_failure {
            FailurePolicy::StopOnFailure
        } else {
            FailurePolicy::Continue
        };
        let cmd = Command::ExecuteMessage(ExecuteMessageParams {
            message_id: reply.message_id,
            policy,
        });
        match execute_async(state, cmd).await {
            Ok(output) => print_output(&output, raw),
            Err(e) => fail(&e),
        }
    }
}
