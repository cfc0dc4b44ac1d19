pub mod catalog;
pub mod execute;
pub mod handlers;
pub mod params;

use serde::{Deserialize, Serialize};

// ── Param types (used in Command enum) ──────────────────────────
use params::{
    AddFavoriteParams, AskParams, ExecuteActionsParams, ExecuteMessageParams, HelpParams,
    ResolveParams, SetPluginFoldersParams,
};

// ── Return types (used in CommandResult enum) ───────────────────
use crate::assistant::{AskReply, ExecutionReport, HistoryEntry};
use crate::controller::{CompositeOperation, CompositeReport, SystemInfo};
use crate::knowledge::Resolution;
use crate::profile::{Preferences, UserProfile};
use crate::settings::AssistantSettings;

use handlers::connection::ConnectionStatus;
use handlers::execution::CompositeSummary;
use handlers::query::TopicSummary;

// ── Handler modules (dispatch targets) ──────────────────────────
use handlers::{connection, execution, profile, query, settings};

// ── Command metadata ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandCategory {
    Query,
    Execution,
    Connection,
    Profile,
    Settings,
}

impl CommandCategory {
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Execution => "execution",
            Self::Connection => "connection",
            Self::Profile => "profile",
            Self::Settings => "settings",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Query => "Ask questions, resolve intents, browse topics and history",
            Self::Execution => "Run action plans and composite operations against the target",
            Self::Connection => "Target detection, reconnect and platform info",
            Self::Profile => "Favorites, plugin folders and preferences",
            Self::Settings => "Application settings",
        }
    }

    pub fn all() -> &'static [CommandCategory] {
        &[
            Self::Query,
            Self::Execution,
            Self::Connection,
            Self::Profile,
            Self::Settings,
        ]
    }
}

pub struct CommandInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub category: CommandCategory,
    /// Sends input to the target or writes to disk.
    pub side_effects: bool,
}

// ── Command output ──────────────────────────────────────────────

/// Internal result of executing a Command.
/// `message` serves the CLI and logs, `result` carries typed data for clients.
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutput {
    pub message: String,
    pub result: CommandResult,
}

impl CommandOutput {
    pub fn new(message: impl Into<String>, result: CommandResult) -> Self {
        Self {
            message: message.into(),
            result,
        }
    }
}

// ── define_commands! macro ──────────────────────────────────────

/// Single source of truth for all commands. Generates 7 artifacts:
/// 1. `Command` enum (serde-tagged)
/// 2. `CommandResult` enum (serde-tagged)
/// 3. `Command::info()`: metadata (name, description, category, side effects)
/// 4. `Command::dispatch()`: execute sync variants; errors on async
/// 5. `Command::registry_entries()`: catalog entries with JSON schemas
/// 6. `Command::from_tool_call()`: deserialize from a (name, JSON) pair
/// 7. `Command::dispatch_async()`: execute every variant
macro_rules! define_commands {
    (
        params {
            $(
                [ $pc:expr $(, $pf:ident)* ]
                $pv:ident ( $pp:ty ) $( -> $pr:ty )?
                => $ph:path, $pn:literal : $pd:literal ;
            )*
        }
        no_params {
            $(
                [ $nc:expr $(, $nf:ident)* ]
                $nv:ident $( -> $nr:ty )?
                => $nh:path, $nn:literal : $nd:literal ;
            )*
        }
        async_params {
            $(
                [ $apc:expr $(, $apf:ident)* ]
                $apv:ident ( $app:ty ) $( -> $apr:ty )?
                => $aph:path, $apn:literal : $apd:literal ;
            )*
        }
        async_no_params {
            $(
                [ $anc:expr $(, $anf:ident)* ]
                $anv:ident $( -> $anr:ty )?
                => $anh:path, $ann:literal : $and:literal ;
            )*
        }
    ) => {
        // ── 1. Command enum ──

        /// Unified command type. Every surface (CLI, HTTP, tool calls) dispatches
        /// through the same executor. Adding a variant causes compiler errors until
        /// it's fully handled.
        #[derive(Debug, Clone, Serialize, Deserialize)]
        #[serde(tag = "command", content = "params")]
        pub enum Command {
            $( $pv($pp), )*
            $( $nv, )*
            $( $apv($app), )*
            $( $anv, )*
        }

        // ── 2. CommandResult enum ──

        /// Typed result for every command, discriminated by `command`.
        #[derive(Debug, Clone, Serialize)]
        #[serde(tag = "command", content = "data")]
        pub enum CommandResult {
            $( $pv $( ($pr) )?, )*
            $( $nv $( ($nr) )?, )*
            $( $apv $( ($apr) )?, )*
            $( $anv $( ($anr) )?, )*
        }

        // ── 3. Command::info() ──

        impl Command {
            pub fn info(&self) -> CommandInfo {
                match self {
                    $( Command::$pv(_) => CommandInfo {
                        name: $pn,
                        description: $pd,
                        category: $pc,
                        side_effects: define_commands!(@has_flag side_effects; $($pf)*),
                    }, )*
                    $( Command::$nv => CommandInfo {
                        name: $nn,
                        description: $nd,
                        category: $nc,
                        side_effects: define_commands!(@has_flag side_effects; $($nf)*),
                    }, )*
                    $( Command::$apv(_) => CommandInfo {
                        name: $apn,
                        description: $apd,
                        category: $apc,
                        side_effects: define_commands!(@has_flag side_effects; $($apf)*),
                    }, )*
                    $( Command::$anv => CommandInfo {
                        name: $ann,
                        description: $and,
                        category: $anc,
                        side_effects: define_commands!(@has_flag side_effects; $($anf)*),
                    }, )*
                }
            }
        }

        // ── 4. Command::dispatch(): sync only ──

        impl Command {
            pub(crate) fn dispatch(
                self,
                state: &std::sync::Arc<crate::state::AppState>,
            ) -> Result<CommandOutput, crate::error::AppError> {
                match self {
                    $( Command::$pv(p) => $ph(state, p), )*
                    $( Command::$nv => $nh(state), )*
                    $( Command::$apv(_) => Err(crate::error::AppError::ApiError {
                        message: format!("Command '{}' requires async dispatch", $apn),
                    }), )*
                    $( Command::$anv => Err(crate::error::AppError::ApiError {
                        message: format!("Command '{}' requires async dispatch", $ann),
                    }), )*
                }
            }
        }

        // ── 5. Command::registry_entries() ──

        impl Command {
            pub(crate) fn registry_entries() -> Vec<catalog::CommandRegistryEntry> {
                vec![
                    $( catalog::entry(
                        CommandInfo {
                            name: $pn,
                            description: $pd,
                            category: $pc,
                            side_effects: define_commands!(@has_flag side_effects; $($pf)*),
                        },
                        false,
                        catalog::schema_value::<$pp>(),
                    ), )*
                    $( catalog::entry(
                        CommandInfo {
                            name: $nn,
                            description: $nd,
                            category: $nc,
                            side_effects: define_commands!(@has_flag side_effects; $($nf)*),
                        },
                        false,
                        catalog::empty_object_schema(),
                    ), )*
                    $( catalog::entry(
                        CommandInfo {
                            name: $apn,
                            description: $apd,
                            category: $apc,
                            side_effects: define_commands!(@has_flag side_effects; $($apf)*),
                        },
                        true,
                        catalog::schema_value::<$app>(),
                    ), )*
                    $( catalog::entry(
                        CommandInfo {
                            name: $ann,
                            description: $and,
                            category: $anc,
                            side_effects: define_commands!(@has_flag side_effects; $($anf)*),
                        },
                        true,
                        catalog::empty_object_schema(),
                    ), )*
                ]
            }
        }

        // ── 6. Command::from_tool_call() ──

        impl Command {
            pub fn from_tool_call(
                name: &str,
                input: &serde_json::Value,
            ) -> Result<Command, String> {
                match name {
                    $( $pn => Ok(Command::$pv(catalog::de(input)?)), )*
                    $( $nn => Ok(Command::$nv), )*
                    $( $apn => Ok(Command::$apv(catalog::de(input)?)), )*
                    $( $ann => Ok(Command::$anv), )*
                    _ => Err(format!("Unknown command: {name}")),
                }
            }
        }

        // ── 7. Command::dispatch_async(): all variants ──

        impl Command {
            pub(crate) async fn dispatch_async(
                self,
                state: std::sync::Arc<crate::state::AppState>,
            ) -> Result<CommandOutput, crate::error::AppError> {
                match self {
                    // Sync params run inline
                    $( Command::$pv(p) => $ph(&state, p), )*
                    // Sync no_params run inline
                    $( Command::$nv => $nh(&state), )*
                    // Async params are awaited
                    $( Command::$apv(p) => $aph(state, p).await, )*
                    // Async no_params are awaited
                    $( Command::$anv => $anh(state).await, )*
                }
            }

            pub fn is_async(&self) -> bool {
                match self {
                    $( Command::$pv(_) => false, )*
                    $( Command::$nv => false, )*
                    $( Command::$apv(_) => true, )*
                    $( Command::$anv => true, )*
                }
            }
        }
    };
    // Flag helper: literal tokens match before metavariables, so the flag
    // matches the first arm and any other ident recurses.
    (@has_flag side_effects; side_effects $($rest:ident)*) => { true };
    (@has_flag side_effects; $_other:ident $($rest:ident)*) => { define_commands!(@has_flag side_effects; $($rest)*) };
    (@has_flag side_effects;) => { false };
}

// ── Command definitions ─────────────────────────────────────────

define_commands! {
    params {
        // ── Query (3) ───────────────────────────────────────────
        [CommandCategory::Query, side_effects]
        Ask(AskParams) -> AskReply
        => query::ask, "ask": "Ask a question. Appends the question and the answer to the transcript.";

        [CommandCategory::Query]
        Resolve(ResolveParams) -> Resolution
        => query::resolve, "resolve": "Resolve a query to its canned answer without touching the transcript.";

        [CommandCategory::Query]
        Help(HelpParams) -> String
        => query::help, "help": "List command categories, the commands of a category, or one command's parameters.";

        // ── Profile (3) ─────────────────────────────────────────
        [CommandCategory::Profile, side_effects]
        AddFavorite(AddFavoriteParams) -> bool
        => profile::add_favorite, "add_favorite": "Add a favorite plugin, device or template. Returns false if already present.";

        [CommandCategory::Profile, side_effects]
        SetPluginFolders(SetPluginFoldersParams) -> Vec<String>
        => profile::set_plugin_folders, "set_plugin_folders": "Replace the list of plugin folders.";

        [CommandCategory::Profile, side_effects]
        SetPreferences(Preferences) -> Preferences
        => profile::set_preferences, "set_preferences": "Set theme and suggestion preferences.";
    }
    no_params {
        // ── Query (4) ───────────────────────────────────────────
        [CommandCategory::Query]
        ListTopics -> Vec<TopicSummary>
        => query::list_topics, "list_topics": "List knowledge topics in matching order.";

        [CommandCategory::Query]
        GetHistory -> Vec<HistoryEntry>
        => query::get_history, "get_history": "Get the conversation transcript.";

        [CommandCategory::Query, side_effects]
        ClearHistory
        => query::clear_history, "clear_history": "Clear the transcript back to the greeting.";

        // ── Execution (2) ───────────────────────────────────────
        [CommandCategory::Execution]
        CancelExecution -> bool
        => execution::cancel_execution, "cancel_execution": "Cancel the running execution before its next action.";

        [CommandCategory::Execution]
        ListComposites -> Vec<CompositeSummary>
        => execution::list_composites, "list_composites": "List composite operations and the actions they run.";

        // ── Connection (2) ──────────────────────────────────────
        [CommandCategory::Connection]
        GetConnectionStatus -> ConnectionStatus
        => connection::get_connection_status, "get_connection_status": "Current connection state, without probing.";

        [CommandCategory::Connection]
        GetSystemInfo -> SystemInfo
        => connection::get_system_info, "get_system_info": "Platform, backend and support information.";

        // ── Profile (1) ─────────────────────────────────────────
        [CommandCategory::Profile]
        GetProfile -> UserProfile
        => profile::get_profile, "get_profile": "Get the user profile.";

        // ── Settings (1) ────────────────────────────────────────
        [CommandCategory::Settings]
        GetSettings -> AssistantSettings
        => settings::get_settings, "get_settings": "Get the application settings.";
    }
    async_params {
        // ── Execution (3) ───────────────────────────────────────
        [CommandCategory::Execution, side_effects]
        ExecuteMessage(ExecuteMessageParams) -> ExecutionReport
        => execution::execute_message, "execute_message": "Execute the action plan attached to an assistant message.";

        [CommandCategory::Execution, side_effects]
        ExecuteActions(ExecuteActionsParams) -> Vec<String>
        => execution::execute_actions, "execute_actions": "Execute a list of actions in order. Returns one message per action.";

        [CommandCategory::Execution, side_effects]
        RunComposite(CompositeOperation) -> CompositeReport
        => execution::run_composite, "run_composite": "Run a named composite operation. Stops at the first failure.";
    }
    async_no_params {
        // ── Connection (3) ──────────────────────────────────────
        [CommandCategory::Connection]
        Reconnect -> bool
        => connection::reconnect, "reconnect": "Reset the connection state and probe again.";

        [CommandCategory::Connection]
        CheckConnection -> bool
        => connection::check_connection, "check_connection": "Probe the target once and update the connection state.";

        [CommandCategory::Connection]
        WaitReady -> bool
        => connection::wait_ready, "wait_ready": "Wait until the connection state is known.";
    }
}
