#![allow(clippy::needless_pass_by_value)]

use schemars::schema_for;
use serde::Serialize;
use serde_json::Value;

use super::{CommandCategory, CommandInfo};

/// A registry entry: metadata + JSON schema for the params.
#[derive(Debug, Clone, Serialize)]
pub struct CommandRegistryEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub category: CommandCategory,
    pub side_effects: bool,
    pub is_async: bool,
    pub param_schema: Value,
}

pub(super) fn empty_object_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

pub(super) fn schema_value<T: schemars::JsonSchema>() -> Value {
    let root = schema_for!(T);
    serde_json::to_value(root).unwrap_or(empty_object_schema())
}

pub(super) fn entry(info: CommandInfo, is_async: bool, param_schema: Value) -> CommandRegistryEntry {
    CommandRegistryEntry {
        name: info.name,
        description: info.description,
        category: info.category,
        side_effects: info.side_effects,
        is_async,
        param_schema,
    }
}

pub(super) fn de<T: serde::de::DeserializeOwned>(input: &Value) -> Result<T, String> {
    serde_json::from_value(input.clone()).map_err(|e| e.to_string())
}

/// The complete command registry, auto-generated from param struct schemas.
pub fn command_registry() -> Vec<CommandRegistryEntry> {
    super::Command::registry_entries()
}

/// Help text for command discovery.
/// Three tiers: no topic → categories, category → command list, command → full schema.
pub fn help_text(topic: Option<&str>) -> String {
    let registry = command_registry();

    match topic {
        None => {
            let mut lines = vec!["Available command categories:".to_string()];
            for cat in CommandCategory::all() {
                let count = registry.iter().filter(|e| e.category == *cat).count();
                if count > 0 {
                    lines.push(format!("  {} ({count}): {}", cat.slug(), cat.description()));
                }
            }
            lines.push(String::new());
            lines.push("Use help({topic: \"execution\"}) to list commands in a category.".to_string());
            lines.push("Use help({topic: \"run_composite\"}) for full parameter details.".to_string());
            lines.join("\n")
        }
        Some(topic) => {
            // Command name first (tier 3: full schema)
            if let Some(entry) = registry.iter().find(|e| e.name == topic) {
                let schema_str = serde_json::to_string_pretty(&entry.param_schema)
                    .unwrap_or_else(|_| "{}".to_string());
                return format!(
                    "{}: {}\nCategory: {} | Side effects: {} | Async: {}\n\nParameters:\n{}",
                    entry.name,
                    entry.description,
                    entry.category.slug(),
                    if entry.side_effects { "yes" } else { "no" },
                    if entry.is_async { "yes" } else { "no" },
                    schema_str,
                );
            }

            // Then category slug (tier 2: command list)
            let slug = topic.to_lowercase();
            let matching: Vec<&CommandRegistryEntry> = registry
                .iter()
                .filter(|e| e.category.slug() == slug)
                .collect();

            if matching.is_empty() {
                format!("Unknown topic: \"{topic}\". Use help() to see categories and commands.")
            } else {
                let mut lines = vec![format!("{slug} commands:")];
                for entry in &matching {
                    lines.push(format!("  - {}: {}", entry.name, entry.description));
                }
                lines.push(String::new());
                lines.push("Use help({topic: \"command_name\"}) for parameter details.".to_string());
                lines.join("\n")
            }
        }
    }
}

/// Generate JSON Schema formatted tool list (for REST discovery).
pub fn to_json_schema() -> Value {
    Value::Array(
        command_registry()
            .iter()
            .map(|e| {
                serde_json::json!({
                    "name": e.name,
                    "description": e.description,
                    "category": e.category.slug(),
                    "sideEffects": e.side_effects,
                    "async": e.is_async,
                    "inputSchema": e.param_schema,
                })
            })
            .collect(),
    )
}

/// Deserialize a tool call (name + JSON input) into a Command.
pub fn deserialize_from_tool_call(name: &str, input: &Value) -> Result<super::Command, String> {
    super::Command::from_tool_call(name, input)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn help_lists_every_category() {
        let text = help_text(None);
        for cat in CommandCategory::all() {
            assert!(text.contains(cat.slug()), "missing {}", cat.slug());
        }
    }

    #[test]
    fn help_for_category_and_command() {
        let text = help_text(Some("Connection"));
        assert!(text.contains("reconnect"));
        assert!(text.contains("check_connection"));

        let text = help_text(Some("add_favorite"));
        assert!(text.starts_with("add_favorite:"));
        assert!(text.contains("Side effects: yes"));
        assert!(text.contains("\"kind\""));

        assert!(help_text(Some("nothing")).starts_with("Unknown topic"));
    }

    #[test]
    fn async_commands_are_flagged() {
        let registry = command_registry();
        let execute = registry.iter().find(|e| e.name == "execute_message").unwrap();
        assert!(execute.is_async);
        let topics = registry.iter().find(|e| e.name == "list_topics").unwrap();
        assert!(!topics.is_async);
        assert_eq!(topics.param_schema, empty_object_schema());
    }

    #[test]
    fn json_schema_has_one_tool_per_command() {
        let tools = to_json_schema();
        assert_eq!(tools.as_array().unwrap().len(), command_registry().len());
    }
}
