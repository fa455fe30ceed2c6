use monkey_core::{Monkey, MonkeyCache, MonkeyError, MonkeyField};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{ToolDefinition, ToolError};

pub const MONKEY_BUSINESS: &str = "🐵🐵🐵";
pub const REFRESHED_MESSAGE: &str = "Monkey cache refreshed successfully";

pub fn definitions() -> Vec<ToolDefinition> {
    let field_names = MonkeyField::display_names();

    vec![
        ToolDefinition {
            name: "get_monkeys".to_string(),
            description: "Gets a complete list of all monkeys with their full details. Use when the user asks for 'all monkeys' or 'list all monkeys' without specific fields, sorting, or filtering.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
        ToolDefinition {
            name: "get_monkeys_filtered".to_string(),
            description: format!(
                "Gets monkeys with specific fields, optional sorting by {}, and optional sort order ('asc' or 'desc'). Use when the user asks for monkeys with specific columns, wants them sorted, or implies a general listing with criteria.",
                field_names.iter().map(|f| format!("'{}'", f)).collect::<Vec<_>>().join(", ")
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "fields": {
                        "type": "array",
                        "items": { "type": "string", "enum": field_names },
                        "description": "Fields to include in each monkey (default all)"
                    },
                    "sort_by": {
                        "type": "string",
                        "enum": field_names,
                        "description": "Field to sort by (optional)"
                    },
                    "sort_order": {
                        "type": "string",
                        "enum": ["asc", "desc"],
                        "description": "Sort direction (default asc)"
                    }
                }
            }),
        },
        ToolDefinition {
            name: "get_monkey".to_string(),
            description: "Gets detailed information about a single specific monkey by its name. Use when the user asks for a particular monkey by name (e.g., 'show details for mandrill', 'find chimpanzee').".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": {
                        "type": "string",
                        "description": "Monkey name, matched case-insensitively"
                    }
                },
                "required": ["name"]
            }),
        },
        ToolDefinition {
            name: "get_monkey_business".to_string(),
            description: "Returns fun monkey emojis. Use when the user asks for 'monkey business' or something similar.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
        ToolDefinition {
            name: "refresh_monkey_cache".to_string(),
            description: "Refreshes the monkey data cache. Use when the user explicitly asks to 'refresh monkey data' or 'update monkeys'.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
    ]
}

/// Arguments of `get_monkeys_filtered`.
///
/// Decoding is forgiving: a null or malformed value means the argument was
/// not given, and non-string entries in `fields` are dropped.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FilterArgs {
    #[serde(default, deserialize_with = "string_list")]
    pub fields: Vec<String>,
    #[serde(default, deserialize_with = "optional_string")]
    pub sort_by: Option<String>,
    #[serde(default, deserialize_with = "optional_string")]
    pub sort_order: Option<String>,
}

impl FilterArgs {
    /// Requested fields that exist, deduplicated, in request order.
    pub fn known_fields(&self) -> Vec<MonkeyField> {
        let mut fields = Vec::new();
        for field in self.fields.iter().filter_map(|f| MonkeyField::from_display(f)) {
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
        fields
    }

    pub fn sort_field(&self) -> Option<MonkeyField> {
        self.sort_by.as_deref().and_then(MonkeyField::from_display)
    }

    pub fn descending(&self) -> bool {
        self.sort_order
            .as_deref()
            .is_some_and(|o| o.eq_ignore_ascii_case("desc"))
    }
}

#[derive(Debug, Deserialize)]
struct GetMonkeyArgs {
    #[serde(default, deserialize_with = "lenient_name")]
    name: String,
}

fn string_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        Value::String(s) => vec![s],
        _ => Vec::new(),
    })
}

fn optional_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

// Null is "no name" and ends up as `MonkeyError::EmptyName`.
fn lenient_name<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// A tool invocation with its arguments decoded for that tool.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    GetMonkeys,
    GetMonkeysFiltered(FilterArgs),
    GetMonkey { name: String },
    GetMonkeyBusiness,
    RefreshMonkeyCache,
}

impl ToolCall {
    pub fn parse(name: &str, arguments: Value) -> Result<Self, ToolError> {
        match name {
            "get_monkeys" => Ok(ToolCall::GetMonkeys),
            "get_monkeys_filtered" => Ok(ToolCall::GetMonkeysFiltered(decode(
                "get_monkeys_filtered",
                arguments,
            )?)),
            "get_monkey" => {
                let args: GetMonkeyArgs = decode("get_monkey", arguments)?;
                Ok(ToolCall::GetMonkey { name: args.name })
            }
            "get_monkey_business" => Ok(ToolCall::GetMonkeyBusiness),
            "refresh_monkey_cache" => Ok(ToolCall::RefreshMonkeyCache),
            _ => Err(ToolError::UnknownTool(name.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::GetMonkeys => "get_monkeys",
            ToolCall::GetMonkeysFiltered(_) => "get_monkeys_filtered",
            ToolCall::GetMonkey { .. } => "get_monkey",
            ToolCall::GetMonkeyBusiness => "get_monkey_business",
            ToolCall::RefreshMonkeyCache => "refresh_monkey_cache",
        }
    }
}

fn decode<T: DeserializeOwned>(tool: &'static str, arguments: Value) -> Result<T, ToolError> {
    let arguments = if arguments.is_null() {
        json!({})
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments {
        tool,
        reason: e.to_string(),
    })
}

pub(super) async fn run(cache: &MonkeyCache, call: ToolCall) -> Result<String, ToolError> {
    match call {
        ToolCall::GetMonkeys => get_monkeys(cache).await,
        ToolCall::GetMonkeysFiltered(args) => get_monkeys_filtered(cache, &args).await,
        ToolCall::GetMonkey { name } => get_monkey(cache, &name).await,
        ToolCall::GetMonkeyBusiness => Ok(MONKEY_BUSINESS.to_string()),
        ToolCall::RefreshMonkeyCache => refresh_monkey_cache(cache).await,
    }
}

async fn get_monkeys(cache: &MonkeyCache) -> Result<String, ToolError> {
    info!("retrieving all monkeys");
    let monkeys = cache.get_all().await;
    let output = serde_json::to_string_pretty(&*monkeys)?;
    info!(count = monkeys.len(), "retrieved monkeys");
    Ok(output)
}

async fn get_monkeys_filtered(cache: &MonkeyCache, args: &FilterArgs) -> Result<String, ToolError> {
    info!("retrieving filtered monkeys");
    let monkeys = cache.get_all().await;
    let mut rows: Vec<&Monkey> = monkeys.iter().collect();

    let mut fields = args.known_fields();
    if fields.is_empty() {
        fields = MonkeyField::ALL.to_vec();
    }

    // Rows are sorted as projected, so a sort key left out of `fields` keeps
    // upstream order.
    if let Some(field) = args.sort_field().filter(|f| fields.contains(f)) {
        let descending = args.descending();
        rows.sort_by(|a, b| {
            let ord = a.compare_by(b, field);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        });
    }

    let projected: Vec<Value> = rows
        .iter()
        .map(|m| Value::Object(m.project(&fields)))
        .collect();

    let output = serde_json::to_string_pretty(&projected)?;
    info!(count = projected.len(), "retrieved filtered monkeys");
    Ok(output)
}

async fn get_monkey(cache: &MonkeyCache, name: &str) -> Result<String, ToolError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(MonkeyError::EmptyName.into());
    }

    info!(monkey = name, "retrieving monkey");
    let monkey = cache.get_by_name(name).await?;
    Ok(serde_json::to_string_pretty(&monkey)?)
}

async fn refresh_monkey_cache(cache: &MonkeyCache) -> Result<String, ToolError> {
    info!("refreshing monkey cache");
    match cache.force_refresh().await {
        Ok(count) => info!(count, "refreshed monkey cache"),
        Err(e) => warn!(error = %e, "monkey cache refresh failed, keeping previous data"),
    }
    Ok(REFRESHED_MESSAGE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_each_catalog_tool() {
        for def in definitions() {
            let call = ToolCall::parse(&def.name, json!({"name": "Baboon"})).unwrap();
            assert_eq!(call.name(), def.name);
        }
    }

    #[test]
    fn unknown_tool_names_the_tool() {
        let err = ToolCall::parse("chat", json!({})).unwrap_err();
        assert_eq!(err.to_string(), "Unknown tool: chat");
        assert!(err.is_client_error());
    }

    #[test]
    fn null_arguments_are_empty() {
        assert_eq!(
            ToolCall::parse("get_monkeys_filtered", Value::Null).unwrap(),
            ToolCall::GetMonkeysFiltered(FilterArgs::default())
        );
        assert_eq!(
            ToolCall::parse("get_monkey", Value::Null).unwrap(),
            ToolCall::GetMonkey {
                name: String::new()
            }
        );
    }

    #[test]
    fn extra_filter_arguments_are_ignored() {
        let call = ToolCall::parse(
            "get_monkeys_filtered",
            json!({"fields": ["Name"], "filters": {"Status": "Endangered"}}),
        )
        .unwrap();
        assert_eq!(
            call,
            ToolCall::GetMonkeysFiltered(FilterArgs {
                fields: vec!["Name".to_string()],
                ..FilterArgs::default()
            })
        );
    }

    #[test]
    fn malformed_filter_values_are_ignored() {
        let call = ToolCall::parse(
            "get_monkeys_filtered",
            json!({"fields": null, "sort_by": 3, "sort_order": null}),
        )
        .unwrap();
        assert_eq!(call, ToolCall::GetMonkeysFiltered(FilterArgs::default()));

        let call = ToolCall::parse(
            "get_monkeys_filtered",
            json!({"fields": ["Name", 7, null, "Population"], "sort_by": "Population"}),
        )
        .unwrap();
        assert_eq!(
            call,
            ToolCall::GetMonkeysFiltered(FilterArgs {
                fields: vec!["Name".to_string(), "Population".to_string()],
                sort_by: Some("Population".to_string()),
                sort_order: None,
            })
        );

        let call = ToolCall::parse("get_monkeys_filtered", json!({"fields": "Name"})).unwrap();
        assert_eq!(
            call,
            ToolCall::GetMonkeysFiltered(FilterArgs {
                fields: vec!["Name".to_string()],
                ..FilterArgs::default()
            })
        );
    }

    #[test]
    fn null_name_is_empty() {
        assert_eq!(
            ToolCall::parse("get_monkey", json!({"name": null})).unwrap(),
            ToolCall::GetMonkey {
                name: String::new()
            }
        );
    }

    #[test]
    fn wrong_argument_shape_is_invalid() {
        let err = ToolCall::parse("get_monkeys_filtered", json!("Name")).unwrap_err();
        assert!(matches!(
            err,
            ToolError::InvalidArguments {
                tool: "get_monkeys_filtered",
                ..
            }
        ));
    }

    #[test]
    fn known_fields_drops_unknown_and_duplicates() {
        let args = FilterArgs {
            fields: vec![
                "Name".to_string(),
                "Bogus".to_string(),
                "name".to_string(),
                "Name".to_string(),
                "Population".to_string(),
            ],
            ..FilterArgs::default()
        };
        assert_eq!(
            args.known_fields(),
            vec![MonkeyField::Name, MonkeyField::Population]
        );
    }

    #[test]
    fn sort_order_is_case_insensitive() {
        let mut args = FilterArgs {
            sort_order: Some("DESC".to_string()),
            ..FilterArgs::default()
        };
        assert!(args.descending());
        args.sort_order = Some("backwards".to_string());
        assert!(!args.descending());
        args.sort_order = None;
        assert!(!args.descending());
    }

    #[test]
    fn catalog_schemas_list_every_field() {
        let filtered = definitions()
            .into_iter()
            .find(|d| d.name == "get_monkeys_filtered")
            .unwrap();
        let fields = filtered.input_schema["properties"]["sort_by"]["enum"]
            .as_array()
            .unwrap();
        assert_eq!(fields.len(), MonkeyField::ALL.len());
    }
}
