use monkey_core::MonkeyField;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::correction;
use crate::intent::{self, ResolvedIntent, OUT_OF_CONTEXT};
use crate::reasoning::ReasoningClient;
use crate::tools::{MonkeyTools, ToolError};

/// Free text in, tool output out.
///
/// Stages run strictly in order: resolve, correct argument keys, correct
/// `fields`, reconcile sorting, dispatch.
#[derive(Clone)]
pub struct ChatPipeline {
    tools: MonkeyTools,
    reasoning: Arc<dyn ReasoningClient>,
}

impl ChatPipeline {
    pub fn new(tools: MonkeyTools, reasoning: Arc<dyn ReasoningClient>) -> Self {
        Self { tools, reasoning }
    }

    /// Answers one chat message. Tool output that is JSON comes back parsed,
    /// anything else as a JSON string.
    pub async fn handle(&self, message: &str) -> Result<Value, ToolError> {
        let resolved = intent::resolve(self.reasoning.as_ref(), message).await;
        if resolved.is_out_of_context() {
            info!("request is out of context");
            return Ok(json!(OUT_OF_CONTEXT));
        }

        let resolved = self.reconcile(resolved).await;
        info!(tool = %resolved.tool_name, "dispatching resolved intent");

        let output = self
            .tools
            .call_tool(&resolved.tool_name, Value::Object(resolved.arguments))
            .await?;

        Ok(serde_json::from_str(&output).unwrap_or(Value::String(output)))
    }

    pub async fn reconcile(&self, resolved: ResolvedIntent) -> ResolvedIntent {
        let ResolvedIntent {
            tool_name,
            mut arguments,
        } = resolved;

        let keys: Vec<String> = arguments.keys().cloned().collect();
        let key_corrections =
            correction::correct(self.reasoning.as_ref(), &keys, &MonkeyField::ALL).await;
        debug!(?key_corrections, "argument key corrections");

        let requested_fields: Option<Vec<String>> =
            arguments.get("fields").and_then(Value::as_array).map(|fields| {
                fields
                    .iter()
                    .filter_map(|f| f.as_str().map(str::to_string))
                    .collect()
            });
        if let Some(requested) = requested_fields {
            let corrections =
                correction::correct(self.reasoning.as_ref(), &requested, &MonkeyField::ALL).await;
            arguments.insert(
                "fields".to_string(),
                json!(corrected_fields(&requested, &corrections)),
            );
        }

        if let Some(sort_by) = arguments.get("sort_by").and_then(Value::as_str) {
            let sort_by = reconcile_sort_by(sort_by);
            arguments.insert("sort_by".to_string(), json!(sort_by));
        }

        if arguments.contains_key("sort_order") {
            match arguments
                .get("sort_order")
                .and_then(Value::as_str)
                .and_then(reconcile_sort_order)
            {
                Some(order) => arguments.insert("sort_order".to_string(), json!(order)),
                None => arguments.remove("sort_order"),
            };
        }

        ResolvedIntent {
            tool_name,
            arguments,
        }
    }
}

/// Corrected names for `requested`, keeping only those that are real fields.
pub fn corrected_fields(
    requested: &[String],
    corrections: &HashMap<String, String>,
) -> Vec<&'static str> {
    requested
        .iter()
        .filter_map(|original| corrections.get(original))
        .filter_map(|corrected| MonkeyField::from_display(corrected))
        .map(|field| field.as_str())
        .collect()
}

/// Canonical spelling when the name matches a field ignoring case, else the
/// name unchanged.
pub fn reconcile_sort_by(sort_by: &str) -> String {
    MonkeyField::from_display_ignore_case(sort_by)
        .map(|field| field.as_str().to_string())
        .unwrap_or_else(|| sort_by.to_string())
}

pub fn reconcile_sort_order(sort_order: &str) -> Option<&'static str> {
    match sort_order.to_lowercase().as_str() {
        "asc" => Some("asc"),
        "desc" => Some("desc"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrected_fields_reject_hallucinations() {
        let requested = vec!["nmae".to_string(), "colour".to_string(), "popultion".to_string()];
        let corrections = HashMap::from([
            ("nmae".to_string(), "Name".to_string()),
            ("colour".to_string(), "Colour".to_string()),
            ("popultion".to_string(), "Population".to_string()),
            ("unasked".to_string(), "Image".to_string()),
        ]);

        assert_eq!(
            corrected_fields(&requested, &corrections),
            vec!["Name", "Population"]
        );
    }

    #[test]
    fn sort_by_matches_ignoring_case() {
        assert_eq!(reconcile_sort_by("population"), "Population");
        assert_eq!(reconcile_sort_by("LATITUDE"), "Latitude");
        assert_eq!(reconcile_sort_by("Lifespan"), "Lifespan");
    }

    #[test]
    fn sort_order_accepts_only_asc_or_desc() {
        assert_eq!(reconcile_sort_order("DESC"), Some("desc"));
        assert_eq!(reconcile_sort_order("Asc"), Some("asc"));
        assert_eq!(reconcile_sort_order("descending"), None);
        assert_eq!(reconcile_sort_order(""), None);
    }
}
