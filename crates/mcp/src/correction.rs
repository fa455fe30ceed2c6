use monkey_core::MonkeyField;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{debug, error};

use crate::reasoning::ReasoningClient;

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*\n(.*?)\n?```").expect("valid regex"));

fn quote_list<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items
        .map(|s| format!("'{}'", s))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn build_prompt(candidates: &[String], vocabulary: &[MonkeyField]) -> String {
    let candidates = quote_list(candidates.iter().map(String::as_str));
    let valid = quote_list(vocabulary.iter().map(MonkeyField::as_str));

    format!(
        "You are a helpful assistant. The following is a list of possibly misspelled field names:\n\
         [{candidates}]\n\
         Here are the valid fields:\n\
         [{valid}]\n\
         Correct each item (if needed) to the closest valid field name. \
         Return a JSON object mapping original field names to corrected field names. \
         If a field name cannot be corrected, omit it.\n\n\
         Return only the JSON mapping."
    )
}

/// Reads an `original -> corrected` mapping from model output.
///
/// Non-string values are dropped. Anything unreadable is an empty mapping.
pub fn parse_corrections(reply: &str) -> Option<HashMap<String, String>> {
    let value = serde_json::from_str::<Value>(reply.trim()).ok().or_else(|| {
        JSON_FENCE
            .captures(reply)
            .and_then(|c| serde_json::from_str::<Value>(c[1].trim()).ok())
    })?;

    let object = value.as_object()?;
    Some(
        object
            .iter()
            .filter_map(|(original, corrected)| {
                corrected
                    .as_str()
                    .map(|c| (original.clone(), c.to_string()))
            })
            .collect(),
    )
}

/// Best-effort spelling correction of field names, using the reasoning
/// backend as a fuzzy matcher.
pub async fn correct(
    client: &dyn ReasoningClient,
    candidates: &[String],
    vocabulary: &[MonkeyField],
) -> HashMap<String, String> {
    if candidates.is_empty() {
        return HashMap::new();
    }

    let reply = match client.complete(&build_prompt(candidates, vocabulary)).await {
        Ok(reply) => reply,
        Err(e) => {
            error!(error = %e, "reasoning request failed during field correction");
            return HashMap::new();
        }
    };

    match parse_corrections(&reply) {
        Some(corrections) => {
            debug!(?corrections, "field corrections");
            corrections
        }
        None => {
            error!(reply = %reply, "could not read field corrections");
            HashMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_mapping() {
        let map = parse_corrections(r#"{"nmae": "Name", "populaton": "Population"}"#).unwrap();
        assert_eq!(map["nmae"], "Name");
        assert_eq!(map["populaton"], "Population");
    }

    #[test]
    fn parses_fenced_mapping() {
        let reply = "Here you go:\n```json\n{\"locaton\": \"Location\"}\n```\n";
        let map = parse_corrections(reply).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["locaton"], "Location");
    }

    #[test]
    fn drops_non_string_values() {
        let map = parse_corrections(r#"{"nmae": "Name", "x": null, "y": 3}"#).unwrap();
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn unreadable_replies_are_none() {
        assert!(parse_corrections("no idea").is_none());
        assert!(parse_corrections(r#"["Name"]"#).is_none());
        assert!(parse_corrections("```json\nnope\n```").is_none());
    }

    #[test]
    fn prompt_lists_candidates_and_vocabulary() {
        let prompt = build_prompt(&["nmae".to_string()], &MonkeyField::ALL);
        assert!(prompt.contains("['nmae']"));
        assert!(prompt.contains("'Longitude'"));
    }
}
