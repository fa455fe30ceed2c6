mod monkeys;

use monkey_core::{MonkeyCache, MonkeyError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

pub use monkeys::{FilterArgs, ToolCall, MONKEY_BUSINESS, REFRESHED_MESSAGE};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: &'static str, reason: String },
    #[error(transparent)]
    Monkey(#[from] MonkeyError),
    #[error("failed to serialize result: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ToolError {
    /// Whether the caller caused the failure, as opposed to the server.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ToolError::Serialize(_))
    }
}

pub fn list_tools() -> Vec<ToolDefinition> {
    monkeys::definitions()
}

/// Runs catalog tools against a shared cache.
#[derive(Clone)]
pub struct MonkeyTools {
    cache: Arc<MonkeyCache>,
}

impl MonkeyTools {
    pub fn new(cache: Arc<MonkeyCache>) -> Self {
        Self { cache }
    }

    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<String, ToolError> {
        let call = ToolCall::parse(name, arguments).inspect_err(|e| {
            error!(tool = name, error = %e, "failed to execute tool");
        })?;
        self.execute(call).await
    }

    pub async fn execute(&self, call: ToolCall) -> Result<String, ToolError> {
        let name = call.name();
        monkeys::run(&self.cache, call).await.inspect_err(|e| {
            error!(tool = name, error = %e, "failed to execute tool");
        })
    }
}
