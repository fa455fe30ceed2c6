use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::tools::{list_tools, MonkeyTools};
use crate::transport::{
    JsonRpcRequest, JsonRpcResponse, INVALID_PARAMS, METHOD_NOT_FOUND, PARSE_ERROR, TOOL_ERROR,
};

const SERVER_NAME: &str = "monkey-mcp";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
const PROTOCOL_VERSION: &str = "2024-11-05";

/// MCP server exposing the monkey tools directly, one JSON-RPC message per line.
pub struct McpServer {
    tools: MonkeyTools,
    initialized: bool,
}

impl McpServer {
    pub fn new(tools: MonkeyTools) -> Self {
        Self {
            tools,
            initialized: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub async fn handle_request(&mut self, input: &str) -> Option<String> {
        let request: JsonRpcRequest = match serde_json::from_str(input) {
            Ok(r) => r,
            Err(_) => {
                let resp = JsonRpcResponse::error(None, PARSE_ERROR, "Parse error");
                return serde_json::to_string(&resp).ok();
            }
        };

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(&request),
            "initialized" | "notifications/initialized" => {
                self.initialized = true;
                return None;
            }
            "tools/list" => self.handle_tools_list(&request),
            "tools/call" => self.handle_tools_call(&request).await,
            "ping" => JsonRpcResponse::success(request.id, json!({})),
            _ => JsonRpcResponse::error(
                request.id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        };

        serde_json::to_string(&response).ok()
    }

    fn handle_initialize(&mut self, request: &JsonRpcRequest) -> JsonRpcResponse {
        JsonRpcResponse::success(
            request.id.clone(),
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": SERVER_VERSION
                }
            }),
        )
    }

    fn handle_tools_list(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let tools = list_tools();
        JsonRpcResponse::success(request.id.clone(), json!({ "tools": tools }))
    }

    async fn handle_tools_call(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let params = match &request.params {
            Some(p) => p,
            None => {
                return JsonRpcResponse::error(request.id.clone(), INVALID_PARAMS, "Missing params")
            }
        };

        let name = params
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        match self.tools.call_tool(name, arguments).await {
            Ok(text) => JsonRpcResponse::success(
                request.id.clone(),
                json!({
                    "content": [{
                        "type": "text",
                        "text": text
                    }]
                }),
            ),
            Err(e) => JsonRpcResponse::error(request.id.clone(), TOOL_ERROR, e.to_string()),
        }
    }
}

/// Serves requests from stdin until it closes.
pub async fn run_stdio(mut server: McpServer) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        if let Some(resp) = server.handle_request(&line).await {
            stdout.write_all(resp.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
    }

    Ok(())
}
