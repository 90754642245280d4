/// MCP Protocol Layer
///
/// JSON-RPC 2.0 request/response structures and the MCP method router. Every
/// transport (streamable HTTP, SSE, STDIO) decodes a message and hands it to
/// `handle_message`; only the framing of the answer differs.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::core::error::InvocationError;
use crate::core::registry::ToolRegistry;

/// Protocol revisions this server can speak, oldest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2024-11-05", "2025-03-26", "2025-06-18"];
/// Offered when the client asks for a revision we do not know.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2025-03-26";

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

/// Server metadata shared by every transport.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server name as reported in MCP initialize responses
    pub server_name: String,
    /// Server version string as reported in MCP initialize responses
    pub server_version: String,
}

/// JSON-RPC 2.0 request structure for MCP protocol.
///
/// `id` is absent for notifications. An explicit `"id": null` is kept as
/// `Some(Value::Null)` so that request still gets an answer.
#[derive(Deserialize, Debug)]
pub struct MCPRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    #[serde(default, deserialize_with = "present")]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// JSON-RPC 2.0 response structure. Exactly one of `result` and `error` is set.
#[derive(Serialize, Debug)]
pub struct MCPResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<MCPError>,
}

/// JSON-RPC 2.0 error structure.
#[derive(Serialize, Debug)]
pub struct MCPError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl MCPResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, code: i32, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(MCPError {
                code,
                message: message.into(),
                data,
            }),
        }
    }

    #[cfg(test)]
    pub fn error(&self) -> Option<&MCPError> {
        self.error.as_ref()
    }
}

/// Decode one raw JSON-RPC message and process it.
///
/// Returns `None` when nothing should be sent back: notifications and
/// stray responses from the client.
pub async fn handle_message(
    state: &AppState,
    registry: &ToolRegistry,
    body: &[u8],
) -> Option<MCPResponse> {
    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(target: "calculator_mcp::protocol", error = %e, "Parse error");
            return Some(MCPResponse::failure(
                Value::Null,
                PARSE_ERROR,
                format!("Parse error: {e}"),
                None,
            ));
        }
    };

    if value.get("method").is_none()
        && (value.get("result").is_some() || value.get("error").is_some())
    {
        return None;
    }

    let id = value.get("id").cloned().unwrap_or(Value::Null);
    match serde_json::from_value::<MCPRequest>(value) {
        Ok(req) => handle_request(state, registry, req).await,
        Err(e) => Some(MCPResponse::failure(
            id,
            INVALID_REQUEST,
            format!("Invalid Request: {e}"),
            None,
        )),
    }
}

/// Route a decoded request to the matching MCP method.
pub async fn handle_request(
    state: &AppState,
    registry: &ToolRegistry,
    req: MCPRequest,
) -> Option<MCPResponse> {
    let Some(id) = req.id else {
        // Notifications are one-way; `notifications/initialized` needs no action
        tracing::debug!(target: "calculator_mcp::protocol", method = %req.method, "Notification received");
        return None;
    };

    let response = match req.method.as_str() {
        "initialize" => handle_initialize(state, id, req.params.as_ref()),
        "ping" => MCPResponse::success(id, json!({})),
        "tools/list" => handle_tools_list(registry, id),
        "tools/call" => handle_tools_call(registry, id, req.params).await,
        _ => MCPResponse::failure(
            id,
            METHOD_NOT_FOUND,
            format!("Method not found: {}", req.method),
            None,
        ),
    };
    Some(response)
}

fn handle_initialize(state: &AppState, id: Value, params: Option<&Value>) -> MCPResponse {
    let requested = params
        .and_then(|p| p.get("protocolVersion"))
        .and_then(Value::as_str);
    let protocol_version = match requested {
        Some(v) if SUPPORTED_PROTOCOL_VERSIONS.contains(&v) => v,
        _ => DEFAULT_PROTOCOL_VERSION,
    };

    MCPResponse::success(
        id,
        json!({
            "protocolVersion": protocol_version,
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": state.server_name,
                "version": state.server_version
            }
        }),
    )
}

fn handle_tools_list(registry: &ToolRegistry, id: Value) -> MCPResponse {
    MCPResponse::success(id, json!({ "tools": registry.tools() }))
}

async fn handle_tools_call(registry: &ToolRegistry, id: Value, params: Option<Value>) -> MCPResponse {
    let Some(params) = params else {
        return MCPResponse::failure(id, INVALID_PARAMS, "Invalid params", None);
    };
    let Some(tool_name) = params.get("name").and_then(Value::as_str) else {
        return MCPResponse::failure(id, INVALID_PARAMS, "Invalid params: missing tool name", None);
    };
    let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

    match registry.invoke(tool_name, arguments).await {
        Ok(result) => match serde_json::to_value(&result) {
            Ok(result) => MCPResponse::success(id, result),
            Err(e) => MCPResponse::failure(id, INTERNAL_ERROR, format!("Internal error: {e}"), None),
        },
        Err(InvocationError::UnknownTool(name)) => {
            tracing::debug!(target: "calculator_mcp::protocol", tool = %name, "Unknown tool");
            MCPResponse::failure(id, INVALID_PARAMS, format!("Unknown tool: {name}"), None)
        }
        Err(InvocationError::Validation(err)) => {
            let fields: Vec<Value> = err
                .issues
                .iter()
                .map(|issue| json!({ "field": issue.field, "message": issue.message }))
                .collect();
            MCPResponse::failure(
                id,
                INVALID_PARAMS,
                format!("Invalid arguments for tool {tool_name}: {err}"),
                Some(json!({ "fields": fields })),
            )
        }
    }
}
