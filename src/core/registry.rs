/// Tool Registry and Dispatcher
///
/// The registry is built once at startup, then shared read-only (behind an
/// `Arc`) by every transport. Each tool pairs a definition, served from
/// `tools/list`, with a handler. A handler validates its raw JSON arguments
/// synchronously and, on success, hands back a future producing the result
/// envelope.

use std::collections::HashMap;

use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;

use crate::core::error::{InvocationError, RegistryError, ValidationError};

/// MCP tool definition structure.
///
/// Serialized as-is in `tools/list` responses.
#[derive(Serialize, Debug, Clone)]
pub struct MCPTool {
    /// Unique tool identifier (e.g., "add", "get_alerts")
    pub name: String,
    /// Human-readable description of what the tool does
    pub description: String,
    /// JSON Schema defining the tool's input parameters
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// One block of tool output.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
}

/// The uniform envelope every successful tool call returns.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CallToolResult {
    pub content: Vec<Content>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl CallToolResult {
    /// Envelope holding a single text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Text of the first content block, if any.
    #[cfg(test)]
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().map(|block| match block {
            Content::Text { text } => text.as_str(),
        })
    }
}

/// Deferred tool execution, produced after arguments have been validated.
pub type ToolFuture = BoxFuture<'static, CallToolResult>;

/// Tool handler function type definition.
///
/// Validation failures are returned immediately; the future runs the tool.
/// Must be Send + Sync to be shared across actix worker threads.
pub type ToolHandler = Box<dyn Fn(Value) -> Result<ToolFuture, ValidationError> + Send + Sync>;

/// Registry of available MCP tools.
pub struct ToolRegistry {
    tools: Vec<MCPTool>,
    handlers: HashMap<String, ToolHandler>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            handlers: HashMap::new(),
        }
    }

    /// Register a tool with the registry.
    ///
    /// Names must be unique and the input schema must describe a JSON object.
    pub fn register(&mut self, tool: MCPTool, handler: ToolHandler) -> Result<(), RegistryError> {
        if self.handlers.contains_key(&tool.name) {
            return Err(RegistryError::DuplicateTool { name: tool.name });
        }
        check_schema(&tool)?;

        tracing::debug!(target: "calculator_mcp::registry", tool = %tool.name, "Registered tool");
        self.handlers.insert(tool.name.clone(), handler);
        self.tools.push(tool);
        Ok(())
    }

    /// Tool definitions in registration order.
    pub fn tools(&self) -> &[MCPTool] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Look up a tool, validate `arguments` against it and run it.
    pub async fn invoke(&self, name: &str, arguments: Value) -> Result<CallToolResult, InvocationError> {
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| InvocationError::UnknownTool(name.to_string()))?;
        let run = handler(arguments)?;
        Ok(run.await)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn check_schema(tool: &MCPTool) -> Result<(), RegistryError> {
    let malformed = |reason| RegistryError::MalformedSchema {
        name: tool.name.clone(),
        reason,
    };

    let schema = tool
        .input_schema
        .as_object()
        .ok_or_else(|| malformed("schema must be a JSON object"))?;
    if schema.get("type").and_then(Value::as_str) != Some("object") {
        return Err(malformed("schema type must be \"object\""));
    }
    if let Some(properties) = schema.get("properties") {
        if !properties.is_object() {
            return Err(malformed("properties must be a JSON object"));
        }
    }
    Ok(())
}
