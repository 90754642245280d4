/// Error Types
///
/// Startup failures (configuration, tool registration) are fatal. Invocation
/// failures are reported to the client as JSON-RPC errors. Weather feed
/// failures never leave the `get_alerts` tool; they are rendered as text.

use std::fmt;

use thiserror::Error;

/// Invalid environment configuration detected at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable {key} has invalid value `{value}`: {message}")]
    InvalidValue {
        key: &'static str,
        value: String,
        message: String,
    },
}

/// Tool registration failures. The registry is built once at startup, so
/// these abort the process.
#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("Tool `{name}` is already registered")]
    DuplicateTool { name: String },
    #[error("Tool `{name}` has a malformed input schema: {reason}")]
    MalformedSchema { name: String, reason: &'static str },
}

/// A single argument that failed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

/// All argument problems found for one tool call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.issues.push(FieldIssue {
            field: field.to_string(),
            message: message.into(),
        });
    }

    /// Names of the offending fields, in the order they were checked.
    pub fn fields(&self) -> Vec<&str> {
        self.issues.iter().map(|issue| issue.field.as_str()).collect()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid arguments: ")?;
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", issue.field, issue.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Failures raised while dispatching a `tools/call`.
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Failure talking to the weather alerts feed or decoding its body.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{message}")]
    Network { message: String },
    #[error("{0}")]
    Body(#[from] serde_json::Error),
    #[error("{message}")]
    Malformed { message: String },
}
