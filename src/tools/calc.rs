/// Calculator Tools
///
/// `add` sums two numbers. `calculate` applies one of four arithmetic
/// operations; division by zero is answered with a text message rather than
/// an error.

use serde_json::{Value, json};

use crate::core::error::{RegistryError, ValidationError};
use crate::core::registry::{CallToolResult, MCPTool, ToolFuture, ToolHandler, ToolRegistry};
use crate::tools::args::Args;

pub const DIVIDE_BY_ZERO: &str = "Error: Cannot divide by zero";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AddArgs {
    pub a: f64,
    pub b: f64,
}

impl AddArgs {
    pub fn parse(raw: &Value) -> Result<Self, ValidationError> {
        let mut args = Args::new(raw)?;
        let (a, b) = (args.number("a"), args.number("b"));
        match (a, b) {
            (Some(a), Some(b)) => Ok(Self { a, b }),
            _ => Err(args.into_error()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

const OPERATIONS: &[(&str, Operation)] = &[
    ("add", Operation::Add),
    ("subtract", Operation::Subtract),
    ("multiply", Operation::Multiply),
    ("divide", Operation::Divide),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalculateArgs {
    pub operation: Operation,
    pub a: f64,
    pub b: f64,
}

impl CalculateArgs {
    pub fn parse(raw: &Value) -> Result<Self, ValidationError> {
        let mut args = Args::new(raw)?;
        let operation = args.one_of("operation", OPERATIONS);
        let (a, b) = (args.number("a"), args.number("b"));
        match (operation, a, b) {
            (Some(operation), Some(a), Some(b)) => Ok(Self { operation, a, b }),
            _ => Err(args.into_error()),
        }
    }
}

pub fn add(args: AddArgs) -> CallToolResult {
    CallToolResult::text(format_number(args.a + args.b))
}

pub fn calculate(args: CalculateArgs) -> CallToolResult {
    let CalculateArgs { operation, a, b } = args;
    let result = match operation {
        Operation::Add => a + b,
        Operation::Subtract => a - b,
        Operation::Multiply => a * b,
        Operation::Divide => {
            if b == 0.0 {
                return CallToolResult::text(DIVIDE_BY_ZERO);
            }
            a / b
        }
    };
    CallToolResult::text(format_number(result))
}

/// Render a number the way JavaScript's `String(n)` does: no trailing `.0`,
/// no negative zero, named non-finite values, and exponent form for
/// magnitudes at or above 1e21 or below 1e-6.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        exponent_form(n)
    } else {
        n.to_string()
    }
}

/// `1e21` becomes `1e+21`, `1.5e-7` stays as is.
fn exponent_form(n: f64) -> String {
    let shortest = format!("{n:e}");
    match shortest.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => shortest,
    }
}

pub fn register(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    let add_tool = MCPTool {
        name: "add".to_string(),
        description: "Add two numbers.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "a": { "type": "number" },
                "b": { "type": "number" }
            },
            "required": ["a", "b"]
        }),
    };
    let add_handler: ToolHandler = Box::new(|raw: Value| -> Result<ToolFuture, ValidationError> {
        let args = AddArgs::parse(&raw)?;
        Ok(Box::pin(async move { add(args) }) as ToolFuture)
    });
    registry.register(add_tool, add_handler)?;

    let calculate_tool = MCPTool {
        name: "calculate".to_string(),
        description: "Perform add, subtract, multiply, or divide on two numbers.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "operation": {
                    "type": "string",
                    "enum": ["add", "subtract", "multiply", "divide"]
                },
                "a": { "type": "number" },
                "b": { "type": "number" }
            },
            "required": ["operation", "a", "b"]
        }),
    };
    let calculate_handler: ToolHandler = Box::new(|raw: Value| -> Result<ToolFuture, ValidationError> {
        let args = CalculateArgs::parse(&raw)?;
        Ok(Box::pin(async move { calculate(args) }) as ToolFuture)
    });
    registry.register(calculate_tool, calculate_handler)
}
