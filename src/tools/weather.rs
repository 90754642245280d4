/// Weather Alerts Tool
///
/// `get_alerts` looks up active alerts for a US state through the National
/// Weather Service API. Every outcome, including HTTP errors and network
/// failures, is returned to the caller as a text result.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, header};
use serde_json::{Value, json};

use crate::core::error::{FetchError, RegistryError, ValidationError};
use crate::core::registry::{CallToolResult, MCPTool, ToolFuture, ToolHandler, ToolRegistry};
use crate::tools::args::Args;
use crate::tools::calc::format_number;

pub const USER_AGENT: &str = "weather-app/1.0";
pub const ACCEPT_GEO_JSON: &str = "application/geo+json";
pub const NO_ALERTS: &str = "No active alerts for this state.";
const ALERT_SEPARATOR: &str = "\n---\n";

/// Raw answer from the alerts feed.
#[derive(Debug, Clone)]
pub struct FeedResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl FeedResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Source of alert data. The production implementation is `NwsClient`.
#[async_trait]
pub trait AlertFeed: Send + Sync {
    /// Issue a single GET for `url`.
    async fn get(&self, url: &str) -> Result<FeedResponse, FetchError>;
}

/// National Weather Service HTTP client.
pub struct NwsClient {
    client: Client,
}

impl NwsClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for NwsClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AlertFeed for NwsClient {
    async fn get(&self, url: &str) -> Result<FeedResponse, FetchError> {
        let network = |e: reqwest::Error| FetchError::Network {
            message: e.to_string(),
        };

        let response = self
            .client
            .get(url)
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::ACCEPT, ACCEPT_GEO_JSON)
            .send()
            .await
            .map_err(network)?;

        let status = response.status();
        let body = if status.is_success() {
            response.text().await.map_err(network)?
        } else {
            String::new()
        };

        Ok(FeedResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertsArgs {
    pub state: String,
}

impl AlertsArgs {
    pub fn parse(raw: &Value) -> Result<Self, ValidationError> {
        let mut args = Args::new(raw)?;
        match args.string_of_length("state", 2) {
            Some(state) => Ok(Self {
                state: state.to_string(),
            }),
            None => Err(args.into_error()),
        }
    }
}

/// Feed URL for a state code, uppercased.
pub fn alerts_url(api_base: &str, state: &str) -> String {
    format!("{}/alerts/active/area/{}", api_base, state.to_uppercase())
}

pub async fn get_alerts(feed: &dyn AlertFeed, api_base: &str, args: AlertsArgs) -> CallToolResult {
    let url = alerts_url(api_base, &args.state);
    tracing::info!(target: "calculator_mcp::tools", url = %url, "Fetching weather alerts");

    let text = match fetch_alerts(feed, &url).await {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(
                target: "calculator_mcp::tools",
                url = %url,
                error = %err,
                "Weather alerts request failed"
            );
            format!("Error fetching weather alerts: {err}")
        }
    };
    CallToolResult::text(text)
}

async fn fetch_alerts(feed: &dyn AlertFeed, url: &str) -> Result<String, FetchError> {
    let response = feed.get(url).await?;
    if !response.is_success() {
        return Ok(format!(
            "Error fetching alerts: {} {}",
            response.status, response.status_text
        ));
    }
    render_alerts(&response.body)
}

/// Render a GeoJSON alert collection. The body is read loosely: a root
/// without `features` means no alerts, while a `null` root, a non-list
/// `features`, or a feature without `properties` is an error.
fn render_alerts(body: &str) -> Result<String, FetchError> {
    let data: Value = serde_json::from_str(body)?;
    if data.is_null() {
        return Err(malformed("Cannot read properties of null (reading 'features')"));
    }

    let features = data.get("features").unwrap_or(&Value::Null);
    if !is_truthy(features) || features.as_array().is_some_and(Vec::is_empty) {
        return Ok(NO_ALERTS.to_string());
    }
    let Some(features) = features.as_array() else {
        return Err(malformed("features.map is not a function"));
    };

    let blocks = features
        .iter()
        .map(|feature| {
            if feature.is_null() {
                return Err(malformed("Cannot read properties of null (reading 'properties')"));
            }
            match feature.get("properties") {
                None => Err(malformed("Cannot read properties of undefined (reading 'event')")),
                Some(Value::Null) => Err(malformed("Cannot read properties of null (reading 'event')")),
                Some(props) => Ok(format_alert(props)),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(blocks.join(ALERT_SEPARATOR))
}

fn malformed(message: &str) -> FetchError {
    FetchError::Malformed {
        message: message.to_string(),
    }
}

/// Five-line text block for one alert's `properties`. Absent, empty, zero,
/// or `false` fields get a fallback; other values are stringified.
pub fn format_alert(props: &Value) -> String {
    let field = |key: &str, fallback: &str| {
        props
            .get(key)
            .filter(|value| is_truthy(value))
            .map(display_value)
            .unwrap_or_else(|| fallback.to_string())
    };

    format!(
        "Event: {}\nArea: {}\nSeverity: {}\nDescription: {}\nInstructions: {}",
        field("event", "Unknown"),
        field("areaDesc", "Unknown"),
        field("severity", "Unknown"),
        field("description", "No description available"),
        field("instruction", "No specific instructions provided"),
    )
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.as_f64().map(format_number).unwrap_or_else(|| n.to_string()),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| if item.is_null() { String::new() } else { display_value(item) })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

pub fn register(
    registry: &mut ToolRegistry,
    feed: Arc<dyn AlertFeed>,
    api_base: String,
) -> Result<(), RegistryError> {
    let tool = MCPTool {
        name: "get_alerts".to_string(),
        description: "Get active weather alerts for a US state.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "state": {
                    "type": "string",
                    "minLength": 2,
                    "maxLength": 2,
                    "description": "Two-letter US state code (e.g. CA, NY, IL)"
                }
            },
            "required": ["state"]
        }),
    };

    let api_base = Arc::new(api_base);
    let handler: ToolHandler = Box::new(move |raw: Value| -> Result<ToolFuture, ValidationError> {
        let args = AlertsArgs::parse(&raw)?;
        let feed = Arc::clone(&feed);
        let api_base = Arc::clone(&api_base);
        Ok(Box::pin(async move { get_alerts(feed.as_ref(), &api_base, args).await }) as ToolFuture)
    });
    registry.register(tool, handler)
}
