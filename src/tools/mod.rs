/// Tools Module
///
/// Each tool module exports a `register` function that adds its tools to the
/// registry during server initialization.

pub mod args;
pub mod calc;
pub mod weather;

use std::sync::Arc;

use crate::core::config::Settings;
use crate::core::error::RegistryError;
use crate::core::registry::ToolRegistry;
use crate::tools::weather::{AlertFeed, NwsClient};

/// Build the registry with every available tool.
pub fn initialize_tools(settings: &Settings) -> Result<Arc<ToolRegistry>, RegistryError> {
    let feed: Arc<dyn AlertFeed> = Arc::new(NwsClient::new());
    initialize_tools_with_feed(feed, settings.nws_api_base.clone())
}

/// Same as `initialize_tools`, with the weather feed supplied by the caller.
pub fn initialize_tools_with_feed(
    feed: Arc<dyn AlertFeed>,
    nws_api_base: String,
) -> Result<Arc<ToolRegistry>, RegistryError> {
    let mut registry = ToolRegistry::new();

    calc::register(&mut registry)?;
    weather::register(&mut registry, feed, nws_api_base)?;

    tracing::info!(
        target: "calculator_mcp::registry",
        tools = registry.len(),
        "Tool registry initialized"
    );
    Ok(Arc::new(registry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::DEFAULT_NWS_API_BASE;

    #[test]
    fn registers_all_tools_in_order() {
        let feed: Arc<dyn AlertFeed> = Arc::new(NwsClient::new());
        let registry = initialize_tools_with_feed(feed, DEFAULT_NWS_API_BASE.to_string())
            .expect("tool names are unique");

        let names: Vec<&str> = registry.tools().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["add", "calculate", "get_alerts"]);
    }
}
