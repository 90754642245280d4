/// MCP Server Entry Point
///
/// Loads settings from the environment, builds the tool registry once, and
/// starts the configured transports. Startup failures (bad configuration,
/// conflicting tool registrations) abort with a non-zero exit status.
///
/// See `core::config` for the recognized environment variables.

mod core;
mod tools;

use crate::core::config::{Settings, TransportMode};
use crate::core::protocol::AppState;
use crate::core::{server, telemetry};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    telemetry::init_tracing()?;

    let settings = Settings::from_env().map_err(|err| {
        tracing::error!(target: "calculator_mcp::config", error = %err, "Invalid configuration");
        std::io::Error::other(err)
    })?;
    let registry = tools::initialize_tools(&settings).map_err(|err| {
        tracing::error!(target: "calculator_mcp::registry", error = %err, "Tool registration failed");
        std::io::Error::other(err)
    })?;

    let state = AppState {
        server_name: settings.server_name.clone(),
        server_version: settings.server_version.clone(),
    };

    tracing::info!(
        target: "calculator_mcp::server",
        transport = settings.transport.as_str(),
        "Selected transport mode"
    );

    match settings.transport {
        TransportMode::Stdio => server::run_server_stdio(state, registry).await,
        TransportMode::Http => server::run_server_http(&settings, registry).await,
        TransportMode::Both => {
            // STDIO runs in the background; the HTTP server owns the process lifetime
            let stdio_registry = registry.clone();
            let stdio_handle = tokio::spawn(async move {
                if let Err(e) = server::run_server_stdio(state, stdio_registry).await {
                    tracing::error!(target: "calculator_mcp::server", error = %e, "STDIO server error");
                }
            });

            let http_result = server::run_server_http(&settings, registry).await;
            stdio_handle.abort();
            http_result
        }
    }
}
