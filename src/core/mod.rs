/// Core Server Framework Module
///
/// - config.rs: Environment-driven settings
/// - error.rs: Error types for startup, dispatch and the weather feed
/// - protocol.rs: JSON-RPC 2.0 types and MCP method routing
/// - registry.rs: Tool registry and dispatcher
/// - server.rs: HTTP (streamable HTTP and SSE) and STDIO transports
/// - sse.rs: SSE session table
/// - telemetry.rs: Logging setup

pub mod config;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod sse;
pub mod telemetry;
