/// Logging Setup
///
/// All log output goes to stderr so it never interleaves with JSON-RPC
/// messages on stdout in STDIO mode. `log` records from actix-web's
/// `Logger` middleware are forwarded through the subscriber's `tracing-log`
/// bridge.

use tracing_subscriber::{EnvFilter, fmt};

/// Initialize the global `tracing` subscriber. Filter comes from `RUST_LOG`,
/// defaulting to `info`. Calling this twice is a no-op.
pub fn init_tracing() -> std::io::Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| std::io::Error::other(format!("failed to initialize tracing: {err}")))
}
