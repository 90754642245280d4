/// Server Configuration
///
/// Settings are read once from environment variables at startup. Missing
/// variables fall back to defaults; present but unparseable values are a
/// startup error.
///
/// Environment Variables:
/// - SERVER_NAME: Name reported in `initialize` (default: "Authless Calculator")
/// - SERVER_VERSION: Version reported in `initialize` (default: "1.0.0")
/// - MCP_TRANSPORT_MODE: "http", "stdio", or "both" (default: "http")
/// - HOST: Bind address for HTTP mode (default: "0.0.0.0")
/// - PORT: Port number for HTTP mode (default: 3000)
/// - WORKER_THREADS: Actix worker count (default: CPU count, capped at 16)
/// - NWS_API_BASE: National Weather Service API root (default: "https://api.weather.gov")

use crate::core::error::ConfigError;

pub const DEFAULT_SERVER_NAME: &str = "Authless Calculator";
pub const DEFAULT_SERVER_VERSION: &str = "1.0.0";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_NWS_API_BASE: &str = "https://api.weather.gov";

/// Which transports the process should serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Http,
    Stdio,
    Both,
}

impl TransportMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "http" => Some(Self::Http),
            "stdio" => Some(Self::Stdio),
            "both" => Some(Self::Both),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Stdio => "stdio",
            Self::Both => "both",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_name: String,
    pub server_version: String,
    pub transport: TransportMode,
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub nws_api_base: String,
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str, default: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let transport_raw = var("MCP_TRANSPORT_MODE", "http");
        let transport = TransportMode::parse(&transport_raw).ok_or_else(|| {
            ConfigError::InvalidValue {
                key: "MCP_TRANSPORT_MODE",
                value: transport_raw.clone(),
                message: "must be 'http', 'stdio', or 'both'".to_string(),
            }
        })?;

        let port_raw = var("PORT", &DEFAULT_PORT.to_string());
        let port = port_raw
            .trim()
            .parse::<u16>()
            .map_err(|err| ConfigError::InvalidValue {
                key: "PORT",
                value: port_raw.clone(),
                message: err.to_string(),
            })?;

        // Defaults to CPU count but capped at 16 to avoid excessive context switching
        let workers = match lookup("WORKER_THREADS").filter(|v| !v.trim().is_empty()) {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "WORKER_THREADS",
                        value: raw,
                        message: "must be a positive integer".to_string(),
                    });
                }
            },
            None => num_cpus::get().clamp(1, 16),
        };

        let nws_api_base = var("NWS_API_BASE", DEFAULT_NWS_API_BASE)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            server_name: var("SERVER_NAME", DEFAULT_SERVER_NAME),
            server_version: var("SERVER_VERSION", DEFAULT_SERVER_VERSION),
            transport,
            host: var("HOST", DEFAULT_HOST),
            port,
            workers,
            nws_api_base,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings_from(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let settings = settings_from(&[]).expect("defaults should load");

        assert_eq!(settings.server_name, "Authless Calculator");
        assert_eq!(settings.server_version, "1.0.0");
        assert_eq!(settings.transport, TransportMode::Http);
        assert_eq!(settings.bind_addr(), "0.0.0.0:3000");
        assert_eq!(settings.nws_api_base, "https://api.weather.gov");
        assert!((1..=16).contains(&settings.workers));
    }

    #[test]
    fn overrides_are_honoured() {
        let settings = settings_from(&[
            ("MCP_TRANSPORT_MODE", "Both"),
            ("HOST", "127.0.0.1"),
            ("PORT", "8787"),
            ("WORKER_THREADS", "2"),
            ("NWS_API_BASE", "http://localhost:9000/"),
        ])
        .expect("overrides should load");

        assert_eq!(settings.transport, TransportMode::Both);
        assert_eq!(settings.bind_addr(), "127.0.0.1:8787");
        assert_eq!(settings.workers, 2);
        assert_eq!(settings.nws_api_base, "http://localhost:9000");
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = settings_from(&[("PORT", "not-a-port")]).expect_err("port must parse");
        match err {
            ConfigError::InvalidValue { key, .. } => assert_eq!(key, "PORT"),
        }
    }

    #[test]
    fn invalid_transport_is_rejected() {
        let err = settings_from(&[("MCP_TRANSPORT_MODE", "carrier-pigeon")])
            .expect_err("transport must be known");
        match err {
            ConfigError::InvalidValue { key, value, .. } => {
                assert_eq!(key, "MCP_TRANSPORT_MODE");
                assert_eq!(value, "carrier-pigeon");
            }
        }
    }

    #[test]
    fn zero_workers_is_rejected() {
        assert!(settings_from(&[("WORKER_THREADS", "0")]).is_err());
    }
}
