//! Controller configuration.
//!
//! Read once from environment variables at startup:
//! - `ROLE_LABEL` (required): label whose value names the node's role
//! - `ROLE_LABEL_REPLACE` (optional): `true`/`1`/`yes` removes other role markers
//! - `SERVER_PORT` (optional, default 8080): metrics and probe port
//! - `RUST_LOG` (optional): tracing filter directives, wins over `LOG_LEVEL`
//! - `LOG_LEVEL` (optional): `debug`, `info`, `warn` or `error`, default `info`

use crate::error::ControllerError;
use std::env;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Default port for the metrics and probe server
pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// Runtime configuration for the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Label key carrying the node's intended role
    pub role_label: String,
    /// Remove other role markers when adding a new one
    pub replace: bool,
    /// Port for `/metrics`, `/healthz` and `/readyz`
    pub server_port: u16,
    /// Raw `RUST_LOG` directives
    pub rust_log: Option<String>,
    /// Level used when `RUST_LOG` is unset or unparsable
    pub log_level: LevelFilter,
}

impl ControllerConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let role_label = lookup("ROLE_LABEL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                ControllerError::InvalidConfig(
                    "ROLE_LABEL environment variable is required".to_string(),
                )
            })?;

        let replace = lookup("ROLE_LABEL_REPLACE").is_some_and(|v| parse_flag(&v));

        let server_port = match lookup("SERVER_PORT") {
            None => DEFAULT_SERVER_PORT,
            Some(raw) => parse_port(&raw)?,
        };

        let rust_log = lookup("RUST_LOG")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let log_level = lookup("LOG_LEVEL").map_or(LevelFilter::INFO, |v| parse_log_level(&v));

        Ok(Self {
            role_label,
            replace,
            server_port,
            rust_log,
            log_level,
        })
    }

    /// Builds the tracing filter: `RUST_LOG` if it parses, else `log_level`.
    #[must_use]
    pub fn env_filter(&self) -> EnvFilter {
        self.rust_log
            .as_deref()
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::default().add_directive(self.log_level.into()))
    }
}

fn parse_log_level(raw: &str) -> LevelFilter {
    match raw.trim().to_lowercase().as_str() {
        "debug" => LevelFilter::DEBUG,
        "warn" | "warning" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => LevelFilter::INFO,
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

fn parse_port(raw: &str) -> Result<u16, ControllerError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(DEFAULT_SERVER_PORT);
    }
    match raw.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ControllerError::InvalidConfig(format!(
            "invalid SERVER_PORT environment variable: {raw:?}"
        ))),
    }
}
