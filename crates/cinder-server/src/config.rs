//! Server configuration.
//!
//! Loading flow, in priority order: compiled defaults, then an optional
//! JSON file deep-merged over them, then `CINDER_*` environment variable
//! overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Configuration for the Cinder gateway.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind; `0` auto-assigns (default `8545`).
    pub port: u16,
    /// Maximum accepted HTTP body size in bytes. Oversized bodies are
    /// rejected at the transport level, before dispatch.
    pub max_body_bytes: usize,
    /// Capacity of each connection's outbound message channel.
    pub ws_channel_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8545,
            max_body_bytes: 16 * 1024 * 1024, // 16 MB
            ws_channel_capacity: 1024,
        }
    }
}

/// Configuration loading failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// The file or merged document is not valid for `ServerConfig`.
    #[error("invalid config: {0}")]
    Invalid(#[from] serde_json::Error),
}

impl ServerConfig {
    /// Load configuration from a JSON file with env overrides.
    ///
    /// A missing file is not an error — defaults apply. Invalid JSON is.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let defaults = serde_json::to_value(Self::default())?;

        let merged = if path.exists() {
            debug!(?path, "loading config from file");
            let content = std::fs::read_to_string(path)?;
            let user: Value = serde_json::from_str(&content)?;
            deep_merge(defaults, user)
        } else {
            debug!(?path, "config file not found, using defaults");
            defaults
        };

        let mut config: Self = serde_json::from_value(merged)?;
        apply_env_overrides(&mut config);
        Ok(config)
    }
}

/// Recursive deep merge of two JSON values.
///
/// - Objects merge recursively (source overrides target per key)
/// - Arrays and primitives are replaced entirely by source
/// - `null` values in source are skipped, preserving target
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_value) in source_map {
                if source_value.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_value) => deep_merge(target_value, source_value),
                    None => source_value,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

fn apply_env_overrides(config: &mut ServerConfig) {
    if let Ok(host) = std::env::var("CINDER_HOST") {
        config.host = host;
    }
    if let Ok(port) = std::env::var("CINDER_PORT") {
        match port.parse() {
            Ok(port) => config.port = port,
            Err(_) => warn!(port, "ignoring unparseable CINDER_PORT"),
        }
    }
}
