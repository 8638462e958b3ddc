/// Bridge configuration
///
/// Immutable after construction. `Bridge::new` validates the configuration
/// and fails fast, so a live bridge never holds an invalid config.
use super::error::BridgeError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Default per-request timeout in milliseconds
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
/// Default maximum automatic restart attempts
pub const DEFAULT_MAX_RESTARTS: u32 = 3;
/// Default heartbeat probe interval in milliseconds
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 30_000;
/// Default restart backoff unit in milliseconds (linear: unit x attempt)
pub const DEFAULT_RESTART_BACKOFF_MS: u64 = 1_000;

/// Shell metacharacters rejected in the command string
const SHELL_METACHARACTERS: &[&str] = &["&&", "||", ";", "|"];

/// Bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Command to execute (e.g., "node", "python")
    pub command: String,
    /// Arguments to pass to command
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment variable overrides (flat string map)
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Working directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Maximum automatic restart attempts before the bridge stays down
    #[serde(default = "default_max_restarts")]
    pub max_restarts: u32,
    /// Heartbeat probe interval in milliseconds
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Restart backoff unit in milliseconds (delay = unit x attempt)
    #[serde(default = "default_restart_backoff_ms")]
    pub restart_backoff_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}
fn default_max_restarts() -> u32 {
    DEFAULT_MAX_RESTARTS
}
fn default_heartbeat_interval_ms() -> u64 {
    DEFAULT_HEARTBEAT_INTERVAL_MS
}
fn default_restart_backoff_ms() -> u64 {
    DEFAULT_RESTART_BACKOFF_MS
}

impl BridgeConfig {
    /// Create a configuration with defaults for the given command
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
            cwd: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            max_restarts: DEFAULT_MAX_RESTARTS,
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            restart_backoff_ms: DEFAULT_RESTART_BACKOFF_MS,
        }
    }

    /// Parse a configuration from a JSON value, rejecting environment maps
    /// whose values are not flat strings.
    pub fn from_value(value: serde_json::Value) -> Result<Self, BridgeError> {
        if let Some(env) = value.get("env") {
            let map = env.as_object().ok_or_else(|| {
                BridgeError::Configuration("env must be an object".to_string())
            })?;
            for (key, val) in map {
                if !val.is_string() {
                    return Err(BridgeError::Configuration(format!(
                        "env value for '{}' must be a string",
                        key
                    )));
                }
            }
        }

        let config: BridgeConfig = serde_json::from_value(value)
            .map_err(|e| BridgeError::Configuration(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration. Pure; called once at bridge construction.
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.command.trim().is_empty() {
            return Err(BridgeError::Configuration(
                "command must not be empty".to_string(),
            ));
        }

        for meta in SHELL_METACHARACTERS {
            if self.command.contains(meta) {
                return Err(BridgeError::Configuration(format!(
                    "command contains shell metacharacter '{}'",
                    meta
                )));
            }
        }

        Ok(())
    }

    /// Per-request timeout as a `Duration`
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Heartbeat probe interval as a `Duration`
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    /// Restart backoff unit as a `Duration`
    pub fn restart_backoff(&self) -> Duration {
        Duration::from_millis(self.restart_backoff_ms)
    }
}
