/// Bridge error types
///
/// The `code()` strings are stable and consumed by the external HTTP surface
/// when mapping failures to status codes; changing one is a breaking change.
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Invalid configuration, rejected at construction. Never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No live process, a broken pipe, or an unexpected exit. The restart
    /// policy retries the process; in-flight callers see this immediately.
    #[error("Process crashed: {0}")]
    ProcessCrashed(String),

    /// No response arrived within the configured window.
    #[error("Request timed out after {timeout_ms}ms: {method}")]
    Timeout { method: String, timeout_ms: u64 },

    /// The subprocess reported an application-level JSON-RPC error; its
    /// code and data are carried verbatim.
    #[error("JSON-RPC error {code}: {message}")]
    Protocol {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    /// The tool catalog response was structurally malformed.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Restart budget exhausted; the bridge stays down until started again.
    #[error("Maximum restart attempts ({max_restarts}) exceeded")]
    MaxRestartsExceeded { max_restarts: u32 },

    /// Every port in the allocator's range is currently held.
    #[error("No free ports in range {start}-{end}")]
    PortsExhausted { start: u16, end: u16 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BridgeError {
    /// Convert to error code string
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::Configuration(_) => "CONFIGURATION_ERROR",
            BridgeError::ProcessCrashed(_) => "PROCESS_CRASHED",
            BridgeError::Timeout { .. } => "TIMEOUT",
            BridgeError::Protocol { .. } => "JSON_RPC_ERROR",
            BridgeError::InvalidResponse(_) => "INVALID_RESPONSE",
            BridgeError::MaxRestartsExceeded { .. } => "MAX_RESTARTS_EXCEEDED",
            BridgeError::PortsExhausted { .. } => "PORT_ALLOCATION_ERROR",
            BridgeError::Io(_) => "IO_ERROR",
            BridgeError::Json(_) => "JSON_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(
            BridgeError::ProcessCrashed("gone".into()).code(),
            "PROCESS_CRASHED"
        );
        assert_eq!(
            BridgeError::Timeout {
                method: "ping".into(),
                timeout_ms: 100
            }
            .code(),
            "TIMEOUT"
        );
        assert_eq!(
            BridgeError::Protocol {
                code: -32601,
                message: "method not found".into(),
                data: None
            }
            .code(),
            "JSON_RPC_ERROR"
        );
        assert_eq!(
            BridgeError::MaxRestartsExceeded { max_restarts: 3 }.code(),
            "MAX_RESTARTS_EXCEEDED"
        );
        assert_eq!(
            BridgeError::PortsExhausted {
                start: 10000,
                end: 20000
            }
            .code(),
            "PORT_ALLOCATION_ERROR"
        );
    }

    #[test]
    fn test_protocol_error_display_carries_callee_code() {
        let err = BridgeError::Protocol {
            code: -32602,
            message: "invalid params".into(),
            data: Some(serde_json::json!({"field": "name"})),
        };
        let text = err.to_string();
        assert!(text.contains("-32602"));
        assert!(text.contains("invalid params"));
    }
}
