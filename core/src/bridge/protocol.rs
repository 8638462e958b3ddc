/// JSON-RPC 2.0 protocol types
///
/// Wire format: newline-delimited JSON over the subprocess's stdio.
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default protocol version advertised during the initialize handshake
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC 2.0 Request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String, // always "2.0"
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value, // string or number; only integer ids are ours
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 Error object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A decoded incoming line, classified by shape
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    /// Carries an `id` plus `result` or `error`: resolves a pending request
    Response(JsonRpcResponse),
    /// No `id`: an unsolicited server-to-client notification
    Notification { method: String, params: Value },
    /// Parsed as JSON but matches neither shape (e.g., an echoed request)
    Unclassified(Value),
}

/// Classify one complete line of subprocess output.
///
/// Returns `None` when the line is not valid JSON; the framer logs and
/// skips those without tearing the bridge down.
pub fn classify_line(line: &str) -> Option<IncomingMessage> {
    let value: Value = serde_json::from_str(line).ok()?;

    let has_id = value.get("id").map(|id| !id.is_null()).unwrap_or(false);
    if has_id {
        if value.get("result").is_some() || value.get("error").is_some() {
            if let Ok(response) = serde_json::from_value::<JsonRpcResponse>(value.clone()) {
                return Some(IncomingMessage::Response(response));
            }
        }
        return Some(IncomingMessage::Unclassified(value));
    }

    if let Some(method) = value.get("method").and_then(Value::as_str) {
        let params = value.get("params").cloned().unwrap_or(Value::Null);
        return Some(IncomingMessage::Notification {
            method: method.to_string(),
            params,
        });
    }

    Some(IncomingMessage::Unclassified(value))
}

/// initialize request parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeParams {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: Value,
    #[serde(rename = "clientInfo")]
    pub client_info: ClientInfo,
}

/// Client information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

/// initialize result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: Value,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

/// Server information reported by the subprocess
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}
