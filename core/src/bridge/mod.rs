/// Subprocess protocol bridge
///
/// Keeps an external integration program alive and translates its
/// newline-delimited JSON-RPC 2.0 stdio protocol into request/response calls.
///
/// Architecture:
/// - `config`: validated, immutable bridge configuration
/// - `protocol`: JSON-RPC 2.0 envelope types and message classification
/// - `framer`: reassembles discrete lines from raw stdout chunks
/// - `correlator`: matches asynchronous responses to their originating requests
/// - `supervisor`: spawns the process, detects exit, drives the restart policy
/// - `heartbeat`: periodic liveness probe independent of request traffic
/// - `catalog`: one-fetch-per-lifetime cache of the advertised tool list
/// - `client`: the `Bridge` facade external collaborators call
pub mod catalog;
pub mod client;
pub mod config;
pub mod correlator;
pub mod error;
pub mod framer;
pub mod heartbeat;
pub mod protocol;
pub mod supervisor;

pub use catalog::{ToolDescriptor, ToolSchema};
pub use client::{Bridge, ProcessStatus};
pub use config::BridgeConfig;
pub use error::BridgeError;
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, ServerInfo};
