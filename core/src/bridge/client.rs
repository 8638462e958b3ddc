/// Bridge facade
///
/// The object external collaborators call. Combines the supervisor,
/// correlator, heartbeat, and catalog cache behind `start`/`stop`/`call`/
/// `list_tools`/`status`, one subprocess per instance. Any number of bridges
/// may run in one process; they share nothing.
use super::catalog::{self, ToolDescriptor};
use super::config::BridgeConfig;
use super::error::BridgeError;
use super::protocol::{
    ClientInfo, InitializeParams, InitializeResult, JsonRpcRequest, ServerInfo,
    DEFAULT_PROTOCOL_VERSION,
};
use super::supervisor::{self, Shared};
use crate::events::{BridgeEvent, BridgeObserver, EVENT_CHANNEL_CAPACITY};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Read-only status snapshot; computed on demand, never stored
#[derive(Debug, Clone, Serialize)]
pub struct ProcessStatus {
    pub running: bool,
    pub uptime_ms: u64,
    pub request_count: u64,
    pub error_count: u64,
    pub restart_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_restart: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_heartbeat: Option<DateTime<Utc>>,
}

/// Subprocess protocol bridge
pub struct Bridge {
    state: Arc<Shared>,
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge").finish_non_exhaustive()
    }
}

impl Bridge {
    /// Create a bridge for the given configuration. Fails fast on an
    /// invalid config; nothing is spawned until `start`.
    pub fn new(config: BridgeConfig) -> Result<Self, BridgeError> {
        config.validate()?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            state: Arc::new(Shared::new(config, events)),
        })
    }

    /// Spawn the subprocess. No-op with a warning if already running.
    pub async fn start(&self) -> Result<(), BridgeError> {
        supervisor::start(&self.state).await
    }

    /// Stop the subprocess: fail outstanding calls, close stdin, kill after
    /// the grace period. Suppresses auto-restart. Idempotent.
    pub async fn stop(&self) -> Result<(), BridgeError> {
        supervisor::stop(&self.state).await
    }

    /// Whether a subprocess is currently live
    pub async fn is_running(&self) -> bool {
        self.state.process.lock().await.is_some()
    }

    /// Issue a JSON-RPC request and await its response.
    ///
    /// Resolves exactly once: by a matching response, by the timeout, or by
    /// the exit/stop sweep, whichever wins. Completions carry no ordering
    /// guarantee relative to other concurrent calls.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, BridgeError> {
        let state = &self.state;
        if state.process.lock().await.is_none() {
            return Err(BridgeError::ProcessCrashed("No live process".to_string()));
        }

        state.request_count.fetch_add(1, Ordering::Relaxed);
        let (id, rx) = state.correlator.register();
        let request = JsonRpcRequest::new(id, method, Some(params));
        let mut line = serde_json::to_string(&request)?;
        line.push('\n');

        {
            let mut guard = state.stdin.lock().await;
            let Some(stdin) = guard.as_mut() else {
                state.correlator.discard(id);
                return Err(BridgeError::ProcessCrashed("No live process".to_string()));
            };
            let written = match stdin.write_all(line.as_bytes()).await {
                Ok(()) => stdin.flush().await,
                Err(e) => Err(e),
            };
            if let Err(e) = written {
                state.correlator.discard(id);
                state.error_count.fetch_add(1, Ordering::Relaxed);
                error!(target: "bridge", id, method = %method, error = %e, "Failed to write request");
                return Err(BridgeError::ProcessCrashed(format!(
                    "Failed to write request: {}",
                    e
                )));
            }
        }
        debug!(target: "bridge", id, method = %method, "Request written");

        match tokio::time::timeout(state.config.request_timeout(), rx).await {
            Ok(Ok(outcome)) => outcome,
            // Sender dropped without a verdict; treated as a crash.
            Ok(Err(_)) => Err(BridgeError::ProcessCrashed(
                "Response channel closed".to_string(),
            )),
            Err(_) => {
                // Remove our own entry before failing so a late response is
                // dropped as an unknown id, never double-resolved.
                state.correlator.discard(id);
                state.error_count.fetch_add(1, Ordering::Relaxed);
                warn!(
                    target: "bridge",
                    id,
                    method = %method,
                    timeout_ms = state.config.request_timeout_ms,
                    "Request timed out"
                );
                Err(BridgeError::Timeout {
                    method: method.to_string(),
                    timeout_ms: state.config.request_timeout_ms,
                })
            }
        }
    }

    /// Invoke a named tool: `tools/call` with `{name, arguments}`.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, BridgeError> {
        debug!(target: "bridge", tool = %name, "Calling tool");
        self.call("tools/call", json!({"name": name, "arguments": arguments}))
            .await
    }

    /// Perform the initialize handshake and record the server identity.
    /// Optional; integrations speaking plain JSON-RPC skip it.
    pub async fn initialize(&self) -> Result<ServerInfo, BridgeError> {
        let params = InitializeParams {
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            capabilities: json!({}),
            client_info: ClientInfo {
                name: "gantry".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        let result = self.call("initialize", serde_json::to_value(&params)?).await?;
        let init: InitializeResult = serde_json::from_value(result)
            .map_err(|e| BridgeError::InvalidResponse(format!("Invalid initialize result: {}", e)))?;

        info!(
            target: "bridge",
            server_name = %init.server_info.name,
            server_version = %init.server_info.version,
            protocol_version = %init.protocol_version,
            "Subprocess initialized"
        );
        *self.state.server_info.write().await = Some(init.server_info.clone());
        Ok(init.server_info)
    }

    /// Server identity from the initialize handshake, if performed
    pub async fn server_info(&self) -> Option<ServerInfo> {
        self.state.server_info.read().await.clone()
    }

    /// Return the advertised tool catalog, fetching it over the wire at most
    /// once per process lifetime. The cache is cleared on crash, restart,
    /// and stop, so the next call re-discovers tools from the new process.
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, BridgeError> {
        if let Some(cached) = self.state.catalog.read().await.clone() {
            debug!(target: "bridge", count = cached.len(), "Tool catalog served from cache");
            return Ok(cached);
        }

        let result = self.call("tools/list", json!({})).await?;
        let tools = catalog::parse_catalog(&result)?;
        info!(target: "bridge", count = tools.len(), "Tool catalog fetched");
        *self.state.catalog.write().await = Some(tools.clone());
        Ok(tools)
    }

    /// Status snapshot. Valid in every state; never fails.
    pub async fn status(&self) -> ProcessStatus {
        let state = &self.state;
        ProcessStatus {
            running: state.process.lock().await.is_some(),
            uptime_ms: state
                .started_at
                .read()
                .await
                .map(|t| t.elapsed().as_millis() as u64)
                .unwrap_or(0),
            request_count: state.request_count.load(Ordering::Relaxed),
            error_count: state.error_count.load(Ordering::Relaxed),
            restart_count: state.restart_count.load(Ordering::SeqCst),
            last_restart: *state.last_restart.read().await,
            pid: *state.pid.read().await,
            last_heartbeat: *state.last_heartbeat.read().await,
        }
    }

    /// Subscribe to bridge events (exit, restart, fatal, notifications)
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.state.events.subscribe()
    }

    /// Forward events to an observer until the bridge is dropped or the
    /// returned handle is aborted.
    pub fn attach_observer(&self, observer: Arc<dyn BridgeObserver>) -> JoinHandle<()> {
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => observer.on_event(event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(target: "bridge", skipped, "Observer lagged; events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Number of requests currently awaiting a response
    pub fn pending_requests(&self) -> usize {
        self.state.correlator.pending_count()
    }
}
