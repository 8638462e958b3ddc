/// Process supervisor
///
/// Owns the subprocess handle: spawn, exit detection, graceful/forced stop,
/// and the bounded linear-backoff restart policy. Exit is detected through
/// stdout EOF; a generation counter ties each reader and heartbeat task to
/// the process instance it was spawned for, so a stale task observing EOF
/// after a restart or stop cannot tear down the wrong process.
use super::catalog::ToolDescriptor;
use super::config::BridgeConfig;
use super::correlator::Correlator;
use super::error::BridgeError;
use super::framer::LineFramer;
use super::heartbeat;
use super::protocol::{classify_line, IncomingMessage, ServerInfo};
use crate::events::BridgeEvent;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// How long `stop` waits for a graceful exit before killing the process
pub(crate) const STOP_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// State shared by the facade, the supervisor, and its background tasks.
/// One instance per bridge; nothing here is global.
pub(crate) struct Shared {
    pub(crate) config: BridgeConfig,
    /// Live subprocess handle; exactly one or zero per bridge
    pub(crate) process: Mutex<Option<Child>>,
    /// Writable end of the subprocess's stdin
    pub(crate) stdin: Mutex<Option<tokio::process::ChildStdin>>,
    pub(crate) correlator: Correlator,
    /// Cached tool catalog; cleared on every crash, restart, and stop
    pub(crate) catalog: RwLock<Option<Vec<ToolDescriptor>>>,
    /// Server identity from the initialize handshake, if performed
    pub(crate) server_info: RwLock<Option<ServerInfo>>,
    pub(crate) events: broadcast::Sender<BridgeEvent>,
    /// Set by `stop`; suppresses auto-restart
    pub(crate) stopping: AtomicBool,
    /// Spawn epoch; bumped on every spawn and on stop
    pub(crate) generation: AtomicU64,
    pub(crate) restart_count: AtomicU32,
    pub(crate) request_count: AtomicU64,
    pub(crate) error_count: AtomicU64,
    pub(crate) started_at: RwLock<Option<Instant>>,
    pub(crate) last_restart: RwLock<Option<DateTime<Utc>>>,
    pub(crate) last_heartbeat: RwLock<Option<DateTime<Utc>>>,
    pub(crate) pid: RwLock<Option<u32>>,
}

impl Shared {
    pub(crate) fn new(config: BridgeConfig, events: broadcast::Sender<BridgeEvent>) -> Self {
        Self {
            config,
            process: Mutex::new(None),
            stdin: Mutex::new(None),
            correlator: Correlator::new(),
            catalog: RwLock::new(None),
            server_info: RwLock::new(None),
            events,
            stopping: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            restart_count: AtomicU32::new(0),
            request_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            started_at: RwLock::new(None),
            last_restart: RwLock::new(None),
            last_heartbeat: RwLock::new(None),
            pid: RwLock::new(None),
        }
    }
}

/// Start the subprocess. No-op with a warning if one is already live.
pub(crate) async fn start(state: &Arc<Shared>) -> Result<(), BridgeError> {
    if state.process.lock().await.is_some() {
        warn!(
            target: "bridge",
            command = %state.config.command,
            "Process already running; start ignored"
        );
        return Ok(());
    }
    state.stopping.store(false, Ordering::SeqCst);
    spawn_process(state).await
}

/// Spawn the configured command with piped stdio and wire up the reader,
/// stderr logger, and heartbeat tasks for the new generation.
pub(crate) async fn spawn_process(state: &Arc<Shared>) -> Result<(), BridgeError> {
    let config = &state.config;

    // Hold the process slot across the stopping check and the spawn: a stop
    // that lands first is honored, a stop that lands later waits for the
    // lock and reaps the child it finds there.
    let mut process_slot = state.process.lock().await;
    if state.stopping.load(Ordering::SeqCst) {
        return Err(BridgeError::ProcessCrashed("Bridge stopped".to_string()));
    }
    let generation = state.generation.fetch_add(1, Ordering::SeqCst) + 1;

    let mut cmd = Command::new(&config.command);
    cmd.args(&config.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for (key, val) in &config.env {
        cmd.env(key, val);
    }
    if let Some(ref cwd) = config.cwd {
        cmd.current_dir(cwd);
    }

    let mut child = cmd.spawn().map_err(|e| {
        error!(target: "bridge", command = %config.command, error = %e, "Failed to spawn process");
        BridgeError::ProcessCrashed(format!("Failed to spawn process: {}", e))
    })?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| BridgeError::ProcessCrashed("Failed to capture stdin".to_string()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| BridgeError::ProcessCrashed("Failed to capture stdout".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| BridgeError::ProcessCrashed("Failed to capture stderr".to_string()))?;

    let pid = child.id();
    *state.pid.write().await = pid;
    *state.started_at.write().await = Some(Instant::now());
    *state.last_heartbeat.write().await = Some(Utc::now());
    *state.stdin.lock().await = Some(stdin);
    *process_slot = Some(child);
    drop(process_slot);

    spawn_stdout_reader(Arc::clone(state), stdout, generation);
    spawn_stderr_logger(Arc::clone(state), stderr);
    heartbeat::spawn(Arc::clone(state), generation);

    info!(
        target: "bridge",
        command = %config.command,
        pid = ?pid,
        generation,
        "Process started"
    );
    Ok(())
}

/// Stop the bridge: suppress restarts, fail outstanding calls, close stdin
/// as the graceful signal, then kill after the grace period. Idempotent.
pub(crate) async fn stop(state: &Arc<Shared>) -> Result<(), BridgeError> {
    state.stopping.store(true, Ordering::SeqCst);
    // Invalidate the current generation: the reader's EOF handler and the
    // heartbeat loop stand down, teardown happens here instead.
    state.generation.fetch_add(1, Ordering::SeqCst);

    let failed = state
        .correlator
        .fail_all(|| BridgeError::ProcessCrashed("Bridge stopped".to_string()));
    if failed > 0 {
        warn!(target: "bridge", failed, "Failed outstanding requests on stop");
    }

    // Dropping stdin closes the pipe; stdio servers treat that as shutdown.
    state.stdin.lock().await.take();

    let child = state.process.lock().await.take();
    if let Some(mut child) = child {
        match tokio::time::timeout(STOP_GRACE_PERIOD, child.wait()).await {
            Ok(status) => {
                info!(
                    target: "bridge",
                    code = ?status.ok().and_then(|s| s.code()),
                    "Process exited after graceful shutdown"
                );
            }
            Err(_) => {
                warn!(target: "bridge", "Process did not exit within grace period; killing");
                let _ = child.start_kill();
                let _ = child.wait().await;
            }
        }
    }

    *state.pid.write().await = None;
    *state.started_at.write().await = None;
    *state.catalog.write().await = None;
    *state.server_info.write().await = None;

    // No Exited event for a stop-initiated exit: that notification marks
    // unexpected exits, and the stopping caller already knows the outcome.
    info!(target: "bridge", command = %state.config.command, "Bridge stopped");
    Ok(())
}

/// Read subprocess stdout chunk by chunk, frame into lines and dispatch.
/// EOF means the process exited (or abandoned its stdout): hand off to the
/// exit handler for this generation.
fn spawn_stdout_reader(state: Arc<Shared>, mut stdout: ChildStdout, generation: u64) {
    tokio::spawn(async move {
        let mut framer = LineFramer::new();
        let mut buf = vec![0u8; 8192];
        loop {
            match stdout.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    for line in framer.push(&buf[..n]) {
                        dispatch_line(&state, &line).await;
                    }
                }
                Err(e) => {
                    warn!(target: "bridge", error = %e, "stdout read failed");
                    break;
                }
            }
        }
        debug!(target: "bridge", generation, "stdout reader exited");
        handle_exit(state, generation).await;
    });
}

/// Decode and log stderr; it is never parsed as protocol.
fn spawn_stderr_logger(state: Arc<Shared>, stderr: ChildStderr) {
    let command = state.config.command.clone();
    tokio::spawn(async move {
        let mut framer = LineFramer::new();
        let mut stderr = stderr;
        let mut buf = vec![0u8; 4096];
        loop {
            match stderr.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    for line in framer.push(&buf[..n]) {
                        warn!(target: "bridge", command = %command, stderr = %line, "Subprocess stderr");
                    }
                }
            }
        }
    });
}

/// Route one complete line of subprocess output.
async fn dispatch_line(state: &Arc<Shared>, line: &str) {
    match classify_line(line) {
        None => {
            warn!(target: "bridge", line = %line, "Skipping non-JSON line from subprocess");
        }
        Some(IncomingMessage::Response(response)) => {
            let Some(id) = response.id.as_u64() else {
                warn!(target: "bridge", id = %response.id, "Response with non-integer id; dropping");
                return;
            };
            let outcome = match response.error {
                Some(err) => Err(BridgeError::Protocol {
                    code: err.code,
                    message: err.message,
                    data: err.data,
                }),
                None => Ok(response.result.unwrap_or(Value::Null)),
            };
            let is_error = outcome.is_err();
            if state.correlator.resolve(id, outcome) {
                if is_error {
                    state.error_count.fetch_add(1, Ordering::Relaxed);
                }
                *state.last_heartbeat.write().await = Some(Utc::now());
            } else {
                // Super-late response after a timeout, or a duplicate.
                warn!(target: "bridge", id, "Response for unknown request id; dropping");
            }
        }
        Some(IncomingMessage::Notification { method, params }) => {
            debug!(target: "bridge", method = %method, "Notification from subprocess");
            let _ = state.events.send(BridgeEvent::Notification { method, params });
        }
        Some(IncomingMessage::Unclassified(value)) => {
            warn!(target: "bridge", message = %value, "Unclassifiable message from subprocess; dropping");
        }
    }
}

/// Tear down after an unexpected exit, then invoke the restart policy
/// unless a stop is in progress.
pub(crate) async fn handle_exit(state: Arc<Shared>, generation: u64) {
    // Claim the teardown by superseding this generation. Exactly one handler
    // wins, and the bump also stands this generation's heartbeat loop down
    // when no restart follows (budget exhausted, or stop in progress).
    if state
        .generation
        .compare_exchange(generation, generation + 1, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        // A newer process (or a stop) superseded this one.
        return;
    }

    let child = state.process.lock().await.take();
    let Some(mut child) = child else {
        return;
    };
    // Stdout is gone, so the process is dead or useless either way; reap it.
    let _ = child.start_kill();
    let code = child.wait().await.ok().and_then(|s| s.code());

    state.stdin.lock().await.take();
    *state.pid.write().await = None;
    *state.started_at.write().await = None;
    *state.catalog.write().await = None;
    *state.server_info.write().await = None;

    let failed = state
        .correlator
        .fail_all(|| BridgeError::ProcessCrashed("Process exited unexpectedly".to_string()));
    if failed > 0 {
        state.error_count.fetch_add(failed as u64, Ordering::Relaxed);
        warn!(target: "bridge", failed, "Failed outstanding requests after process exit");
    }

    warn!(target: "bridge", command = %state.config.command, code = ?code, "Process exited");
    let _ = state.events.send(BridgeEvent::Exited { code });

    if !state.stopping.load(Ordering::SeqCst) {
        schedule_restart(state);
    }
}

/// Bounded restart with linear backoff (unit x attempt). Past the limit the
/// bridge emits a fatal event and stays down until started manually.
fn schedule_restart(state: Arc<Shared>) {
    let attempts = state.restart_count.load(Ordering::SeqCst);
    let max_restarts = state.config.max_restarts;
    if attempts >= max_restarts {
        error!(
            target: "bridge",
            attempts,
            max_restarts,
            "Restart budget exhausted; bridge stays down"
        );
        let err = BridgeError::MaxRestartsExceeded { max_restarts };
        let _ = state.events.send(BridgeEvent::Fatal {
            code: err.code(),
            message: err.to_string(),
        });
        return;
    }

    let attempt = state.restart_count.fetch_add(1, Ordering::SeqCst) + 1;
    let delay = state.config.restart_backoff() * attempt;

    tokio::spawn(async move {
        *state.last_restart.write().await = Some(Utc::now());
        info!(
            target: "bridge",
            attempt,
            delay_ms = delay.as_millis() as u64,
            "Restart scheduled"
        );

        // The backoff holds no lock, so a concurrent stop lands first.
        tokio::time::sleep(delay).await;
        if state.stopping.load(Ordering::SeqCst) {
            debug!(target: "bridge", attempt, "Stop requested during backoff; restart cancelled");
            return;
        }

        match spawn_process(&state).await {
            Ok(()) => {
                info!(target: "bridge", restart_count = attempt, "Process restarted");
                let _ = state.events.send(BridgeEvent::Restarted {
                    restart_count: attempt,
                });
            }
            Err(e) => {
                if state.stopping.load(Ordering::SeqCst) {
                    debug!(target: "bridge", attempt, "Stop landed during restart; spawn refused");
                    return;
                }
                error!(target: "bridge", attempt, error = %e, "Restart failed");
                let _ = state.events.send(BridgeEvent::Fatal {
                    code: e.code(),
                    message: e.to_string(),
                });
            }
        }
    });
}
