/// Heartbeat monitor
///
/// Periodic liveness probe independent of request traffic. A dead process is
/// only logged here; restart is the exit handler's responsibility. The loop
/// stands down when its generation is superseded or a stop begins.
use super::supervisor::Shared;
use chrono::Utc;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, warn};

pub(crate) fn spawn(state: Arc<Shared>, generation: u64) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(state.config.heartbeat_interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // First tick completes immediately; skip it so probes start one
        // interval after spawn.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if state.generation.load(Ordering::SeqCst) != generation
                || state.stopping.load(Ordering::SeqCst)
            {
                break;
            }

            let alive = {
                let mut guard = state.process.lock().await;
                match guard.as_mut() {
                    // try_wait: None means still running
                    Some(child) => matches!(child.try_wait(), Ok(None)),
                    None => false,
                }
            };

            if alive {
                *state.last_heartbeat.write().await = Some(Utc::now());
            } else {
                warn!(
                    target: "bridge",
                    command = %state.config.command,
                    "Heartbeat found no live process"
                );
            }
        }
        debug!(target: "bridge", generation, "Heartbeat monitor stopped");
    });
}
