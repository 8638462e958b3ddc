/// Bridge event surface
///
/// Background failures (unsolicited exit, restart outcomes) and unsolicited
/// server notifications are surfaced here rather than as errors on any
/// particular call. Consumers subscribe; the bridge never calls back into
/// globals.
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Capacity of the broadcast channel backing `Bridge::subscribe`.
/// Slow subscribers lag and miss events rather than blocking the bridge.
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Events emitted by a bridge instance
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeEvent {
    /// The subprocess exited (any code or signal)
    Exited { code: Option<i32> },
    /// A restart attempt succeeded; count is cumulative for this bridge
    Restarted { restart_count: u32 },
    /// A fatal condition: restart budget exhausted or a respawn failure.
    /// The bridge stays down until started again.
    Fatal { code: &'static str, message: String },
    /// An unsolicited JSON-RPC notification from the subprocess
    Notification { method: String, params: Value },
}

/// Observer seam for consumers that prefer a callback over polling a
/// broadcast receiver (HTTP surface, logging).
#[async_trait]
pub trait BridgeObserver: Send + Sync {
    async fn on_event(&self, event: BridgeEvent);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_events_serialize_with_tag() {
        let wire = serde_json::to_string(&BridgeEvent::Exited { code: Some(1) }).unwrap();
        assert!(wire.contains("\"type\":\"exited\""));
        assert!(wire.contains("\"code\":1"));

        let wire = serde_json::to_string(&BridgeEvent::Notification {
            method: "progress".into(),
            params: json!({"pct": 10}),
        })
        .unwrap();
        assert!(wire.contains("\"type\":\"notification\""));
        assert!(wire.contains("\"method\":\"progress\""));
    }
}
