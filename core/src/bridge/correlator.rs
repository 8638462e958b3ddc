/// Protocol correlator
///
/// Maps outstanding request ids to the oneshot sender that completes the
/// caller's future. Three triggers race to resolve an entry: a matching
/// response, the caller's timeout, and the process-exit sweep. The single
/// `DashMap::remove` is the commit point, so exactly one of them wins and
/// the losers no-op against an already-removed entry.
use super::error::BridgeError;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::oneshot;

/// Terminal outcome of one call
pub type CallOutcome = Result<Value, BridgeError>;

pub struct Correlator {
    /// Next request id; monotonically increasing, never reused
    next_id: AtomicU64,
    /// Pending requests: request id -> completion sender
    pending: DashMap<u64, oneshot::Sender<CallOutcome>>,
}

impl Correlator {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: DashMap::new(),
        }
    }

    /// Allocate the next id and register its pending entry.
    pub fn register(&self) -> (u64, oneshot::Receiver<CallOutcome>) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);
        (id, rx)
    }

    /// Resolve a pending entry. Returns false when the id is unknown
    /// (already resolved, timed out, or never ours) so the caller can log it.
    pub fn resolve(&self, id: u64, outcome: CallOutcome) -> bool {
        match self.pending.remove(&id) {
            Some((_, tx)) => {
                // The receiver may have been dropped by a racing timeout;
                // the entry is gone either way.
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }

    /// Remove an entry without completing it (timeout and write-failure paths
    /// own the receiver themselves).
    pub fn discard(&self, id: u64) -> bool {
        self.pending.remove(&id).is_some()
    }

    /// Fail every outstanding entry (process exit or explicit stop).
    pub fn fail_all(&self, mut make_error: impl FnMut() -> BridgeError) -> usize {
        let ids: Vec<u64> = self.pending.iter().map(|entry| *entry.key()).collect();
        let mut failed = 0;
        for id in ids {
            if let Some((_, tx)) = self.pending.remove(&id) {
                let _ = tx.send(Err(make_error()));
                failed += 1;
            }
        }
        failed
    }

    /// Number of outstanding requests
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new()
    }
}
