/// Port allocator
///
/// Process-wide registry handing out unique listening ports for concurrent
/// bridge instances. One explicit instance shared by `Arc`, not a global;
/// all operations take a single critical section.
use crate::bridge::BridgeError;
use std::collections::HashSet;
use std::sync::Mutex;

/// Default allocation range (inclusive)
pub const DEFAULT_PORT_RANGE_START: u16 = 10_000;
pub const DEFAULT_PORT_RANGE_END: u16 = 20_000;

struct Ledger {
    /// Ports currently handed out
    held: HashSet<u16>,
    /// Next candidate; wraps at the range boundary
    cursor: u16,
}

pub struct PortAllocator {
    start: u16,
    end: u16,
    ledger: Mutex<Ledger>,
}

impl PortAllocator {
    pub fn new() -> Self {
        Self::with_range(DEFAULT_PORT_RANGE_START, DEFAULT_PORT_RANGE_END)
    }

    /// Allocator over an inclusive range. `start` must not exceed `end`.
    pub fn with_range(start: u16, end: u16) -> Self {
        debug_assert!(start <= end);
        Self {
            start,
            end,
            ledger: Mutex::new(Ledger {
                held: HashSet::new(),
                cursor: start,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Ledger> {
        // A panic while holding the lock cannot leave the ledger in a
        // half-updated state, so a poisoned guard is still usable.
        match self.ledger.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Hand out the first free port scanning forward from the cursor.
    /// A held port is never handed out again until released.
    pub fn allocate(&self) -> Result<u16, BridgeError> {
        let mut ledger = self.lock();
        let size = (self.end - self.start) as usize + 1;

        for _ in 0..size {
            let candidate = ledger.cursor;
            ledger.cursor = if candidate == self.end {
                self.start
            } else {
                candidate + 1
            };
            if ledger.held.insert(candidate) {
                return Ok(candidate);
            }
        }

        Err(BridgeError::PortsExhausted {
            start: self.start,
            end: self.end,
        })
    }

    /// Return a port to the pool. No-op if it was not held.
    pub fn release(&self, port: u16) {
        self.lock().held.remove(&port);
    }

    /// Clear all state (test/administrative use)
    pub fn reset(&self) {
        let mut ledger = self.lock();
        ledger.held.clear();
        ledger.cursor = self.start;
    }

    /// Number of ports currently held
    pub fn held_count(&self) -> usize {
        self.lock().held.len()
    }
}

impl Default for PortAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocations_are_unique() {
        let allocator = PortAllocator::with_range(10_000, 10_009);
        let mut seen = HashSet::new();
        for _ in 0..10 {
            assert!(seen.insert(allocator.allocate().unwrap()));
        }
    }

    #[test]
    fn test_exhaustion_fails_on_extra_allocation() {
        let allocator = PortAllocator::with_range(10_000, 10_002);
        for _ in 0..3 {
            allocator.allocate().unwrap();
        }
        let err = allocator.allocate().unwrap_err();
        assert_eq!(err.code(), "PORT_ALLOCATION_ERROR");
    }

    #[test]
    fn test_released_port_reused_after_cursor_wraps() {
        let allocator = PortAllocator::with_range(10_000, 10_004);
        assert_eq!(allocator.allocate().unwrap(), 10_000);
        assert_eq!(allocator.allocate().unwrap(), 10_001);

        allocator.release(10_000);
        // Not reused immediately; the cursor keeps rotating forward.
        assert_eq!(allocator.allocate().unwrap(), 10_002);
        assert_eq!(allocator.allocate().unwrap(), 10_003);
        assert_eq!(allocator.allocate().unwrap(), 10_004);
        // Only after wrapping does the released port come back.
        assert_eq!(allocator.allocate().unwrap(), 10_000);
    }

    #[test]
    fn test_release_unheld_port_is_noop() {
        let allocator = PortAllocator::with_range(10_000, 10_001);
        allocator.release(10_000);
        assert_eq!(allocator.held_count(), 0);
    }

    #[test]
    fn test_reset_clears_ledger_and_cursor() {
        let allocator = PortAllocator::with_range(10_000, 10_002);
        allocator.allocate().unwrap();
        allocator.allocate().unwrap();
        allocator.reset();
        assert_eq!(allocator.held_count(), 0);
        assert_eq!(allocator.allocate().unwrap(), 10_000);
    }
}
