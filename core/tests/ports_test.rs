/// Port allocator tests: exhaustion, wraparound reuse, shared-instance use
use gantry_core::ports::{PortAllocator, DEFAULT_PORT_RANGE_END, DEFAULT_PORT_RANGE_START};
use std::collections::HashSet;
use std::sync::Arc;

#[test]
fn test_default_range_bounds() {
    assert_eq!(DEFAULT_PORT_RANGE_START, 10_000);
    assert_eq!(DEFAULT_PORT_RANGE_END, 20_000);
    let allocator = PortAllocator::new();
    let port = allocator.allocate().unwrap();
    assert!((DEFAULT_PORT_RANGE_START..=DEFAULT_PORT_RANGE_END).contains(&port));
}

#[test]
fn test_range_of_size_r_fails_on_allocation_r_plus_one() {
    let size = 8u16;
    let allocator = PortAllocator::with_range(10_000, 10_000 + size - 1);
    for _ in 0..size {
        allocator.allocate().unwrap();
    }
    assert_eq!(allocator.allocate().unwrap_err().code(), "PORT_ALLOCATION_ERROR");

    // Releasing a single port makes exactly one more allocation possible.
    allocator.release(10_003);
    assert_eq!(allocator.allocate().unwrap(), 10_003);
    assert_eq!(allocator.allocate().unwrap_err().code(), "PORT_ALLOCATION_ERROR");
}

#[test]
fn test_concurrent_allocations_are_disjoint() {
    let allocator = Arc::new(PortAllocator::with_range(10_000, 10_255));
    let mut handles = Vec::new();
    for _ in 0..8 {
        let allocator = Arc::clone(&allocator);
        handles.push(std::thread::spawn(move || {
            let mut ports = Vec::new();
            for _ in 0..32 {
                ports.push(allocator.allocate().unwrap());
            }
            ports
        }));
    }

    let mut seen = HashSet::new();
    for handle in handles {
        for port in handle.join().unwrap() {
            assert!(seen.insert(port), "port {} handed out twice", port);
        }
    }
    assert_eq!(seen.len(), 256);
    assert_eq!(allocator.held_count(), 256);
}

#[test]
fn test_concurrent_allocate_and_release() {
    let allocator = Arc::new(PortAllocator::with_range(10_000, 10_031));
    let mut handles = Vec::new();
    for _ in 0..4 {
        let allocator = Arc::clone(&allocator);
        handles.push(std::thread::spawn(move || {
            for _ in 0..100 {
                if let Ok(port) = allocator.allocate() {
                    allocator.release(port);
                }
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(allocator.held_count(), 0);
}
