//! Port allocation for test runs
//!
//! Each run gets one port that is free on the host at allocation time. Ports
//! are spread across the range using the process id, so parallel harness
//! processes on a shared CI host start from different offsets, and a
//! per-allocator counter that only moves forward.
//!
//! Released ports are retired rather than returned to the pool: a server
//! from the previous run may still hold the port in TIME_WAIT, so handing
//! it to the next run would make that run flaky.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::net::{Ipv4Addr, TcpListener};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{HarnessError, Result};

/// First port of the default allocation range
pub const DEFAULT_BASE_PORT: u16 = 20000;

/// Last port of the default allocation range
pub const DEFAULT_END_PORT: u16 = 49999;

/// Offset between the starting points of two harness processes
const PROCESS_STRIDE: u32 = 200;

type Probe = dyn Fn(u16) -> bool + Send + Sync;

struct AllocatorState {
    /// Offset of the next candidate relative to the process origin
    next: u32,
    leased: HashSet<u16>,
    retired: HashSet<u16>,
}

struct Inner {
    start: u16,
    end: u16,
    origin: u32,
    probe: Box<Probe>,
    state: Mutex<AllocatorState>,
}

/// Hands out collision-avoided ports, one per test run
#[derive(Clone)]
pub struct PortAllocator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for PortAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("PortAllocator")
            .field("start", &self.inner.start)
            .field("end", &self.inner.end)
            .field("leased", &state.leased.len())
            .field("retired", &state.retired.len())
            .finish()
    }
}

impl Default for PortAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl PortAllocator {
    /// Allocator over the default range, probing with a TCP bind
    pub fn new() -> Self {
        Self::with_range(DEFAULT_BASE_PORT, DEFAULT_END_PORT)
    }

    /// Allocator over `start..=end`, probing with a TCP bind
    pub fn with_range(start: u16, end: u16) -> Self {
        Self::with_probe(start, end, port_is_free)
    }

    /// Allocator with a custom availability probe
    pub fn with_probe<F>(start: u16, end: u16, probe: F) -> Self
    where
        F: Fn(u16) -> bool + Send + Sync + 'static,
    {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        let span = u32::from(end - start) + 1;
        let origin = (std::process::id() % 50) * PROCESS_STRIDE % span;

        Self {
            inner: Arc::new(Inner {
                start,
                end,
                origin,
                probe: Box::new(probe),
                state: Mutex::new(AllocatorState {
                    next: 0,
                    leased: HashSet::new(),
                    retired: HashSet::new(),
                }),
            }),
        }
    }

    /// Allocate a port that is free on `interface`
    ///
    /// Every candidate in the range is tried at most once. Running out of
    /// candidates is a fatal setup error.
    pub fn allocate(&self, interface: &str) -> Result<u16> {
        let inner = &self.inner;
        let span = u32::from(inner.end - inner.start) + 1;
        let mut state = inner.state.lock();

        for _ in 0..span {
            let offset = state.next;
            state.next = state.next.wrapping_add(1);

            let candidate = inner.start + ((inner.origin + offset) % span) as u16;
            if state.leased.contains(&candidate) || state.retired.contains(&candidate) {
                continue;
            }
            if !(inner.probe)(candidate) {
                debug!(port = candidate, interface, "Port in use, skipping");
                continue;
            }

            state.leased.insert(candidate);
            debug!(port = candidate, interface, "Allocated port");
            return Ok(candidate);
        }

        Err(HarnessError::PortExhausted {
            interface: interface.to_string(),
            start: inner.start,
            end: inner.end,
        })
    }

    /// Allocate a port wrapped in a guard that releases it on drop
    pub fn lease(&self, interface: &str) -> Result<PortLease> {
        let port = self.allocate(interface)?;
        Ok(PortLease {
            allocator: self.clone(),
            port,
            released: false,
        })
    }

    /// Release a port; it is never handed out again by this allocator
    pub fn release(&self, port: u16) {
        let mut state = self.inner.state.lock();
        if !state.leased.remove(&port) {
            warn!(port, "Releasing a port that was not leased");
        }
        state.retired.insert(port);
        debug!(port, "Released port");
    }

    /// Check whether a port is currently leased
    pub fn is_leased(&self, port: u16) -> bool {
        self.inner.state.lock().leased.contains(&port)
    }

    /// Check whether a port has been released
    pub fn is_retired(&self, port: u16) -> bool {
        self.inner.state.lock().retired.contains(&port)
    }
}

/// A leased port, released when dropped
#[derive(Debug)]
pub struct PortLease {
    allocator: PortAllocator,
    port: u16,
    released: bool,
}

impl PortLease {
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Release the port now instead of at drop
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if !self.released {
            self.released = true;
            self.allocator.release(self.port);
        }
    }
}

impl Drop for PortLease {
    fn drop(&mut self) {
        self.release_inner();
    }
}

/// Probe a port by binding to it on all interfaces
fn port_is_free(port: u16) -> bool {
    TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocations_are_unique() {
        let allocator = PortAllocator::with_probe(30000, 30009, |_| true);
        let mut seen = HashSet::new();
        for _ in 0..10 {
            let port = allocator.allocate("eth0").unwrap();
            assert!((30000..=30009).contains(&port));
            assert!(seen.insert(port), "port {} handed out twice", port);
        }
    }

    #[test]
    fn test_exhaustion_is_an_error() {
        let allocator = PortAllocator::with_probe(30000, 30001, |_| true);
        allocator.allocate("eth0").unwrap();
        allocator.allocate("eth0").unwrap();

        let err = allocator.allocate("eth0").unwrap_err();
        assert_eq!(err.error_code(), "PORT_EXHAUSTED");
    }

    #[test]
    fn test_released_port_is_not_reused() {
        let allocator = PortAllocator::with_probe(30000, 30001, |_| true);
        let first = allocator.allocate("eth0").unwrap();
        allocator.release(first);
        assert!(allocator.is_retired(first));

        let second = allocator.allocate("eth0").unwrap();
        assert_ne!(first, second);
        assert!(allocator.allocate("eth0").is_err());
    }

    #[test]
    fn test_busy_ports_are_skipped() {
        let allocator = PortAllocator::with_probe(30000, 30003, |port| port % 2 == 0);
        for _ in 0..2 {
            let port = allocator.allocate("eth0").unwrap();
            assert_eq!(port % 2, 0);
        }
        assert!(allocator.allocate("eth0").is_err());
    }

    #[test]
    fn test_lease_releases_on_drop() {
        let allocator = PortAllocator::with_probe(30000, 30009, |_| true);
        let port = {
            let lease = allocator.lease("eth0").unwrap();
            assert!(allocator.is_leased(lease.port()));
            lease.port()
        };
        assert!(!allocator.is_leased(port));
        assert!(allocator.is_retired(port));
    }

    #[test]
    fn test_bound_port_is_not_allocated() {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, 0)).unwrap();
        let busy = listener.local_addr().unwrap().port();

        let allocator = PortAllocator::with_range(busy, busy);
        assert!(allocator.allocate("lo").is_err());
    }
}
