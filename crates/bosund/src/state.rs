use std::sync::atomic::{AtomicU64, Ordering};

use bosun_core::now_ms;

/// Shared daemon counters reported by the server-info operation.
pub struct DaemonState {
    /// Startup timestamp in UNIX milliseconds.
    started_at_ms: u64,
    /// Requests served across all connections since startup.
    served: AtomicU64,
}

impl DaemonState {
    pub fn new() -> Self {
        Self {
            started_at_ms: now_ms(),
            served: AtomicU64::new(0),
        }
    }

    /// Records one served request and returns the new total.
    pub fn record_served(&self) -> u64 {
        self.served.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Requests served so far.
    pub fn served(&self) -> u64 {
        self.served.load(Ordering::Relaxed)
    }

    /// Milliseconds since daemon startup.
    pub fn uptime_ms(&self) -> u64 {
        now_ms().saturating_sub(self.started_at_ms)
    }
}

impl Default for DaemonState {
    fn default() -> Self {
        Self::new()
    }
}
