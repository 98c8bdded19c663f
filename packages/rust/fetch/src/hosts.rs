//! Per-host failure tracking and cool-down state.
//!
//! The map is in-memory only and reset on process restart. It is constructed
//! by the pipeline runner and shared by reference into the gateway, so
//! concurrent runs (e.g., under test) never touch hidden global state.
//! Counters are monotonic increments behind a short-lived mutex; a lost
//! update only delays circuit-breaking slightly.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Failure bookkeeping for one host.
#[derive(Debug, Default)]
struct HostFailureState {
    /// Cumulative recent failure count; cleared on any success.
    count: u32,
    /// Last time a failure for this host was actually logged.
    last_log_at: Option<Instant>,
    /// Until when all fetch attempts against this host are suppressed.
    skip_until: Option<Instant>,
}

/// What the caller should do after recording one failure.
#[derive(Debug, Clone, Copy)]
pub struct FailureNote {
    /// Cumulative failure count for the host after this failure.
    pub count: u32,
    /// Whether this failure should be logged (throttled).
    pub should_log: bool,
    /// Whether the failure tripped the circuit breaker.
    pub tripped: bool,
}

/// Shared per-host failure map, keyed by hostname.
#[derive(Debug, Default)]
pub struct HostFailureMap {
    inner: Mutex<HashMap<String, HostFailureState>>,
}

impl HostFailureMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while the host is inside an active cool-down window.
    pub fn skip_active(&self, host: &str) -> bool {
        let map = self.inner.lock().expect("host map poisoned");
        map.get(host)
            .and_then(|state| state.skip_until)
            .is_some_and(|until| Instant::now() < until)
    }

    /// Forget all failure state for a host after a successful fetch.
    pub fn clear(&self, host: &str) {
        let mut map = self.inner.lock().expect("host map poisoned");
        map.remove(host);
    }

    /// Record one failed attempt against a host.
    ///
    /// Logging is throttled: the first two failures per host always log,
    /// afterwards at most once per `log_throttle`. Reaching `threshold`
    /// cumulative failures starts a `skip_window` cool-down.
    pub fn record_failure(
        &self,
        host: &str,
        threshold: u32,
        skip_window: Duration,
        log_throttle: Duration,
    ) -> FailureNote {
        let now = Instant::now();
        let mut map = self.inner.lock().expect("host map poisoned");
        let state = map.entry(host.to_string()).or_default();
        state.count += 1;

        let should_log = state.count <= 2
            || state
                .last_log_at
                .is_none_or(|last| now.duration_since(last) > log_throttle);
        if should_log {
            state.last_log_at = Some(now);
        }

        // Re-trips once an earlier cool-down has elapsed and failures continue
        let skip_already_active = state.skip_until.is_some_and(|until| now < until);
        let tripped = state.count >= threshold && !skip_already_active;
        if tripped {
            state.skip_until = Some(now + skip_window);
        }

        FailureNote {
            count: state.count,
            should_log,
            tripped,
        }
    }
}
