//! Shared process state
//!
//! A single record of the two facts the status endpoint reports: whether a
//! stream is currently being ingested and how many consumers are connected.
//! Each field is mutated by exactly one component (the ingestion endpoint
//! and the consumer endpoint respectively) and read by the status endpoint.
//! The fields are independent counters, so reads do not need to observe
//! them as one atomic snapshot.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Process-wide relay state, created once at startup as `{false, 0}`
#[derive(Debug, Default)]
pub struct ProcessState {
    /// Whether a producer is currently sending chunks
    stream_active: AtomicBool,

    /// Number of currently connected consumer sessions
    client_connections: AtomicU64,
}

impl ProcessState {
    /// Create the initial state: no stream, no consumers
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the stream-active flag
    ///
    /// Called with `true` on every chunk received from an authenticated
    /// producer and with `false` when the producer connection closes or the
    /// stream ends.
    pub fn set_stream_active(&self, active: bool) {
        self.stream_active.store(active, Ordering::Relaxed);
    }

    /// Whether a stream is currently active
    pub fn stream_active(&self) -> bool {
        self.stream_active.load(Ordering::Relaxed)
    }

    /// Record a new consumer connection
    pub fn client_connected(&self) {
        self.client_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a consumer disconnect
    pub fn client_disconnected(&self) {
        self.client_connections.fetch_sub(1, Ordering::Relaxed);
    }

    /// Number of currently connected consumers
    pub fn client_connections(&self) -> u64 {
        self.client_connections.load(Ordering::Relaxed)
    }
}
