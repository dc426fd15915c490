//! Session registry implementation
//!
//! The central registry that tracks connected consumers, fans broadcast
//! chunks out to them, and runs the liveness probe cycle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::RwLock;

use super::session::{ConsumerSession, SessionCommand, SessionId};

/// Central registry for all connected consumer sessions
///
/// Thread-safe via `RwLock`. Broadcast and liveness acknowledgments only
/// take the read lock; membership changes and the probe sweep take the
/// write lock, which linearizes them against any in-flight broadcast.
pub struct SessionRegistry {
    /// Map of session ID to session
    sessions: RwLock<HashMap<SessionId, Arc<ConsumerSession>>>,

    /// Next session identifier
    next_id: AtomicU64,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate a fresh session identifier
    pub fn next_session_id(&self) -> SessionId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Register a session
    ///
    /// The session arrives marked live, so it survives the first probe
    /// sweep after registration.
    pub async fn add(&self, session: Arc<ConsumerSession>) {
        let mut sessions = self.sessions.write().await;
        let count = sessions.len() + 1;

        tracing::info!(
            session_id = session.id,
            peer = %session.peer_addr,
            connections = count,
            "Consumer registered"
        );

        sessions.insert(session.id, session);
    }

    /// Deregister a session
    ///
    /// Safe to call for a session that was already removed (no-op). The
    /// session's writer task is told to shut down, which closes the
    /// connection if it is still open.
    pub async fn remove(&self, id: SessionId) -> bool {
        let mut sessions = self.sessions.write().await;

        if let Some(session) = sessions.remove(&id) {
            session.send(SessionCommand::Shutdown);
            tracing::info!(
                session_id = id,
                peer = %session.peer_addr,
                connections = sessions.len(),
                "Consumer removed"
            );
            true
        } else {
            false
        }
    }

    /// Broadcast one chunk to every registered session
    ///
    /// Sessions whose writer task has already gone away are silently
    /// skipped; there is no queueing toward the producer and no
    /// backpressure. A slow consumer misses data or is eventually evicted
    /// by the probe cycle, it never stalls delivery to the others.
    pub async fn broadcast(&self, chunk: Bytes) {
        let sessions = self.sessions.read().await;

        for session in sessions.values() {
            let _ = session.send(SessionCommand::Chunk(chunk.clone()));
        }
    }

    /// Record a liveness acknowledgment for a session
    pub async fn mark_alive(&self, id: SessionId) {
        let sessions = self.sessions.read().await;

        if let Some(session) = sessions.get(&id) {
            session.mark_alive();
            tracing::trace!(session_id = id, "Probe answered");
        }
    }

    /// Current number of registered sessions
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Run one probe cycle
    ///
    /// Evicts every session that failed to answer the previous probe, then
    /// clears the liveness flag of each survivor and sends it a new probe.
    /// A session therefore has one full probe interval to answer before it
    /// is considered dead.
    pub async fn sweep_and_probe(&self) {
        let mut sessions = self.sessions.write().await;

        let dead: Vec<SessionId> = sessions
            .values()
            .filter(|s| !s.is_alive())
            .map(|s| s.id)
            .collect();

        for id in dead {
            if let Some(session) = sessions.remove(&id) {
                session.send(SessionCommand::Shutdown);
                tracing::info!(
                    session_id = id,
                    peer = %session.peer_addr,
                    "Consumer evicted: probe not answered"
                );
            }
        }

        for session in sessions.values() {
            session.clear_alive();
            let _ = session.send(SessionCommand::Probe);
        }
    }

    /// Remove all sessions, closing their connections
    ///
    /// Used at process shutdown.
    pub async fn clear(&self) {
        let mut sessions = self.sessions.write().await;

        for session in sessions.values() {
            session.send(SessionCommand::Shutdown);
        }
        sessions.clear();
    }

    /// Spawn the periodic liveness probe task
    ///
    /// Returns a handle that can be used to abort the task at shutdown.
    pub fn spawn_probe_task(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so freshly accepted
            // sessions get a full interval before their first probe.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                registry.sweep_and_probe().await;
            }
        })
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
