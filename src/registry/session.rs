//! Consumer session types
//!
//! This module defines the per-consumer state stored in the registry.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use bytes::Bytes;
use tokio::sync::mpsc;

/// Unique identifier for a consumer session
pub type SessionId = u64;

/// Command delivered to a session's writer task
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// Forward one broadcast chunk as a binary frame
    Chunk(Bytes),
    /// Send a liveness probe (WebSocket Ping)
    Probe,
    /// Close the connection and stop the writer task
    Shutdown,
}

/// One registered consumer session
///
/// The registry exclusively owns membership and the liveness flag; the
/// connection task owns the socket itself. The two sides communicate only
/// through the command channel, so a removed session simply stops receiving
/// commands and its writer task winds down.
pub struct ConsumerSession {
    /// Session identifier, unique for the process lifetime
    pub id: SessionId,

    /// Remote address, for connection-event logging
    pub peer_addr: SocketAddr,

    /// Command channel into the session's writer task
    tx: mpsc::UnboundedSender<SessionCommand>,

    /// Whether the session answered the most recent liveness probe
    alive: AtomicBool,

    /// When the session was accepted
    pub connected_at: Instant,
}

impl ConsumerSession {
    /// Create a new session, marked live
    pub fn new(
        id: SessionId,
        peer_addr: SocketAddr,
        tx: mpsc::UnboundedSender<SessionCommand>,
    ) -> Self {
        Self {
            id,
            peer_addr,
            tx,
            alive: AtomicBool::new(true),
            connected_at: Instant::now(),
        }
    }

    /// Whether the session answered the last probe
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    /// Record a probe acknowledgment
    pub fn mark_alive(&self) {
        self.alive.store(true, Ordering::Relaxed);
    }

    /// Clear the liveness flag at the start of a probe cycle
    pub(super) fn clear_alive(&self) {
        self.alive.store(false, Ordering::Relaxed);
    }

    /// Send a command to the writer task
    ///
    /// Returns `false` if the writer task has already gone away; the caller
    /// treats such a session as not writable and skips it.
    pub(super) fn send(&self, command: SessionCommand) -> bool {
        self.tx.send(command).is_ok()
    }
}

impl std::fmt::Debug for ConsumerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumerSession")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("alive", &self.is_alive())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_session() -> (ConsumerSession, mpsc::UnboundedReceiver<SessionCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = ConsumerSession::new(1, "127.0.0.1:50000".parse().unwrap(), tx);
        (session, rx)
    }

    #[test]
    fn test_new_session_is_live() {
        let (session, _rx) = test_session();
        assert!(session.is_alive());
    }

    #[test]
    fn test_liveness_flag_cycle() {
        let (session, _rx) = test_session();

        session.clear_alive();
        assert!(!session.is_alive());

        session.mark_alive();
        assert!(session.is_alive());
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (session, rx) = test_session();
        drop(rx);

        assert!(!session.send(SessionCommand::Probe));
    }
}
