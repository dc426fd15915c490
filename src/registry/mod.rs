//! Consumer session registry for broadcast fan-out
//!
//! The registry tracks every connected consumer session and routes each
//! chunk received from the producer to all of them. It also owns the
//! liveness protocol: a periodic probe task pings every session and evicts
//! the ones that failed to answer the previous probe.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<SessionRegistry>
//!                   ┌─────────────────────────────┐
//!                   │ sessions: HashMap<u64,      │
//!                   │   Arc<ConsumerSession> {    │
//!                   │     tx: mpsc::Sender,       │
//!                   │     alive: AtomicBool,      │
//!                   │   }                         │
//!                   │ >                           │
//!                   └──────────────┬──────────────┘
//!                                  │
//!          ┌───────────────────────┼───────────────────────┐
//!          │                       │                       │
//!          ▼                       ▼                       ▼
//!     [Producer]             [Consumer]              [Consumer]
//!     ingest body            writer task             writer task
//!          │                       │                       │
//!          └──► registry.broadcast()──► tx.send() ──► WebSocket
//! ```
//!
//! # Zero-Copy Design
//!
//! Chunks are `bytes::Bytes`, so fan-out clones only bump a reference
//! count; every consumer's writer task shares the same allocation.
//!
//! # Isolation
//!
//! Membership lives behind an `RwLock`, which linearizes add/remove against
//! broadcast iteration: a session never receives a chunk once its removal
//! has completed. The actual socket write happens in a per-consumer writer
//! task fed by an unbounded channel, so one stalled consumer can never
//! delay delivery to the others or back up the producer's read loop.

pub mod session;
pub mod store;

pub use session::{ConsumerSession, SessionCommand, SessionId};
pub use store::SessionRegistry;
