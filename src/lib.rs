//! WebSocket relay for live MPEG-TS streams
//!
//! Relays a single live binary stream from an external encoder to any
//! number of WebSocket viewers, with a JSON status endpoint for
//! monitoring. Point ffmpeg at the ingestion port and a player at the
//! consumer port:
//!
//! ```text
//! ffmpeg -i <input> -f mpegts http://localhost:8081/<secret>
//!                                     │
//!                              [stream ingestion]
//!                                     │
//!                              [session registry] ──► ws://localhost:8082/
//!                                     │
//!                              [status endpoint]      http://localhost:8083/
//! ```
//!
//! The payload is treated as opaque bytes: no parsing, no validation,
//! byte-for-byte fan-out in arrival order. Consumers are tracked by a
//! ping/pong liveness protocol and evicted after missing two consecutive
//! probes.
//!
//! # Example
//!
//! ```no_run
//! use ts_relay::{RelayConfig, RelayServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RelayConfig::new("s3cr3t");
//!     let server = RelayServer::bind(config).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod consumer;
pub mod error;
pub mod ingest;
pub mod recorder;
pub mod registry;
pub mod server;
pub mod state;
pub mod status;

pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use server::RelayServer;
pub use state::ProcessState;
