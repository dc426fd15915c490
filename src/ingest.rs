//! Stream ingestion endpoint
//!
//! A producer (typically ffmpeg) POSTs the MPEG-TS stream to
//! `http://host:port/<secret>` as an unbounded request body. The first path
//! segment is compared against the configured shared secret; on a mismatch
//! the connection is terminated immediately with nothing accepted. On a
//! match, every body chunk is forwarded to the session registry for
//! fan-out and optionally appended to an on-disk recording.
//!
//! The payload is opaque: no parsing, no validation, byte-for-byte
//! forwarding in arrival order. A second concurrent producer is not
//! rejected; its chunks simply interleave at the registry.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Router;
use futures_util::StreamExt;

use crate::recorder::RecordingSink;
use crate::registry::SessionRegistry;
use crate::state::ProcessState;

/// Shared context for the ingestion handler
#[derive(Clone)]
pub struct IngestContext {
    /// Configured shared secret
    pub secret: Arc<str>,
    /// Fan-out registry
    pub registry: Arc<SessionRegistry>,
    /// Process state (stream_active flag)
    pub state: Arc<ProcessState>,
    /// Recording directory, if recording is enabled
    pub record_dir: Option<PathBuf>,
    /// Port the ingestion listener is bound to, used to key recordings
    pub ingest_port: u16,
}

/// Build the ingestion router
///
/// Every request target is handled by the same handler; authentication is
/// by path segment, not by route.
pub fn router(ctx: IngestContext) -> Router {
    Router::new().fallback(handle_stream).with_state(ctx)
}

/// Handle one producer connection
async fn handle_stream(
    State(ctx): State<IngestContext>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    req: Request,
) -> Response {
    let presented = req
        .uri()
        .path()
        .trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or("");

    if presented != ctx.secret.as_ref() {
        tracing::warn!(peer = %peer, "Failed stream connection: wrong secret");
        return StatusCode::FORBIDDEN.into_response();
    }

    tracing::info!(peer = %peer, "Stream connected");

    let mut recording = match &ctx.record_dir {
        Some(dir) => match RecordingSink::open(dir, ctx.ingest_port).await {
            Ok(sink) => Some(sink),
            Err(e) => {
                tracing::error!(error = %e, "Failed to open recording, streaming without it");
                None
            }
        },
        None => None,
    };

    let mut body = req.into_body().into_data_stream();

    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(data) => {
                ctx.state.set_stream_active(true);
                ctx.registry.broadcast(data.clone()).await;

                if let Some(sink) = recording.as_mut() {
                    if let Err(e) = sink.write(&data).await {
                        tracing::error!(error = %e, "Recording write failed, dropping recording");
                        recording = None;
                    }
                }
            }
            Err(e) => {
                // Producer transport dropped mid-stream; treated as a
                // normal close. An abrupt failure that never surfaces here
                // leaves stream_active set until the transport times out —
                // a known, accepted limitation.
                tracing::debug!(peer = %peer, error = %e, "Stream body error");
                break;
            }
        }
    }

    ctx.state.set_stream_active(false);

    if let Some(sink) = recording {
        if let Err(e) = sink.close().await {
            tracing::error!(error = %e, "Failed to close recording");
        }
    }

    tracing::info!(peer = %peer, "Stream closed");
    StatusCode::OK.into_response()
}
