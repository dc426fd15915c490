//! Status endpoint
//!
//! Stateless monitoring responder: every request, regardless of method,
//! path, or body, gets a JSON snapshot of the process state.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use axum::Router;
use serde::Serialize;

use crate::state::ProcessState;

/// Status response payload
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Identifying number derived from the status port (last two digits)
    pub number: u16,
    /// Whether a producer is currently streaming
    pub stream_active: bool,
    /// Number of connected consumer sessions
    pub client_connections: u64,
}

/// Shared context for the status handler
#[derive(Clone)]
pub struct StatusContext {
    state: Arc<ProcessState>,
    number: u16,
}

/// Build the status router
///
/// `status_port` is the port the listener is bound to; its last two
/// decimal digits become the `number` field of every response.
pub fn router(state: Arc<ProcessState>, status_port: u16) -> Router {
    let ctx = StatusContext {
        state,
        number: status_port % 100,
    };

    Router::new().fallback(handle_status).with_state(ctx)
}

async fn handle_status(State(ctx): State<StatusContext>) -> Json<StatusResponse> {
    Json(StatusResponse {
        number: ctx.number,
        stream_active: ctx.state.stream_active(),
        client_connections: ctx.state.client_connections(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_snapshot_reflects_state() {
        let state = Arc::new(ProcessState::new());
        state.set_stream_active(true);
        state.client_connected();
        state.client_connected();

        let ctx = StatusContext {
            state,
            number: 8083 % 100,
        };

        let Json(response) = handle_status(State(ctx)).await;
        assert_eq!(response.number, 83);
        assert!(response.stream_active);
        assert_eq!(response.client_connections, 2);
    }

    #[test]
    fn test_serialized_field_names() {
        let response = StatusResponse {
            number: 83,
            stream_active: false,
            client_connections: 0,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "number": 83,
                "stream_active": false,
                "client_connections": 0
            })
        );
    }
}
