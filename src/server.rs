//! Relay server assembly
//!
//! Binds the three listeners (ingestion, consumer, status), wires them to
//! the shared registry and process state, and drives them together with
//! the liveness probe task.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::ingest::{self, IngestContext};
use crate::registry::SessionRegistry;
use crate::state::ProcessState;
use crate::{consumer, status};

/// The relay server
///
/// Created with [`RelayServer::bind`], which binds all listeners up front
/// so the actual local addresses are known before the server runs (useful
/// when binding port 0 in tests).
pub struct RelayServer {
    config: RelayConfig,
    registry: Arc<SessionRegistry>,
    state: Arc<ProcessState>,
    ingest_listener: TcpListener,
    consumer_listener: TcpListener,
    status_listener: TcpListener,
    ingest_addr: SocketAddr,
    consumer_addr: SocketAddr,
    status_addr: SocketAddr,
}

impl RelayServer {
    /// Bind all three listeners
    pub async fn bind(config: RelayConfig) -> Result<Self> {
        if config.secret.is_empty() {
            return Err(RelayError::Config("secret must not be empty".into()));
        }

        let ingest_listener = TcpListener::bind(config.ingest_addr).await?;
        let consumer_listener = TcpListener::bind(config.consumer_addr).await?;
        let status_listener = TcpListener::bind(config.status_addr).await?;

        let ingest_addr = ingest_listener.local_addr()?;
        let consumer_addr = consumer_listener.local_addr()?;
        let status_addr = status_listener.local_addr()?;

        tracing::info!(addr = %ingest_addr, "Listening for incoming MPEG-TS stream");
        tracing::info!(addr = %consumer_addr, "Awaiting WebSocket connections");
        tracing::info!(addr = %status_addr, "Serving status");

        Ok(Self {
            config,
            registry: Arc::new(SessionRegistry::new()),
            state: Arc::new(ProcessState::new()),
            ingest_listener,
            consumer_listener,
            status_listener,
            ingest_addr,
            consumer_addr,
            status_addr,
        })
    }

    /// The session registry
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// The shared process state
    pub fn state(&self) -> &Arc<ProcessState> {
        &self.state
    }

    /// Actual ingestion listener address
    pub fn ingest_addr(&self) -> SocketAddr {
        self.ingest_addr
    }

    /// Actual consumer listener address
    pub fn consumer_addr(&self) -> SocketAddr {
        self.consumer_addr
    }

    /// Actual status listener address
    pub fn status_addr(&self) -> SocketAddr {
        self.status_addr
    }

    /// Run the server
    ///
    /// This method only returns on listener failure.
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Run the server until the shutdown future resolves
    ///
    /// On shutdown the probe task is aborted and all registered consumer
    /// sessions are released.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let probe_handle = self.registry.spawn_probe_task(self.config.probe_interval);

        let ingest_ctx = IngestContext {
            secret: self.config.secret.clone().into(),
            registry: Arc::clone(&self.registry),
            state: Arc::clone(&self.state),
            record_dir: self.config.record_dir.clone(),
            ingest_port: self.ingest_addr.port(),
        };
        let ingest_app = ingest::router(ingest_ctx)
            .into_make_service_with_connect_info::<SocketAddr>();
        let status_app = status::router(Arc::clone(&self.state), self.status_addr.port())
            .into_make_service();

        let registry = Arc::clone(&self.registry);
        let state = Arc::clone(&self.state);
        let tcp_nodelay = self.config.tcp_nodelay;

        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            r = async { axum::serve(self.ingest_listener, ingest_app).await } => {
                r.map_err(RelayError::from)
            }
            r = async { axum::serve(self.status_listener, status_app).await } => {
                r.map_err(RelayError::from)
            }
            r = consumer::run(self.consumer_listener, registry, state, tcp_nodelay) => r,
        };

        probe_handle.abort();
        self.registry.clear().await;

        result
    }
}
