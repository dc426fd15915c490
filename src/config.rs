//! Relay server configuration

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default probe period matching the reference relay behavior
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(5);

/// Relay configuration options
///
/// Three listeners run in one process: the producer posts the stream to the
/// ingestion address, viewers connect to the consumer address over
/// WebSocket, and monitoring queries the status address.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Shared secret the producer must present as the first path segment
    pub secret: String,

    /// Address the stream ingestion (HTTP) listener binds to
    pub ingest_addr: SocketAddr,

    /// Address the consumer (WebSocket) listener binds to
    pub consumer_addr: SocketAddr,

    /// Address the status (HTTP) listener binds to
    pub status_addr: SocketAddr,

    /// Period of the consumer liveness prober
    pub probe_interval: Duration,

    /// Directory to record incoming streams into (None = recording disabled)
    pub record_dir: Option<PathBuf>,

    /// Enable TCP_NODELAY on consumer sockets
    pub tcp_nodelay: bool,
}

impl RelayConfig {
    /// Create a configuration with the default ports (8081/8082/8083)
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ingest_addr: "0.0.0.0:8081".parse().unwrap(),
            consumer_addr: "0.0.0.0:8082".parse().unwrap(),
            status_addr: "0.0.0.0:8083".parse().unwrap(),
            probe_interval: DEFAULT_PROBE_INTERVAL,
            record_dir: None,
            tcp_nodelay: true, // Important for low latency
        }
    }

    /// Set the ingestion bind address
    pub fn ingest_addr(mut self, addr: SocketAddr) -> Self {
        self.ingest_addr = addr;
        self
    }

    /// Set the consumer bind address
    pub fn consumer_addr(mut self, addr: SocketAddr) -> Self {
        self.consumer_addr = addr;
        self
    }

    /// Set the status bind address
    pub fn status_addr(mut self, addr: SocketAddr) -> Self {
        self.status_addr = addr;
        self
    }

    /// Set the liveness probe period
    pub fn probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }

    /// Enable recording of incoming streams under the given directory
    pub fn record_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.record_dir = Some(dir.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports() {
        let config = RelayConfig::new("s3cr3t");

        assert_eq!(config.secret, "s3cr3t");
        assert_eq!(config.ingest_addr.port(), 8081);
        assert_eq!(config.consumer_addr.port(), 8082);
        assert_eq!(config.status_addr.port(), 8083);
        assert_eq!(config.probe_interval, DEFAULT_PROBE_INTERVAL);
        assert!(config.record_dir.is_none());
        assert!(config.tcp_nodelay);
    }

    #[test]
    fn test_builder_chaining() {
        let config = RelayConfig::new("key")
            .ingest_addr("127.0.0.1:9081".parse().unwrap())
            .consumer_addr("127.0.0.1:9082".parse().unwrap())
            .status_addr("127.0.0.1:9083".parse().unwrap())
            .probe_interval(Duration::from_millis(100))
            .record_dir("recordings");

        assert_eq!(config.ingest_addr.port(), 9081);
        assert_eq!(config.consumer_addr.port(), 9082);
        assert_eq!(config.status_addr.port(), 9083);
        assert_eq!(config.probe_interval, Duration::from_millis(100));
        assert_eq!(config.record_dir, Some(PathBuf::from("recordings")));
    }
}
