//! End-to-end relay tests
//!
//! Each test binds a full relay on ephemeral ports and exercises it over
//! real sockets: a raw TCP producer speaking chunked HTTP, WebSocket
//! consumers via tokio-tungstenite, and raw HTTP status queries.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use ts_relay::{RelayConfig, RelayServer};

struct Relay {
    ingest: SocketAddr,
    consumer: SocketAddr,
    status: SocketAddr,
}

async fn start_relay(config: RelayConfig) -> Relay {
    let server = RelayServer::bind(config).await.expect("bind relay");
    let relay = Relay {
        ingest: server.ingest_addr(),
        consumer: server.consumer_addr(),
        status: server.status_addr(),
    };
    tokio::spawn(server.run());
    relay
}

fn local_config(secret: &str) -> RelayConfig {
    RelayConfig::new(secret)
        .ingest_addr("127.0.0.1:0".parse().unwrap())
        .consumer_addr("127.0.0.1:0".parse().unwrap())
        .status_addr("127.0.0.1:0".parse().unwrap())
}

/// A producer connection speaking chunked-encoding HTTP by hand
struct Producer {
    stream: TcpStream,
}

impl Producer {
    async fn connect(addr: SocketAddr, secret_path: &str) -> Self {
        let mut stream = TcpStream::connect(addr).await.expect("connect producer");
        let head = format!(
            "POST /{} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\nTransfer-Encoding: chunked\r\n\r\n",
            secret_path
        );
        stream.write_all(head.as_bytes()).await.expect("send head");
        Self { stream }
    }

    async fn send_chunk(&mut self, data: &[u8]) {
        let mut framed = format!("{:X}\r\n", data.len()).into_bytes();
        framed.extend_from_slice(data);
        framed.extend_from_slice(b"\r\n");
        self.stream.write_all(&framed).await.expect("send chunk");
        self.stream.flush().await.expect("flush chunk");
    }

    async fn finish(mut self) -> String {
        self.stream
            .write_all(b"0\r\n\r\n")
            .await
            .expect("send terminal chunk");
        read_to_string(&mut self.stream).await
    }

    async fn read_response(mut self) -> String {
        read_to_string(&mut self.stream).await
    }
}

async fn read_to_string(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let _ = timeout(Duration::from_secs(5), stream.read_to_end(&mut buf)).await;
    String::from_utf8_lossy(&buf).into_owned()
}

async fn query_status(addr: SocketAddr) -> serde_json::Value {
    let mut stream = TcpStream::connect(addr).await.expect("connect status");
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .expect("send status request");
    let response = read_to_string(&mut stream).await;
    let body = response
        .split_once("\r\n\r\n")
        .map(|(_, body)| body)
        .expect("status response has a body");
    serde_json::from_str(body.trim()).expect("status body is JSON")
}

async fn expect_binary(
    ws: &mut (impl Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin),
) -> Vec<u8> {
    loop {
        let msg = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("frame error");
        match msg {
            Message::Binary(data) => return data.to_vec(),
            // Probes and other control frames may interleave
            _ => continue,
        }
    }
}

#[tokio::test]
async fn relays_chunks_to_all_consumers_in_order() {
    let relay = start_relay(local_config("s3cr3t")).await;

    let (mut viewer_a, _) = connect_async(format!("ws://{}/", relay.consumer))
        .await
        .expect("connect viewer a");
    let (mut viewer_b, _) = connect_async(format!("ws://{}/", relay.consumer))
        .await
        .expect("connect viewer b");
    sleep(Duration::from_millis(100)).await;

    let mut producer = Producer::connect(relay.ingest, "s3cr3t").await;
    producer.send_chunk(&[0x47, 0x00, 0x10, 0x01]).await;
    // Give the first chunk time to clear the decoder so the two arrive as
    // distinct frames
    sleep(Duration::from_millis(50)).await;
    producer.send_chunk(&[0x47, 0x00, 0x10, 0x02]).await;

    for viewer in [&mut viewer_a, &mut viewer_b] {
        assert_eq!(expect_binary(viewer).await, vec![0x47, 0x00, 0x10, 0x01]);
        assert_eq!(expect_binary(viewer).await, vec![0x47, 0x00, 0x10, 0x02]);
    }

    let status = query_status(relay.status).await;
    assert_eq!(status["stream_active"], true);
    assert_eq!(status["client_connections"], 2);

    let response = producer.finish().await;
    assert!(response.contains("200"), "unexpected response: {response}");

    sleep(Duration::from_millis(100)).await;
    let status = query_status(relay.status).await;
    assert_eq!(status["stream_active"], false);
}

#[tokio::test]
async fn wrong_secret_rejected_with_nothing_forwarded() {
    let relay = start_relay(local_config("s3cr3t")).await;

    let (mut viewer, _) = connect_async(format!("ws://{}/", relay.consumer))
        .await
        .expect("connect viewer");
    sleep(Duration::from_millis(100)).await;

    let mut producer = Producer::connect(relay.ingest, "wrong").await;
    producer.send_chunk(&[0x47, 0x00]).await;
    let response = producer.read_response().await;
    assert!(response.contains("403"), "unexpected response: {response}");

    let status = query_status(relay.status).await;
    assert_eq!(status["stream_active"], false);
    assert_eq!(status["client_connections"], 1);

    // The viewer must not have received anything
    let nothing = timeout(Duration::from_millis(300), async {
        loop {
            match viewer.next().await {
                Some(Ok(Message::Binary(_))) => break,
                Some(_) => continue,
                None => std::future::pending::<()>().await,
            }
        }
    })
    .await;
    assert!(nothing.is_err(), "viewer received forwarded data");
}

#[tokio::test]
async fn consumer_count_tracks_connects_and_disconnects() {
    let relay = start_relay(local_config("s3cr3t")).await;

    let status = query_status(relay.status).await;
    assert_eq!(status["client_connections"], 0);

    let (viewer_a, _) = connect_async(format!("ws://{}/", relay.consumer))
        .await
        .expect("connect viewer a");
    let (_viewer_b, _) = connect_async(format!("ws://{}/", relay.consumer))
        .await
        .expect("connect viewer b");
    sleep(Duration::from_millis(100)).await;

    let status = query_status(relay.status).await;
    assert_eq!(status["client_connections"], 2);

    drop(viewer_a);
    sleep(Duration::from_millis(200)).await;

    let status = query_status(relay.status).await;
    assert_eq!(status["client_connections"], 1);
}

#[tokio::test]
async fn unresponsive_consumer_evicted_within_two_probe_intervals() {
    let config = local_config("s3cr3t").probe_interval(Duration::from_millis(100));
    let relay = start_relay(config).await;

    // Never polled, so pings are never answered
    let (_silent_viewer, _) = connect_async(format!("ws://{}/", relay.consumer))
        .await
        .expect("connect viewer");
    sleep(Duration::from_millis(100)).await;

    let status = query_status(relay.status).await;
    assert_eq!(status["client_connections"], 1);

    sleep(Duration::from_millis(500)).await;

    let status = query_status(relay.status).await;
    assert_eq!(status["client_connections"], 0);
}

#[tokio::test]
async fn responsive_consumer_survives_probing() {
    let config = local_config("s3cr3t").probe_interval(Duration::from_millis(100));
    let relay = start_relay(config).await;

    let (ws, _) = connect_async(format!("ws://{}/", relay.consumer))
        .await
        .expect("connect viewer");

    // Keep polling the socket; tungstenite answers pings automatically
    let polling = tokio::spawn(async move {
        let (_sink, mut stream) = ws.split();
        while let Some(Ok(_)) = stream.next().await {}
    });

    sleep(Duration::from_millis(600)).await;

    let status = query_status(relay.status).await;
    assert_eq!(status["client_connections"], 1);

    polling.abort();
}

#[tokio::test]
async fn status_answers_any_method_and_path() {
    let relay = start_relay(local_config("s3cr3t")).await;

    let mut stream = TcpStream::connect(relay.status).await.unwrap();
    stream
        .write_all(b"PUT /any/path HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let response = read_to_string(&mut stream).await;

    assert!(response.contains("200"), "unexpected response: {response}");
    assert!(response.contains("application/json"));

    let body = response.split_once("\r\n\r\n").unwrap().1;
    let json: serde_json::Value = serde_json::from_str(body.trim()).unwrap();
    assert_eq!(json["number"], u64::from(relay.status.port() % 100));
}

#[tokio::test]
async fn records_stream_to_disk_when_enabled() {
    let dir = std::env::temp_dir().join(format!("ts-relay-e2e-{}", std::process::id()));
    let config = local_config("s3cr3t").record_dir(&dir);
    let relay = start_relay(config).await;

    let mut producer = Producer::connect(relay.ingest, "s3cr3t").await;
    producer.send_chunk(&[0x47, 0x11]).await;
    producer.send_chunk(&[0x47, 0x22]).await;
    producer.finish().await;

    let port_dir = dir.join(format!("port-{}", relay.ingest.port()));
    let mut entries = tokio::fs::read_dir(&port_dir).await.expect("recording dir");
    let entry = entries
        .next_entry()
        .await
        .expect("read dir")
        .expect("one recording file");

    let contents = tokio::fs::read(entry.path()).await.unwrap();
    assert_eq!(contents, vec![0x47, 0x11, 0x47, 0x22]);

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}
