//! ts-relay binary
//!
//! Relay a live MPEG-TS stream from ffmpeg to WebSocket viewers:
//!
//! ```text
//! ts-relay yoursecret
//! ffmpeg -i <some input> -f mpegts http://localhost:8081/yoursecret
//! ```

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;
use ts_relay::{RelayConfig, RelayServer};

#[derive(Parser, Debug)]
#[command(name = "ts-relay", version, about = "WebSocket relay for live MPEG-TS streams")]
struct Args {
    /// Shared secret the producer must present in the request path
    secret: String,

    /// Port to accept the incoming MPEG-TS stream on
    #[arg(default_value_t = 8081)]
    stream_port: u16,

    /// Port to accept WebSocket viewers on
    #[arg(default_value_t = 8082)]
    websocket_port: u16,

    /// Port to serve the JSON status endpoint on
    #[arg(default_value_t = 8083)]
    api_port: u16,

    /// Record the incoming stream to disk
    #[arg(long)]
    record: bool,

    /// Directory to write recordings into
    #[arg(long, default_value = "recordings")]
    record_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ts_relay=info".parse()?),
        )
        .init();

    let mut config = RelayConfig::new(args.secret)
        .ingest_addr(SocketAddr::from((Ipv4Addr::UNSPECIFIED, args.stream_port)))
        .consumer_addr(SocketAddr::from((
            Ipv4Addr::UNSPECIFIED,
            args.websocket_port,
        )))
        .status_addr(SocketAddr::from((Ipv4Addr::UNSPECIFIED, args.api_port)));

    if args.record {
        config = config.record_dir(args.record_dir);
    }

    let server = RelayServer::bind(config).await?;

    println!(
        "Listening for incoming MPEG-TS stream on http://127.0.0.1:{}/<secret>",
        args.stream_port
    );
    println!(
        "Awaiting WebSocket connections on ws://127.0.0.1:{}/",
        args.websocket_port
    );
    println!(
        "Serving details about service on http://127.0.0.1:{}",
        args.api_port
    );

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
