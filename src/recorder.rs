//! On-disk stream recording
//!
//! Optional collaborator of the ingestion endpoint: appends every received
//! chunk to a file keyed by ingestion port and stream start time, e.g.
//! `recordings/port-8081/1714060800000.ts`. Write and close failures are
//! logged by the caller and never propagated into the relay path.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::fs::{create_dir_all, File};
use tokio::io::AsyncWriteExt;

/// A byte sink recording one producer stream to a local file
pub struct RecordingSink {
    file: File,
    path: PathBuf,
    bytes_written: u64,
}

impl RecordingSink {
    /// Open a new recording file under `dir` for a stream on `ingest_port`
    ///
    /// Creates `dir/port-<ingest_port>/` if missing. The file name is the
    /// stream start time in milliseconds since the Unix epoch.
    pub async fn open(dir: &std::path::Path, ingest_port: u16) -> std::io::Result<Self> {
        let parent = dir.join(format!("port-{}", ingest_port));
        create_dir_all(&parent).await?;

        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let path = parent.join(format!("{}.ts", millis));

        let file = File::create(&path).await?;
        tracing::info!(path = %path.display(), "Recording started");

        Ok(Self {
            file,
            path,
            bytes_written: 0,
        })
    }

    /// Append one chunk to the recording
    pub async fn write(&mut self, chunk: &[u8]) -> std::io::Result<()> {
        self.file.write_all(chunk).await?;
        self.bytes_written += chunk.len() as u64;
        Ok(())
    }

    /// Flush and close the recording
    pub async fn close(mut self) -> std::io::Result<()> {
        self.file.flush().await?;
        tracing::info!(
            path = %self.path.display(),
            bytes = self.bytes_written,
            "Recording closed"
        );
        Ok(())
    }

    /// Path of the recording file
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Total bytes written so far
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}
