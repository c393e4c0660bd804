//! Append-only capture of remote traffic.

use std::io;
use std::path::Path;

use tokio::fs::OpenOptions;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::{RelayError, Result};

/// Verbatim copy of every byte received from the remote end.
pub struct TrafficLog {
    sink: Box<dyn AsyncWrite + Send + Unpin>,
}

impl TrafficLog {
    /// Open `path` for appending, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::LogFile`] if the file cannot be opened.
    pub async fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|source| RelayError::LogFile {
                path: path.to_path_buf(),
                source,
            })?;

        debug!("Logging remote traffic to {:?}", path);
        Ok(Self {
            sink: Box::new(file),
        })
    }

    /// Append `bytes` and flush them through to the sink.
    pub async fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.sink.write_all(bytes).await?;
        self.sink.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_open_creates_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("console.log");

        let mut log = TrafficLog::open(&path).await.unwrap();
        log.append(b"boot\r\n").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"boot\r\n");
    }

    #[tokio::test]
    async fn test_open_appends_to_existing_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("console.log");
        std::fs::write(&path, b"earlier session\n").unwrap();

        let mut log = TrafficLog::open(&path).await.unwrap();
        log.append(b"later").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"earlier session\nlater");
    }

    #[tokio::test]
    async fn test_open_fails_in_missing_directory() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("missing").join("console.log");

        match TrafficLog::open(&path).await {
            Err(RelayError::LogFile { path: p, .. }) => assert_eq!(p, path),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("opening in a missing directory should fail"),
        }
    }

    #[tokio::test]
    async fn test_binary_bytes_are_kept() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("console.log");
        let payload: Vec<u8> = (0..=255).collect();

        let mut log = TrafficLog::open(&path).await.unwrap();
        log.append(&payload[..100]).await.unwrap();
        log.append(&payload[100..]).await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), payload);
    }
}
