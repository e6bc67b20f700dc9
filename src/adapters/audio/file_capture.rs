//! File-backed Audio Capture
//!
//! Plays back a pre-recorded file as if it were a live device. Used by the
//! binary in headless mode and by tests that need deterministic audio.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::sleep;

use crate::ports::{AudioCapture, AudioStream, CaptureError};

/// Default chunk size emitted per stream item.
pub const DEFAULT_CHUNK_BYTES: usize = 16 * 1024;

/// Streams an audio file in fixed-size chunks.
#[derive(Debug, Clone)]
pub struct FileAudioCapture {
    path: PathBuf,
    chunk_bytes: usize,
    chunk_interval: Duration,
}

impl FileAudioCapture {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            chunk_bytes: DEFAULT_CHUNK_BYTES,
            chunk_interval: Duration::ZERO,
        }
    }

    /// Sets the chunk size (minimum 1 byte).
    pub fn with_chunk_bytes(mut self, chunk_bytes: usize) -> Self {
        self.chunk_bytes = chunk_bytes.max(1);
        self
    }

    /// Paces chunks to simulate a real-time device.
    pub fn with_chunk_interval(mut self, interval: Duration) -> Self {
        self.chunk_interval = interval;
        self
    }
}

#[async_trait]
impl AudioCapture for FileAudioCapture {
    async fn open(&self) -> Result<AudioStream, CaptureError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied => CaptureError::PermissionDenied,
            _ => CaptureError::Unavailable(format!("{}: {}", self.path.display(), e)),
        })?;

        let chunks: Vec<Vec<u8>> = bytes
            .chunks(self.chunk_bytes)
            .map(<[u8]>::to_vec)
            .collect();
        let interval = self.chunk_interval;

        let stream = stream::iter(chunks).then(move |chunk| async move {
            if !interval.is_zero() {
                sleep(interval).await;
            }
            Ok(chunk)
        });

        Ok(Box::pin(stream))
    }
}
