//! Audio Capture Port - Interface to a recording device.
//!
//! Opening the device yields a stream of encoded audio chunks. The device is
//! held for as long as the stream is alive; dropping the stream releases it.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// Errors raised by a capture device.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CaptureError {
    #[error("audio device unavailable: {0}")]
    Unavailable(String),

    #[error("permission to record was denied")]
    PermissionDenied,

    #[error("audio stream failed: {0}")]
    StreamFailed(String),
}

/// Chunks of encoded audio produced while recording.
pub type AudioStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, CaptureError>> + Send>>;

/// Port for opening a recording device
#[async_trait]
pub trait AudioCapture: Send + Sync {
    /// Opens the device and starts recording.
    ///
    /// # Errors
    /// Returns `CaptureError` if the device cannot be opened
    async fn open(&self) -> Result<AudioStream, CaptureError>;
}
