//! Audio Capture Adapters
//!
//! - **FileAudioCapture** - replays a recorded file as a capture device

mod file_capture;

pub use file_capture::{FileAudioCapture, DEFAULT_CHUNK_BYTES};
