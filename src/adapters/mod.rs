//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `gateway` - Analysis service clients (HTTP, mock)
//! - `storage` - Session stores (YAML files, in-memory)
//! - `audio` - Capture devices

pub mod audio;
pub mod gateway;
pub mod storage;

pub use audio::FileAudioCapture;
pub use gateway::{HttpAnalysisGateway, HttpGatewayConfig, MockAnalysisGateway};
pub use storage::{FileSessionStore, InMemorySessionStore};
