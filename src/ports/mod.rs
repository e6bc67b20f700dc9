//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `AnalysisGateway` - The external analysis service
//! - `SessionStore` - Persistence for credential, candidate id and snapshot
//! - `AudioCapture` - Recording device for the communication stage
//! - `StageAdapter` - Capability implemented by each assessment stage

mod analysis_gateway;
mod audio_capture;
mod session_store;
mod stage_adapter;

pub use analysis_gateway::{
    AggregateResults, AnalysisGateway, AnswerSubmission, BearerToken, CandidateSummary,
    CommunicationAnalysis, CommunicationRequest, GatewayError, ResumeAnalysis, ResumeReceipt,
    ResumeSubmission, SpokenAnswer, TechnicalSummary,
};
pub use audio_capture::{AudioCapture, AudioStream, CaptureError};
pub use session_store::{SessionStore, SessionStoreError, StoreKey};
pub use stage_adapter::{StageAdapter, StageContext, StageError, StageOutcome};
