//! Assessment module - the session aggregate and the data each stage produces.
//!
//! # Contents
//!
//! - `AssessmentSession` - root aggregate for one candidate attempt
//! - `StageResult` - normalized per-stage outcome
//! - Candidate input value objects (info, metadata, job description, resume)
//! - Quiz model for the technical stage

mod candidate;
mod events;
mod quiz;
mod results;
mod session;
mod workflow;

pub use candidate::{
    CandidateInfo, JobDescription, ResumeDocument, SubmissionMetadata,
    DEFAULT_MAX_DOCUMENT_BYTES, MAX_PHONE_DIGITS,
};
pub use events::AssessmentEvent;
pub use quiz::{QuestionType, QuizItem, CODING_POSITION_CUTOFF};
pub use results::{
    CommunicationResult, ResumeResult, SpeechMetrics, StageResult, TechnicalBreakdown,
    TechnicalResult,
};
pub use session::{AssessmentSession, StageOutcome, StageTransition};
pub use workflow::StageSequence;
