//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, enums, and error types
//! that form the vocabulary of the assessment domain.

mod errors;
mod ids;
mod score;
mod stage;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{CandidateId, QuizId, SessionId};
pub use score::Score;
pub use stage::{AssessmentStage, StageKind};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
