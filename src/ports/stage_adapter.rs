//! Stage Adapter Port - The capability every assessment stage provides.
//!
//! The orchestrator drives stages only through this trait: it checks the
//! stage locally with `validate`, performs the remote work with `submit`,
//! and feeds the returned outcome into the session.

use async_trait::async_trait;

use crate::domain::foundation::{CandidateId, DomainError, ErrorCode, StageKind, ValidationError};

pub use crate::domain::assessment::StageOutcome;

use super::{BearerToken, CaptureError, GatewayError, SessionStoreError};

/// Credential and candidate handed to a stage for one submission.
#[derive(Debug, Clone)]
pub struct StageContext {
    pub credential: BearerToken,
    pub candidate_id: Option<CandidateId>,
}

impl StageContext {
    pub fn new(credential: BearerToken, candidate_id: Option<CandidateId>) -> Self {
        Self {
            credential,
            candidate_id,
        }
    }

    /// Returns the candidate id or `MissingCandidate`.
    pub fn require_candidate(&self) -> Result<&CandidateId, StageError> {
        self.candidate_id.as_ref().ok_or(StageError::MissingCandidate)
    }
}

/// Errors surfaced at the stage boundary.
///
/// None of these advance the session.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StageError {
    #[error("authentication required")]
    Auth,

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("network error: {0}")]
    Network(String),

    #[error("analysis failed: {0}")]
    AnalysisFailure(String),

    #[error("candidate id missing; the resume stage must be completed first")]
    MissingCandidate,

    #[error("a submission is already in progress")]
    Busy,

    #[error("the technical assessment has already been submitted")]
    AlreadyFinalized,

    #[error("audio capture failed: {0}")]
    Capture(String),

    #[error("session storage failed: {0}")]
    Storage(String),
}

impl StageError {
    /// Message suitable for showing to the candidate.
    pub fn user_message(&self) -> String {
        match self {
            StageError::Auth => "Your session has expired. Please sign in again.".to_string(),
            StageError::Validation(e) => e.to_string(),
            StageError::Network(_) => {
                "We could not reach the assessment service. Please try again.".to_string()
            }
            StageError::AnalysisFailure(message) => message.clone(),
            StageError::MissingCandidate => {
                "Candidate information is missing. Please restart the assessment.".to_string()
            }
            StageError::Busy => "Please wait for the current submission to finish.".to_string(),
            StageError::AlreadyFinalized => {
                "Your answers have already been submitted.".to_string()
            }
            StageError::Capture(_) => {
                "Unable to access the microphone. Check your device permissions.".to_string()
            }
            StageError::Storage(_) => {
                "Your progress could not be saved. Please try again.".to_string()
            }
        }
    }

    /// Returns true if the same action may be attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StageError::Network(_) | StageError::AnalysisFailure(_) | StageError::Storage(_)
        )
    }
}

impl From<GatewayError> for StageError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Unauthorized => StageError::Auth,
            GatewayError::Network { .. } | GatewayError::Timeout => {
                StageError::Network(err.to_string())
            }
            GatewayError::AnalysisFailure { message } => StageError::AnalysisFailure(message),
            GatewayError::InvalidResponse(message) => {
                StageError::AnalysisFailure(format!("Unexpected response from the service: {}", message))
            }
        }
    }
}

impl From<DomainError> for StageError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::CandidateRequired => StageError::MissingCandidate,
            _ => {
                let field = err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "stage".to_string());
                StageError::Validation(ValidationError::invalid_format(field, err.message))
            }
        }
    }
}

impl From<SessionStoreError> for StageError {
    fn from(err: SessionStoreError) -> Self {
        StageError::Storage(err.to_string())
    }
}

impl From<CaptureError> for StageError {
    fn from(err: CaptureError) -> Self {
        StageError::Capture(err.to_string())
    }
}

/// Port implemented by each assessment stage.
#[async_trait]
pub trait StageAdapter: Send + Sync {
    /// Which stage this adapter completes.
    fn kind(&self) -> StageKind;

    /// Local checks that must pass before any network request is made.
    async fn validate(&self, ctx: &StageContext) -> Result<(), StageError>;

    /// Performs the remote work and returns the stage outcome.
    async fn submit(&self, ctx: &StageContext) -> Result<StageOutcome, StageError>;

    /// Called once the outcome returned by `submit` has been persisted.
    async fn committed(&self) {}

    /// Abandons in-flight work and releases held resources.
    async fn cancel(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_errors_map_to_stage_errors() {
        assert_eq!(StageError::from(GatewayError::Unauthorized), StageError::Auth);
        assert!(matches!(
            StageError::from(GatewayError::Timeout),
            StageError::Network(_)
        ));
        assert_eq!(
            StageError::from(GatewayError::analysis("Resume could not be parsed")),
            StageError::AnalysisFailure("Resume could not be parsed".into())
        );
    }

    #[test]
    fn analysis_failure_message_is_shown_verbatim() {
        let err = StageError::AnalysisFailure("Resume could not be parsed".into());
        assert_eq!(err.user_message(), "Resume could not be parsed");
        assert!(err.is_retryable());
    }

    #[test]
    fn candidate_required_maps_to_missing_candidate() {
        let err = DomainError::new(ErrorCode::CandidateRequired, "missing");
        assert_eq!(StageError::from(err), StageError::MissingCandidate);
    }

    #[test]
    fn out_of_order_maps_to_validation() {
        let err = DomainError::new(ErrorCode::StageOutOfOrder, "wrong stage");
        assert!(matches!(StageError::from(err), StageError::Validation(_)));
    }

    #[test]
    fn require_candidate_fails_without_id() {
        let ctx = StageContext::new(BearerToken::new("t").unwrap(), None);
        assert_eq!(ctx.require_candidate().unwrap_err(), StageError::MissingCandidate);
    }
}
