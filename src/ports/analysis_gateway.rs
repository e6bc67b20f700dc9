//! Analysis Gateway Port - Interface to the external analysis service.
//!
//! The gateway performs the actual resume parsing, speech scoring and quiz
//! generation. The engine only shapes requests and interprets responses.
//!
//! # Design
//!
//! - Every operation takes a bearer credential
//! - Responses are already normalized into port-level types; wire quirks
//!   (field aliases, envelopes) stay inside the adapter
//! - `submit_answer` is not idempotent on the remote side and must never be
//!   retried automatically

use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};
use std::fmt;

use crate::domain::assessment::{
    CandidateInfo, JobDescription, QuestionType, QuizItem, ResumeDocument, SubmissionMetadata,
};
use crate::domain::foundation::{CandidateId, QuizId, ValidationError};

/// Bearer credential for the analysis gateway.
#[derive(Clone)]
pub struct BearerToken(Secret<String>);

impl BearerToken {
    /// Wraps a token, rejecting blank values.
    pub fn new(token: impl Into<String>) -> Result<Self, ValidationError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ValidationError::empty_field("credential"));
        }
        Ok(Self(Secret::new(token)))
    }

    /// Exposes the raw token (for building the Authorization header).
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken([REDACTED])")
    }
}

/// Everything sent with a resume upload.
#[derive(Debug, Clone)]
pub struct ResumeSubmission {
    pub candidate: CandidateInfo,
    pub metadata: SubmissionMetadata,
    pub job_description: JobDescription,
    pub document: ResumeDocument,
}

/// Resume analysis returned by the gateway.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResumeAnalysis {
    pub match_score: f64,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub experience_match: String,
    pub highlights: Vec<String>,
    /// Follow-up questions for the communication stage.
    pub questions: Vec<String>,
}

/// Response to a resume upload.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumeReceipt {
    pub candidate_id: CandidateId,
    pub analysis: ResumeAnalysis,
}

/// A single quiz answer.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerSubmission {
    pub candidate_id: CandidateId,
    pub quiz_id: QuizId,
    pub question_type: QuestionType,
    pub answer: String,
}

/// One recorded spoken answer.
#[derive(Clone, PartialEq)]
pub struct SpokenAnswer {
    /// 0-based position of the question in the follow-up list.
    pub index: usize,
    pub question: String,
    pub audio: Vec<u8>,
}

impl fmt::Debug for SpokenAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpokenAnswer")
            .field("index", &self.index)
            .field("question", &self.question)
            .field("audio_bytes", &self.audio.len())
            .finish()
    }
}

/// Request to analyze one or more spoken answers.
#[derive(Debug, Clone, PartialEq)]
pub struct CommunicationRequest {
    pub candidate_id: CandidateId,
    pub answers: Vec<SpokenAnswer>,
}

/// Speech analysis returned by the gateway.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommunicationAnalysis {
    pub communication_score: f64,
    pub fluency: f64,
    pub clarity: f64,
    pub professionalism: f64,
    pub response_time_secs: f64,
    pub filler_words: u32,
    pub speech_rate_wpm: f64,
    pub confidence_level: String,
    pub feedback: Vec<String>,
}

/// Technical totals computed by the gateway.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TechnicalSummary {
    pub overall_score: f64,
    pub experience_based: f64,
    /// Fraction in [0, 1].
    pub coding_percentage: f64,
    /// Fraction in [0, 1].
    pub text_percentage: f64,
}

/// Candidate identity echoed back in the results.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CandidateSummary {
    pub name: String,
    pub email: String,
}

/// All results the gateway holds for a candidate.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AggregateResults {
    pub resume: Option<ResumeAnalysis>,
    pub communication: Option<CommunicationAnalysis>,
    pub technical: TechnicalSummary,
    pub candidate: Option<CandidateSummary>,
}

/// Errors returned by the analysis gateway.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    /// Credential missing, expired or rejected.
    #[error("unauthorized")]
    Unauthorized,

    /// Transport failure or non-success HTTP status.
    #[error("network error{}: {message}", .status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    Network {
        status: Option<u16>,
        message: String,
    },

    /// Request exceeded the client timeout.
    #[error("request timed out")]
    Timeout,

    /// The gateway answered but reported the analysis as failed.
    #[error("analysis failed: {message}")]
    AnalysisFailure { message: String },

    /// The response could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// Creates a network error without an HTTP status.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            status: None,
            message: message.into(),
        }
    }

    /// Creates an analysis failure.
    pub fn analysis(message: impl Into<String>) -> Self {
        Self::AnalysisFailure {
            message: message.into(),
        }
    }

    /// Returns true if the operation may be attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::Network { .. } | GatewayError::Timeout | GatewayError::AnalysisFailure { .. }
        )
    }
}

/// Port for the external analysis service.
#[async_trait]
pub trait AnalysisGateway: Send + Sync {
    /// Uploads the resume and receives a candidate id with the match analysis.
    async fn submit_resume(
        &self,
        token: &BearerToken,
        submission: &ResumeSubmission,
    ) -> Result<ResumeReceipt, GatewayError>;

    /// Fetches the technical quiz generated for a candidate.
    async fn fetch_quiz_questions(
        &self,
        token: &BearerToken,
        candidate_id: &CandidateId,
    ) -> Result<Vec<QuizItem>, GatewayError>;

    /// Submits a single quiz answer. Never retried.
    async fn submit_answer(
        &self,
        token: &BearerToken,
        answer: &AnswerSubmission,
    ) -> Result<(), GatewayError>;

    /// Submits spoken answers for speech analysis.
    async fn analyze_communication(
        &self,
        token: &BearerToken,
        request: &CommunicationRequest,
    ) -> Result<CommunicationAnalysis, GatewayError>;

    /// Fetches every result the gateway holds for a candidate.
    async fn fetch_aggregate_results(
        &self,
        token: &BearerToken,
        candidate_id: &CandidateId,
    ) -> Result<AggregateResults, GatewayError>;
}
