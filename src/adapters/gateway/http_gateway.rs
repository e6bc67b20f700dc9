//! HTTP Analysis Gateway - reqwest implementation of the AnalysisGateway port.
//!
//! # Configuration
//!
//! ```ignore
//! let config = HttpGatewayConfig::new("https://analyzer.example.com")
//!     .with_timeout(Duration::from_secs(60))
//!     .with_max_retries(2);
//!
//! let gateway = HttpAnalysisGateway::new(config)?;
//! ```
//!
//! # Retries
//!
//! Retryable failures are retried with exponential backoff (1s, 2s, 4s, ...)
//! up to `max_retries` times. Answer submission is never retried.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::domain::assessment::QuizItem;
use crate::domain::foundation::CandidateId;
use crate::ports::{
    AggregateResults, AnalysisGateway, AnswerSubmission, BearerToken, CommunicationAnalysis,
    CommunicationRequest, GatewayError, ResumeReceipt, ResumeSubmission,
};

use super::wire::{
    quiz_items, AggregateDto, AnswerDto, CommunicationDto, Envelope, QuizQuestionDto,
    ResumeUploadDto,
};

const UPLOAD_PATH: &str = "/api/analyzer/upload";
const QUIZ_PATH: &str = "/api/analyzer/get-quiz-questions";
const ANSWER_PATH: &str = "/api/analyzer/submit-single-answer";
const COMMUNICATION_PATH: &str = "/api/analyzer/submit-all-answers";
const RESULTS_PATH: &str = "/api/analyzer/get-technical-data";

/// Configuration for the HTTP gateway.
#[derive(Debug, Clone)]
pub struct HttpGatewayConfig {
    /// Base URL of the analysis service, without a trailing path.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum retries on retryable failures.
    pub max_retries: u32,
}

impl HttpGatewayConfig {
    /// Creates a configuration with default timeout and retries.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(60),
            max_retries: 2,
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the maximum retry count.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// Analysis gateway over HTTP.
pub struct HttpAnalysisGateway {
    config: HttpGatewayConfig,
    client: Client,
}

impl HttpAnalysisGateway {
    /// Creates a gateway with the given configuration.
    pub fn new(config: HttpGatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Builds an endpoint URL.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Maps a transport failure.
    fn transport_error(e: reqwest::Error) -> GatewayError {
        if e.is_timeout() {
            GatewayError::Timeout
        } else if e.is_connect() {
            GatewayError::network(format!("Connection failed: {}", e))
        } else {
            GatewayError::network(e.to_string())
        }
    }

    /// Checks the HTTP status and decodes the envelope.
    async fn read_envelope<T: DeserializeOwned>(
        response: Response,
    ) -> Result<Envelope<T>, GatewayError> {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(GatewayError::Unauthorized);
        }

        let body = response.bytes().await.map_err(Self::transport_error)?;

        if !status.is_success() {
            return Err(GatewayError::Network {
                status: Some(status.as_u16()),
                message: Self::error_message(&body).unwrap_or_else(|| status.to_string()),
            });
        }

        serde_json::from_slice(&body).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }

    /// Pulls `message` out of an error body, if it has one.
    fn error_message(body: &[u8]) -> Option<String> {
        serde_json::from_slice::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .or_else(|| {
                let text = String::from_utf8_lossy(body).trim().to_string();
                (!text.is_empty()).then_some(text)
            })
    }

    /// Runs `attempt` until it succeeds, fails permanently, or retries run out.
    async fn with_retry<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> Result<T, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let mut retry_count = 0;

        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !err.is_retryable() || retry_count >= self.config.max_retries {
                        return Err(err);
                    }

                    // Exponential backoff: 1s, 2s, 4s, ...
                    let delay = Duration::from_secs(1 << retry_count);
                    warn!(
                        operation,
                        attempt = retry_count + 1,
                        delay_secs = delay.as_secs(),
                        error = %err,
                        "Gateway call failed, retrying"
                    );
                    sleep(delay).await;
                    retry_count += 1;
                }
            }
        }
    }

    async fn send_resume(
        &self,
        token: &BearerToken,
        submission: &ResumeSubmission,
    ) -> Result<ResumeReceipt, GatewayError> {
        let doc = &submission.document;
        let part = Part::bytes(doc.bytes().to_vec())
            .file_name(doc.file_name().to_string())
            .mime_str(doc.mime_type())
            .map_err(|e| GatewayError::network(format!("Invalid document type: {}", e)))?;

        let form = Form::new()
            .text("candidate_name", submission.candidate.name().to_string())
            .text("email", submission.candidate.email().to_string())
            .text(
                "phone",
                submission.candidate.phone().unwrap_or_default().to_string(),
            )
            .text("hr_name", submission.metadata.hr_name().to_string())
            .text("job_position", submission.metadata.job_position().to_string())
            .text(
                "job_description",
                submission.job_description.as_str().to_string(),
            )
            .part("resume", part);

        let response = self
            .client
            .post(self.url(UPLOAD_PATH))
            .bearer_auth(token.expose())
            .multipart(form)
            .send()
            .await
            .map_err(Self::transport_error)?;

        let dto: ResumeUploadDto = Self::read_envelope(response).await?.into_data()?;
        ResumeReceipt::try_from(dto)
    }

    async fn send_quiz_request(
        &self,
        token: &BearerToken,
        candidate_id: &CandidateId,
    ) -> Result<Vec<QuizItem>, GatewayError> {
        let response = self
            .client
            .get(self.url(QUIZ_PATH))
            .bearer_auth(token.expose())
            .header("accept", "application/json")
            .query(&[("candidate_uid", candidate_id.as_str())])
            .send()
            .await
            .map_err(Self::transport_error)?;

        let dtos: Vec<QuizQuestionDto> = Self::read_envelope(response).await?.into_data()?;
        quiz_items(dtos)
    }

    async fn send_communication(
        &self,
        token: &BearerToken,
        request: &CommunicationRequest,
    ) -> Result<CommunicationAnalysis, GatewayError> {
        let questions: Vec<&str> = request
            .answers
            .iter()
            .map(|a| a.question.as_str())
            .collect();
        let question_texts = serde_json::to_string(&questions)
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        let mut form = Form::new()
            .text("candidate_id", request.candidate_id.as_str().to_string())
            .text("question_texts", question_texts);

        for answer in &request.answers {
            let part = Part::bytes(answer.audio.clone())
                .file_name(format!("que{}.mp3", answer.index + 1))
                .mime_str("audio/mpeg")
                .map_err(|e| GatewayError::network(format!("Invalid audio type: {}", e)))?;
            form = form.part("recordings", part);
        }

        let response = self
            .client
            .post(self.url(COMMUNICATION_PATH))
            .bearer_auth(token.expose())
            .multipart(form)
            .send()
            .await
            .map_err(Self::transport_error)?;

        let dto: CommunicationDto = Self::read_envelope(response).await?.into_data()?;
        Ok(dto.into())
    }

    async fn send_results_request(
        &self,
        token: &BearerToken,
        candidate_id: &CandidateId,
    ) -> Result<AggregateResults, GatewayError> {
        let response = self
            .client
            .get(self.url(RESULTS_PATH))
            .bearer_auth(token.expose())
            .header("accept", "application/json")
            .query(&[("candidate_uid", candidate_id.as_str())])
            .send()
            .await
            .map_err(Self::transport_error)?;

        let dto: AggregateDto = Self::read_envelope(response).await?.into_data()?;
        AggregateResults::try_from(dto)
    }
}

#[async_trait]
impl AnalysisGateway for HttpAnalysisGateway {
    async fn submit_resume(
        &self,
        token: &BearerToken,
        submission: &ResumeSubmission,
    ) -> Result<ResumeReceipt, GatewayError> {
        debug!(
            file = submission.document.file_name(),
            bytes = submission.document.len(),
            "Uploading resume"
        );
        let receipt = self
            .with_retry("submit_resume", || self.send_resume(token, submission))
            .await?;
        info!(candidate_id = %receipt.candidate_id, "Resume analyzed");
        Ok(receipt)
    }

    async fn fetch_quiz_questions(
        &self,
        token: &BearerToken,
        candidate_id: &CandidateId,
    ) -> Result<Vec<QuizItem>, GatewayError> {
        let items = self
            .with_retry("fetch_quiz_questions", || {
                self.send_quiz_request(token, candidate_id)
            })
            .await?;
        debug!(candidate_id = %candidate_id, count = items.len(), "Fetched quiz questions");
        Ok(items)
    }

    async fn submit_answer(
        &self,
        token: &BearerToken,
        answer: &AnswerSubmission,
    ) -> Result<(), GatewayError> {
        let body = AnswerDto {
            question_type: answer.question_type.wire_name(),
            quiz_id: answer.quiz_id.as_str(),
            candidate_uid: answer.candidate_id.as_str(),
            user_answer: &answer.answer,
        };

        // Single attempt only
        let response = self
            .client
            .post(self.url(ANSWER_PATH))
            .bearer_auth(token.expose())
            .json(&body)
            .send()
            .await
            .map_err(Self::transport_error)?;

        Self::read_envelope::<serde_json::Value>(response)
            .await?
            .check()?;
        debug!(quiz_id = %answer.quiz_id, "Answer submitted");
        Ok(())
    }

    async fn analyze_communication(
        &self,
        token: &BearerToken,
        request: &CommunicationRequest,
    ) -> Result<CommunicationAnalysis, GatewayError> {
        debug!(
            candidate_id = %request.candidate_id,
            recordings = request.answers.len(),
            "Submitting recordings for analysis"
        );
        self.with_retry("analyze_communication", || {
            self.send_communication(token, request)
        })
        .await
    }

    async fn fetch_aggregate_results(
        &self,
        token: &BearerToken,
        candidate_id: &CandidateId,
    ) -> Result<AggregateResults, GatewayError> {
        self.with_retry("fetch_aggregate_results", || {
            self.send_results_request(token, candidate_id)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn config_defaults() {
        let config = HttpGatewayConfig::new("https://analyzer.example.com");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.max_retries, 2);
    }

    #[test]
    fn config_builder_overrides() {
        let config = HttpGatewayConfig::new("http://localhost")
            .with_timeout(Duration::from_secs(5))
            .with_max_retries(0);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_retries, 0);
    }

    #[test]
    fn url_joins_without_double_slash() {
        let gateway =
            HttpAnalysisGateway::new(HttpGatewayConfig::new("http://localhost:9000/")).unwrap();
        assert_eq!(
            gateway.url(UPLOAD_PATH),
            "http://localhost:9000/api/analyzer/upload"
        );
    }

    #[test]
    fn error_message_prefers_json_message() {
        let body = br#"{"status":false,"message":"Candidate not found"}"#;
        assert_eq!(
            HttpAnalysisGateway::error_message(body).as_deref(),
            Some("Candidate not found")
        );
        assert_eq!(
            HttpAnalysisGateway::error_message(b"Bad Gateway").as_deref(),
            Some("Bad Gateway")
        );
        assert_eq!(HttpAnalysisGateway::error_message(b""), None);
    }

    #[tokio::test(start_paused = true)]
    async fn with_retry_stops_after_max_retries() {
        let gateway = HttpAnalysisGateway::new(
            HttpGatewayConfig::new("http://localhost").with_max_retries(2),
        )
        .unwrap();
        let counter = AtomicU32::new(0);
        let attempts = &counter;

        let result: Result<(), GatewayError> = gateway
            .with_retry("test", || async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(GatewayError::Timeout)
            })
            .await;

        assert_eq!(result, Err(GatewayError::Timeout));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn with_retry_does_not_retry_unauthorized() {
        let gateway = HttpAnalysisGateway::new(HttpGatewayConfig::new("http://localhost")).unwrap();
        let counter = AtomicU32::new(0);
        let attempts = &counter;

        let result: Result<(), GatewayError> = gateway
            .with_retry("test", || async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(GatewayError::Unauthorized)
            })
            .await;

        assert_eq!(result, Err(GatewayError::Unauthorized));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
