//! Mock Analysis Gateway for testing.
//!
//! Provides a configurable implementation of the AnalysisGateway port so
//! stages and the orchestrator can be exercised without a running service.
//!
//! # Features
//!
//! - Queued responses per operation (consumed in order, defaults afterwards)
//! - Simulated delays for race testing
//! - Error injection for resilience testing
//! - Call tracking for verification
//!
//! # Example
//!
//! ```ignore
//! let gateway = MockAnalysisGateway::new()
//!     .with_quiz(MockAnalysisGateway::sample_quiz(10))
//!     .with_answer_error(GatewayError::Timeout);
//!
//! assert_eq!(gateway.calls_to(MockOperation::SubmitAnswer), 0);
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::assessment::QuizItem;
use crate::domain::foundation::{CandidateId, QuizId};
use crate::ports::{
    AggregateResults, AnalysisGateway, AnswerSubmission, BearerToken, CandidateSummary,
    CommunicationAnalysis, CommunicationRequest, GatewayError, ResumeAnalysis, ResumeReceipt,
    ResumeSubmission, TechnicalSummary,
};

/// Candidate id handed out when no receipt is queued.
pub const MOCK_CANDIDATE_ID: &str = "cand-001";

/// Gateway operations, for call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOperation {
    SubmitResume,
    FetchQuizQuestions,
    SubmitAnswer,
    AnalyzeCommunication,
    FetchAggregateResults,
}

/// A recorded call.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    SubmitResume { email: String },
    FetchQuizQuestions { candidate_id: CandidateId },
    SubmitAnswer(AnswerSubmission),
    AnalyzeCommunication { candidate_id: CandidateId, recordings: usize },
    FetchAggregateResults { candidate_id: CandidateId },
}

impl MockCall {
    fn operation(&self) -> MockOperation {
        match self {
            MockCall::SubmitResume { .. } => MockOperation::SubmitResume,
            MockCall::FetchQuizQuestions { .. } => MockOperation::FetchQuizQuestions,
            MockCall::SubmitAnswer(_) => MockOperation::SubmitAnswer,
            MockCall::AnalyzeCommunication { .. } => MockOperation::AnalyzeCommunication,
            MockCall::FetchAggregateResults { .. } => MockOperation::FetchAggregateResults,
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    resume: VecDeque<Result<ResumeReceipt, GatewayError>>,
    quiz: VecDeque<Result<Vec<QuizItem>, GatewayError>>,
    answers: VecDeque<Result<(), GatewayError>>,
    communication: VecDeque<Result<CommunicationAnalysis, GatewayError>>,
    results: VecDeque<Result<AggregateResults, GatewayError>>,
    calls: Vec<MockCall>,
}

/// Mock analysis gateway for testing.
#[derive(Debug, Clone, Default)]
pub struct MockAnalysisGateway {
    state: Arc<Mutex<MockState>>,
    delay: Duration,
}

impl MockAnalysisGateway {
    /// Creates a mock that answers every call with default data.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// A quiz of `count` questions: options on the first half, free text after.
    pub fn sample_quiz(count: usize) -> Vec<QuizItem> {
        (0..count)
            .filter_map(|i| {
                let id = QuizId::new(format!("q{}", i + 1)).ok()?;
                let options = (i < count / 2)
                    .then(|| vec!["A".to_string(), "B".to_string(), "C".to_string()]);
                QuizItem::new(id, format!("Question {}", i + 1), options, None, i).ok()
            })
            .collect()
    }

    /// Default receipt returned when none is queued.
    pub fn default_receipt() -> Result<ResumeReceipt, GatewayError> {
        let candidate_id = CandidateId::new(MOCK_CANDIDATE_ID)
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        Ok(ResumeReceipt {
            candidate_id,
            analysis: ResumeAnalysis {
                match_score: 80.0,
                matched_skills: vec!["rust".into(), "sql".into()],
                missing_skills: vec!["kubernetes".into()],
                experience_match: "Strong".into(),
                highlights: vec!["Shipped a payments service".into()],
                questions: vec![
                    "Describe a production incident you handled".into(),
                    "How do you approach code review?".into(),
                ],
            },
        })
    }

    /// Default aggregate results returned when none are queued.
    pub fn default_results() -> AggregateResults {
        AggregateResults {
            resume: Some(ResumeAnalysis {
                match_score: 80.0,
                ..Default::default()
            }),
            communication: None,
            technical: TechnicalSummary {
                overall_score: 70.0,
                experience_based: 65.0,
                coding_percentage: 0.7,
                text_percentage: 0.6,
            },
            candidate: Some(CandidateSummary {
                name: "Jane Doe".into(),
                email: "jane@x.com".into(),
            }),
        }
    }

    pub fn with_resume_receipt(self, receipt: ResumeReceipt) -> Self {
        self.state().resume.push_back(Ok(receipt));
        self
    }

    pub fn with_resume_error(self, error: GatewayError) -> Self {
        self.state().resume.push_back(Err(error));
        self
    }

    pub fn with_quiz(self, items: Vec<QuizItem>) -> Self {
        self.state().quiz.push_back(Ok(items));
        self
    }

    pub fn with_quiz_error(self, error: GatewayError) -> Self {
        self.state().quiz.push_back(Err(error));
        self
    }

    /// Queues a failure for the next answer submission.
    pub fn with_answer_error(self, error: GatewayError) -> Self {
        self.state().answers.push_back(Err(error));
        self
    }

    pub fn with_communication(self, analysis: CommunicationAnalysis) -> Self {
        self.state().communication.push_back(Ok(analysis));
        self
    }

    pub fn with_communication_error(self, error: GatewayError) -> Self {
        self.state().communication.push_back(Err(error));
        self
    }

    pub fn with_results(self, results: AggregateResults) -> Self {
        self.state().results.push_back(Ok(results));
        self
    }

    pub fn with_results_error(self, error: GatewayError) -> Self {
        self.state().results.push_back(Err(error));
        self
    }

    /// Sets simulated latency per request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Returns the total number of calls made.
    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }

    /// Returns the number of calls made to one operation.
    pub fn calls_to(&self, operation: MockOperation) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.operation() == operation)
            .count()
    }

    /// Returns all recorded calls.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }

    /// Returns every answer that reached the gateway.
    pub fn submitted_answers(&self) -> Vec<AnswerSubmission> {
        self.state()
            .calls
            .iter()
            .filter_map(|c| match c {
                MockCall::SubmitAnswer(a) => Some(a.clone()),
                _ => None,
            })
            .collect()
    }

    async fn simulate_latency(&self) {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl AnalysisGateway for MockAnalysisGateway {
    async fn submit_resume(
        &self,
        _token: &BearerToken,
        submission: &ResumeSubmission,
    ) -> Result<ResumeReceipt, GatewayError> {
        self.state().calls.push(MockCall::SubmitResume {
            email: submission.candidate.email().to_string(),
        });
        self.simulate_latency().await;

        let next = self.state().resume.pop_front();
        next.unwrap_or_else(Self::default_receipt)
    }

    async fn fetch_quiz_questions(
        &self,
        _token: &BearerToken,
        candidate_id: &CandidateId,
    ) -> Result<Vec<QuizItem>, GatewayError> {
        self.state().calls.push(MockCall::FetchQuizQuestions {
            candidate_id: candidate_id.clone(),
        });
        self.simulate_latency().await;

        let next = self.state().quiz.pop_front();
        next.unwrap_or_else(|| Ok(Self::sample_quiz(10)))
    }

    async fn submit_answer(
        &self,
        _token: &BearerToken,
        answer: &AnswerSubmission,
    ) -> Result<(), GatewayError> {
        self.state().calls.push(MockCall::SubmitAnswer(answer.clone()));
        self.simulate_latency().await;

        let next = self.state().answers.pop_front();
        next.unwrap_or(Ok(()))
    }

    async fn analyze_communication(
        &self,
        _token: &BearerToken,
        request: &CommunicationRequest,
    ) -> Result<CommunicationAnalysis, GatewayError> {
        self.state().calls.push(MockCall::AnalyzeCommunication {
            candidate_id: request.candidate_id.clone(),
            recordings: request.answers.len(),
        });
        self.simulate_latency().await;

        let next = self.state().communication.pop_front();
        next.unwrap_or_else(|| {
            Ok(CommunicationAnalysis {
                communication_score: 70.0,
                fluency: 72.0,
                clarity: 68.0,
                professionalism: 75.0,
                response_time_secs: 2.5,
                filler_words: 3,
                speech_rate_wpm: 130.0,
                confidence_level: "Medium".into(),
                feedback: vec!["Good structure".into()],
            })
        })
    }

    async fn fetch_aggregate_results(
        &self,
        _token: &BearerToken,
        candidate_id: &CandidateId,
    ) -> Result<AggregateResults, GatewayError> {
        self.state().calls.push(MockCall::FetchAggregateResults {
            candidate_id: candidate_id.clone(),
        });
        self.simulate_latency().await;

        let next = self.state().results.pop_front();
        next.unwrap_or_else(|| Ok(Self::default_results()))
    }
}
