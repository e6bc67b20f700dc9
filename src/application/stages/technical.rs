//! TechnicalStage - timed quiz answered one question at a time.
//!
//! Answers are edited locally and sent to the gateway when the candidate
//! moves past a question. Each `(candidate, quiz)` pair is sent at most once.
//! The stage ends through `finalize`, which both the countdown and the manual
//! submit button call; the flush-and-close step inside it runs exactly once.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::assessment::{
    QuizItem, StageResult, TechnicalBreakdown, TechnicalResult,
};
use crate::domain::foundation::{CandidateId, QuizId, Score, StageKind, ValidationError};
use crate::ports::{
    AnalysisGateway, AnswerSubmission, StageAdapter, StageContext, StageError, StageOutcome,
    TechnicalSummary,
};

use super::countdown::{Countdown, DEFAULT_TIME_LIMIT};

/// Default points awarded per quiz question.
pub const DEFAULT_POINTS_PER_QUESTION: u32 = 10;

/// Tunables for the technical stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TechnicalSettings {
    pub points_per_question: u32,
    pub time_limit: Duration,
}

impl Default for TechnicalSettings {
    fn default() -> Self {
        Self {
            points_per_question: DEFAULT_POINTS_PER_QUESTION,
            time_limit: DEFAULT_TIME_LIMIT,
        }
    }
}

/// What started a finalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeTrigger {
    Manual,
    Timer,
}

/// Result of sending one answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionStatus {
    Submitted,
    /// Already acknowledged earlier; no request was made.
    AlreadySubmitted,
    /// Nothing to send.
    Skipped,
    /// The gateway rejected it. The candidate may continue.
    Failed(String),
}

/// Result of `next_question`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationOutcome {
    pub submission: SubmissionStatus,
    pub cursor: usize,
    /// True when the cursor is on the last question.
    pub at_end: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum FinalizeState {
    Open,
    AnswersClosed,
    /// Scored but not yet recorded on the session.
    Scored(TechnicalResult),
    Done,
}

#[derive(Debug, Default)]
struct QuizState {
    cursor: usize,
    answers: HashMap<QuizId, String>,
    /// Acknowledged submissions with the text that was sent.
    submitted: HashMap<(CandidateId, QuizId), String>,
    /// Submissions awaiting a gateway response.
    in_flight: HashSet<(CandidateId, QuizId)>,
    closed: bool,
}

/// Clears the busy flag when dropped.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Stage adapter for the technical screening.
pub struct TechnicalStage {
    gateway: Arc<dyn AnalysisGateway>,
    candidate_id: CandidateId,
    quiz: Vec<QuizItem>,
    settings: TechnicalSettings,
    state: StdMutex<QuizState>,
    busy: AtomicBool,
    finalize: Mutex<FinalizeState>,
    countdown: Countdown,
}

impl TechnicalStage {
    /// Fetches the candidate's quiz and starts the countdown.
    pub async fn prepare(
        gateway: Arc<dyn AnalysisGateway>,
        ctx: &StageContext,
        settings: TechnicalSettings,
    ) -> Result<Self, StageError> {
        let candidate_id = ctx.require_candidate()?.clone();
        let quiz = gateway
            .fetch_quiz_questions(&ctx.credential, &candidate_id)
            .await?;
        if quiz.is_empty() {
            return Err(StageError::AnalysisFailure(
                "No quiz questions are available for this candidate".to_string(),
            ));
        }

        info!(
            candidate_id = %candidate_id,
            questions = quiz.len(),
            time_limit_secs = settings.time_limit.as_secs(),
            "Technical quiz prepared"
        );

        Ok(Self {
            gateway,
            candidate_id,
            quiz,
            settings,
            state: StdMutex::new(QuizState::default()),
            busy: AtomicBool::new(false),
            finalize: Mutex::new(FinalizeState::Open),
            countdown: Countdown::start(settings.time_limit),
        })
    }

    fn state(&self) -> MutexGuard<'_, QuizState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn quiz(&self) -> &[QuizItem] {
        &self.quiz
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn cursor(&self) -> usize {
        self.state().cursor
    }

    pub fn current_question(&self) -> Option<&QuizItem> {
        self.quiz.get(self.cursor())
    }

    pub fn answer_for(&self, quiz_id: &QuizId) -> Option<String> {
        self.state().answers.get(quiz_id).cloned()
    }

    /// Number of answers acknowledged by the gateway.
    pub fn submitted_count(&self) -> usize {
        self.state().submitted.len()
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    /// Sets the answer for the current question, replacing any earlier one.
    pub fn record_answer(&self, answer: impl Into<String>) -> Result<(), StageError> {
        let answer = answer.into();
        let mut state = self.state();
        if state.closed {
            return Err(StageError::AlreadyFinalized);
        }

        let item = self
            .quiz
            .get(state.cursor)
            .ok_or_else(|| ValidationError::empty_field("question"))?;
        if !answer.trim().is_empty() && !item.accepts(&answer) {
            return Err(ValidationError::invalid_format(
                "answer",
                format!("'{}' is not one of the offered options", answer),
            )
            .into());
        }

        let key = (self.candidate_id.clone(), item.id.clone());
        if let Some(sent) = state.submitted.get(&key) {
            if *sent != answer {
                warn!(
                    quiz_id = %item.id,
                    "Answer edited after submission; the change stays local"
                );
            }
        }

        state.answers.insert(item.id.clone(), answer);
        Ok(())
    }

    /// Sends the current answer, then advances the cursor.
    ///
    /// A failed submission is reported in the outcome and does not block
    /// navigation.
    pub async fn next_question(&self, ctx: &StageContext) -> Result<NavigationOutcome, StageError> {
        let _guard = BusyGuard::acquire(&self.busy).ok_or(StageError::Busy)?;
        if self.is_closed() {
            return Err(StageError::AlreadyFinalized);
        }

        let index = self.cursor();
        let submission = match self.quiz.get(index) {
            Some(item) => self.submit_once(ctx, item).await,
            None => SubmissionStatus::Skipped,
        };

        let mut state = self.state();
        if state.cursor + 1 < self.quiz.len() {
            state.cursor += 1;
        }
        Ok(NavigationOutcome {
            submission,
            cursor: state.cursor,
            at_end: state.cursor + 1 >= self.quiz.len(),
        })
    }

    /// Moves back one question. Answers stay editable in place.
    pub fn previous_question(&self) -> usize {
        let mut state = self.state();
        state.cursor = state.cursor.saturating_sub(1);
        state.cursor
    }

    async fn submit_once(&self, ctx: &StageContext, item: &QuizItem) -> SubmissionStatus {
        let key = (self.candidate_id.clone(), item.id.clone());
        let answer = {
            let mut state = self.state();
            if state.submitted.contains_key(&key) || state.in_flight.contains(&key) {
                debug!(quiz_id = %item.id, "Answer already submitted, skipping");
                return SubmissionStatus::AlreadySubmitted;
            }
            let answer = match state.answers.get(&item.id) {
                Some(answer) if !answer.trim().is_empty() => answer.clone(),
                _ => return SubmissionStatus::Skipped,
            };
            state.in_flight.insert(key.clone());
            answer
        };

        let submission = AnswerSubmission {
            candidate_id: self.candidate_id.clone(),
            quiz_id: item.id.clone(),
            question_type: item.question_type,
            answer: answer.clone(),
        };

        let sent = self.gateway.submit_answer(&ctx.credential, &submission).await;
        let mut state = self.state();
        state.in_flight.remove(&key);
        match sent {
            Ok(()) => {
                debug!(quiz_id = %item.id, "Answer submitted");
                state.submitted.insert(key, answer);
                SubmissionStatus::Submitted
            }
            Err(e) => {
                warn!(quiz_id = %item.id, error = %e, "Answer submission failed");
                SubmissionStatus::Failed(StageError::from(e).user_message())
            }
        }
    }

    /// Ends the stage and returns its outcome.
    ///
    /// The first call flushes unsent answers, closes answering and stops the
    /// countdown. If the results fetch then fails the stage stays closed and
    /// a later call only retries the fetch. A produced result is returned
    /// again until `commit` records it; after that every call fails with
    /// `AlreadyFinalized`.
    pub async fn finalize(
        &self,
        ctx: &StageContext,
        trigger: FinalizeTrigger,
    ) -> Result<StageOutcome, StageError> {
        let mut finalize = self.finalize.lock().await;
        match &*finalize {
            FinalizeState::Done => return Err(StageError::AlreadyFinalized),
            FinalizeState::Scored(result) => {
                debug!(?trigger, "Returning technical result awaiting commit");
                return Ok(StageOutcome::from_result(StageResult::Technical(result.clone())));
            }
            FinalizeState::Open => {
                info!(?trigger, "Finalizing technical stage");
                self.flush(ctx).await;
                self.state().closed = true;
                self.countdown.cancel();
                *finalize = FinalizeState::AnswersClosed;
            }
            FinalizeState::AnswersClosed => {
                debug!(?trigger, "Retrying technical results fetch");
            }
        }

        let results = self
            .gateway
            .fetch_aggregate_results(&ctx.credential, &self.candidate_id)
            .await?;
        let result = self.build_result(&results.technical)?;

        info!(
            score = result.score.value(),
            answered = result.answered,
            unattempted = result.unattempted.len(),
            "Technical stage scored"
        );
        *finalize = FinalizeState::Scored(result.clone());
        Ok(StageOutcome::from_result(StageResult::Technical(result)))
    }

    /// Marks the scored result as recorded; later finalizes are rejected.
    pub async fn commit(&self) {
        let mut finalize = self.finalize.lock().await;
        if matches!(*finalize, FinalizeState::Scored(_)) {
            *finalize = FinalizeState::Done;
        }
    }

    /// Sends every non-empty answer that has not been acknowledged yet.
    async fn flush(&self, ctx: &StageContext) {
        for item in &self.quiz {
            if let SubmissionStatus::Failed(message) = self.submit_once(ctx, item).await {
                debug!(quiz_id = %item.id, %message, "Answer lost during flush");
            }
        }
    }

    fn build_result(&self, summary: &TechnicalSummary) -> Result<TechnicalResult, StageError> {
        let score = |field: &str, value: f64| {
            Score::from_f64(field, value).map_err(|e| StageError::AnalysisFailure(e.to_string()))
        };

        let overall = score("overall_score", summary.overall_score)?;
        let max_points = self.quiz.len() as u32 * self.settings.points_per_question;
        let raw_points = (overall.as_f64() * f64::from(max_points) / 100.0).round() as u32;

        let state = self.state();
        let answered: HashSet<&QuizId> = state.submitted.keys().map(|(_, id)| id).collect();
        let unattempted: Vec<QuizId> = self
            .quiz
            .iter()
            .filter(|item| !answered.contains(&item.id))
            .map(|item| item.id.clone())
            .collect();

        Ok(TechnicalResult {
            score: overall,
            raw_points,
            max_points,
            breakdown: TechnicalBreakdown {
                experience: score("experience_based", summary.experience_based)?,
                requirements: score("coding_percentage", summary.coding_percentage * 100.0)?,
                scenarios: score("text_percentage", summary.text_percentage * 100.0)?,
            },
            answered: answered.len() as u32,
            unattempted,
        })
    }

    /// Adapter that finalizes on behalf of the countdown.
    pub(crate) fn on_timer(&self) -> TimerFinalize<'_> {
        TimerFinalize(self)
    }

    async fn ensure_open(&self) -> Result<(), StageError> {
        if matches!(*self.finalize.lock().await, FinalizeState::Done) {
            return Err(StageError::AlreadyFinalized);
        }
        Ok(())
    }
}

#[async_trait]
impl StageAdapter for TechnicalStage {
    fn kind(&self) -> StageKind {
        StageKind::Technical
    }

    async fn validate(&self, ctx: &StageContext) -> Result<(), StageError> {
        ctx.require_candidate()?;
        self.ensure_open().await
    }

    async fn submit(&self, ctx: &StageContext) -> Result<StageOutcome, StageError> {
        self.finalize(ctx, FinalizeTrigger::Manual).await
    }

    async fn committed(&self) {
        self.commit().await
    }

    async fn cancel(&self) {
        self.countdown.cancel();
    }
}

/// Technical stage seen through the countdown's finalize path.
pub(crate) struct TimerFinalize<'a>(&'a TechnicalStage);

#[async_trait]
impl StageAdapter for TimerFinalize<'_> {
    fn kind(&self) -> StageKind {
        StageKind::Technical
    }

    async fn validate(&self, ctx: &StageContext) -> Result<(), StageError> {
        self.0.validate(ctx).await
    }

    async fn submit(&self, ctx: &StageContext) -> Result<StageOutcome, StageError> {
        self.0.finalize(ctx, FinalizeTrigger::Timer).await
    }

    async fn committed(&self) {
        self.0.commit().await
    }

    async fn cancel(&self) {
        self.0.cancel().await
    }
}
