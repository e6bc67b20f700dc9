//! CommunicationStage - spoken answers to the resume follow-up questions.
//!
//! One recording per question. Recording runs in a background task that
//! drains the capture stream until stopped; the device is held only while
//! that task is alive. Each recording is analyzed at most once, and the
//! per-question analyses are combined into a single stage result on submit.

use async_trait::async_trait;
use futures::StreamExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::assessment::{CommunicationResult, SpeechMetrics, StageResult};
use crate::domain::foundation::{Score, StageKind, ValidationError};
use crate::ports::{
    AnalysisGateway, AudioCapture, CaptureError, CommunicationAnalysis, CommunicationRequest,
    SpokenAnswer, StageAdapter, StageContext, StageError, StageOutcome,
};

struct ActiveRecording {
    index: usize,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<Result<Vec<u8>, CaptureError>>,
}

#[derive(Default)]
struct Answers {
    cursor: usize,
    recordings: BTreeMap<usize, Vec<u8>>,
    analyses: BTreeMap<usize, CommunicationAnalysis>,
}

/// Stage adapter for the spoken-communication stage.
pub struct CommunicationStage {
    gateway: Arc<dyn AnalysisGateway>,
    capture: Arc<dyn AudioCapture>,
    questions: Vec<String>,
    answers: Mutex<Answers>,
    recording: Mutex<Option<ActiveRecording>>,
}

impl CommunicationStage {
    pub fn new(
        gateway: Arc<dyn AnalysisGateway>,
        capture: Arc<dyn AudioCapture>,
        questions: Vec<String>,
    ) -> Self {
        Self {
            gateway,
            capture,
            questions,
            answers: Mutex::new(Answers::default()),
            recording: Mutex::new(None),
        }
    }

    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    pub async fn cursor(&self) -> usize {
        self.answers.lock().await.cursor
    }

    pub async fn current_question(&self) -> Option<&str> {
        let cursor = self.cursor().await;
        self.questions.get(cursor).map(String::as_str)
    }

    pub async fn is_recording(&self) -> bool {
        self.recording.lock().await.is_some()
    }

    pub async fn has_recording(&self, index: usize) -> bool {
        self.answers.lock().await.recordings.contains_key(&index)
    }

    /// Opens the capture device and starts recording the current question.
    pub async fn start_recording(&self) -> Result<(), StageError> {
        let mut active = self.recording.lock().await;
        if active.is_some() {
            return Err(StageError::Busy);
        }

        let index = self.cursor().await;
        if index >= self.questions.len() {
            return Err(ValidationError::empty_field("question").into());
        }

        let mut stream = self.capture.open().await?;
        let (stop, mut stopped) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut audio = Vec::new();
            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    chunk = stream.next() => match chunk {
                        Some(Ok(bytes)) => audio.extend_from_slice(&bytes),
                        Some(Err(e)) => return Err(e),
                        None => break,
                    },
                }
            }
            Ok(audio)
        });

        debug!(question = index, "Recording started");
        *active = Some(ActiveRecording {
            index,
            stop,
            handle,
        });
        Ok(())
    }

    /// Stops recording and stores the audio for its question.
    ///
    /// Re-recording a question discards its previous analysis. Returns the
    /// number of bytes captured.
    pub async fn stop_recording(&self) -> Result<usize, StageError> {
        let active = self.recording.lock().await.take();
        let Some(active) = active else {
            return Err(ValidationError::empty_field("recording").into());
        };

        // The task may already have finished if the stream ended
        let _ = active.stop.send(());
        let audio = active
            .handle
            .await
            .map_err(|e| StageError::Capture(e.to_string()))??;

        if audio.is_empty() {
            return Err(StageError::Capture("no audio was captured".to_string()));
        }

        let len = audio.len();
        let mut answers = self.answers.lock().await;
        answers.recordings.insert(active.index, audio);
        answers.analyses.remove(&active.index);
        debug!(question = active.index, bytes = len, "Recording stored");
        Ok(len)
    }

    /// Analyzes the current question's recording, once.
    ///
    /// A repeated call returns the stored analysis without contacting the
    /// gateway.
    pub async fn analyze_current(
        &self,
        ctx: &StageContext,
    ) -> Result<CommunicationAnalysis, StageError> {
        let mut answers = self.answers.lock().await;
        let index = answers.cursor;
        self.analyze_locked(&mut answers, ctx, index).await
    }

    async fn analyze_locked(
        &self,
        answers: &mut Answers,
        ctx: &StageContext,
        index: usize,
    ) -> Result<CommunicationAnalysis, StageError> {
        if let Some(existing) = answers.analyses.get(&index) {
            debug!(question = index, "Recording already analyzed");
            return Ok(existing.clone());
        }

        let candidate_id = ctx.require_candidate()?.clone();
        let audio = answers
            .recordings
            .get(&index)
            .cloned()
            .ok_or_else(|| ValidationError::empty_field(format!("recording[{}]", index)))?;
        let question = self.questions.get(index).cloned().unwrap_or_default();

        let request = CommunicationRequest {
            candidate_id,
            answers: vec![SpokenAnswer {
                index,
                question,
                audio,
            }],
        };
        let analysis = self
            .gateway
            .analyze_communication(&ctx.credential, &request)
            .await?;

        info!(
            question = index,
            score = analysis.communication_score,
            "Spoken answer analyzed"
        );
        answers.analyses.insert(index, analysis.clone());
        Ok(analysis)
    }

    /// Moves to the next question. Not allowed while recording.
    pub async fn next_question(&self) -> Result<usize, StageError> {
        if self.is_recording().await {
            return Err(StageError::Busy);
        }
        let mut answers = self.answers.lock().await;
        if answers.cursor + 1 < self.questions.len() {
            answers.cursor += 1;
        }
        Ok(answers.cursor)
    }

    /// Moves to the previous question. Not allowed while recording.
    pub async fn previous_question(&self) -> Result<usize, StageError> {
        if self.is_recording().await {
            return Err(StageError::Busy);
        }
        let mut answers = self.answers.lock().await;
        answers.cursor = answers.cursor.saturating_sub(1);
        Ok(answers.cursor)
    }
}

/// Combines per-question analyses into the stage result.
///
/// Scores and rates are averaged, filler words summed, the confidence label
/// taken from the latest answer and feedback de-duplicated in order.
pub fn aggregate_analyses(
    analyses: &[CommunicationAnalysis],
) -> Result<CommunicationResult, StageError> {
    if analyses.is_empty() {
        return Err(StageError::AnalysisFailure(
            "No spoken answers were analyzed".to_string(),
        ));
    }

    let n = analyses.len() as f64;
    let mean = |f: fn(&CommunicationAnalysis) -> f64| analyses.iter().map(f).sum::<f64>() / n;
    let score = |field: &str, value: f64| {
        Score::from_f64(field, value).map_err(|e| StageError::AnalysisFailure(e.to_string()))
    };

    let mut feedback: Vec<String> = Vec::new();
    for item in analyses.iter().flat_map(|a| a.feedback.iter()) {
        if !feedback.contains(item) {
            feedback.push(item.clone());
        }
    }

    let confidence_label = analyses
        .iter()
        .rev()
        .map(|a| a.confidence_level.trim())
        .find(|label| !label.is_empty())
        .unwrap_or_default()
        .to_string();

    Ok(CommunicationResult {
        score: score("communication_score", mean(|a| a.communication_score))?,
        fluency: score("fluency", mean(|a| a.fluency))?,
        clarity: score("clarity", mean(|a| a.clarity))?,
        professionalism: score("professionalism", mean(|a| a.professionalism))?,
        metrics: SpeechMetrics {
            response_time_secs: mean(|a| a.response_time_secs),
            filler_word_count: analyses.iter().map(|a| a.filler_words).sum(),
            speech_rate_wpm: mean(|a| a.speech_rate_wpm),
            confidence_label,
        },
        feedback,
    })
}

#[async_trait]
impl StageAdapter for CommunicationStage {
    fn kind(&self) -> StageKind {
        StageKind::Communication
    }

    async fn validate(&self, ctx: &StageContext) -> Result<(), StageError> {
        ctx.require_candidate()?;
        if self.questions.is_empty() {
            return Err(ValidationError::empty_field("follow_up_questions").into());
        }
        if self.is_recording().await {
            return Err(StageError::Busy);
        }

        let answers = self.answers.lock().await;
        if let Some(missing) = (0..self.questions.len()).find(|i| !answers.recordings.contains_key(i)) {
            return Err(ValidationError::empty_field(format!("recording[{}]", missing)).into());
        }
        Ok(())
    }

    async fn submit(&self, ctx: &StageContext) -> Result<StageOutcome, StageError> {
        self.validate(ctx).await?;

        let mut answers = self.answers.lock().await;
        let mut analyses = Vec::with_capacity(self.questions.len());
        for index in 0..self.questions.len() {
            analyses.push(self.analyze_locked(&mut answers, ctx, index).await?);
        }

        let result = aggregate_analyses(&analyses)?;
        info!(score = result.score.value(), "Communication stage scored");
        Ok(StageOutcome::from_result(StageResult::Communication(result)))
    }

    async fn cancel(&self) {
        let active = self.recording.lock().await.take();
        if let Some(active) = active {
            active.handle.abort();
            // Wait for the task to unwind so the device stream is dropped
            if let Err(e) = active.handle.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "Recording task failed during cancel");
                }
            }
            debug!(question = active.index, "Recording cancelled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::gateway::{MockAnalysisGateway, MockOperation};
    use crate::domain::foundation::CandidateId;
    use crate::ports::{AudioStream, BearerToken};
    use futures::stream;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Capture that emits one chunk then stays open until dropped.
    struct LiveCapture {
        released: Arc<AtomicBool>,
    }

    struct ReleaseOnDrop(Arc<AtomicBool>);

    impl Drop for ReleaseOnDrop {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl AudioCapture for LiveCapture {
        async fn open(&self) -> Result<AudioStream, CaptureError> {
            self.released.store(false, Ordering::SeqCst);
            let guard = ReleaseOnDrop(Arc::clone(&self.released));
            let first = stream::once(async { Ok(vec![1u8, 2, 3]) });
            let rest = stream::pending().map(move |chunk: Result<Vec<u8>, CaptureError>| {
                let _held = &guard;
                chunk
            });
            Ok(Box::pin(first.chain(rest)))
        }
    }

    struct DeniedCapture;

    #[async_trait]
    impl AudioCapture for DeniedCapture {
        async fn open(&self) -> Result<AudioStream, CaptureError> {
            Err(CaptureError::PermissionDenied)
        }
    }

    fn ctx() -> StageContext {
        StageContext::new(
            BearerToken::new("token").unwrap(),
            Some(CandidateId::new("cand-001").unwrap()),
        )
    }

    fn stage(gateway: Arc<MockAnalysisGateway>, released: Arc<AtomicBool>) -> CommunicationStage {
        CommunicationStage::new(
            gateway,
            Arc::new(LiveCapture { released }),
            vec!["Tell us about yourself".into(), "Why this role?".into()],
        )
    }

    async fn record(stage: &CommunicationStage) {
        stage.start_recording().await.unwrap();
        tokio::task::yield_now().await;
        stage.stop_recording().await.unwrap();
    }

    fn analysis(score: f64, filler: u32, feedback: &[&str]) -> CommunicationAnalysis {
        CommunicationAnalysis {
            communication_score: score,
            fluency: score,
            clarity: score,
            professionalism: score,
            response_time_secs: 2.0,
            filler_words: filler,
            speech_rate_wpm: 120.0,
            confidence_level: "High".into(),
            feedback: feedback.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn recording_is_stored_and_device_released() {
        let released = Arc::new(AtomicBool::new(true));
        let stage = stage(Arc::new(MockAnalysisGateway::new()), Arc::clone(&released));

        stage.start_recording().await.unwrap();
        tokio::task::yield_now().await;
        assert!(!released.load(Ordering::SeqCst));

        let bytes = stage.stop_recording().await.unwrap();

        assert_eq!(bytes, 3);
        assert!(stage.has_recording(0).await);
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn second_start_while_recording_is_busy() {
        let stage = stage(Arc::new(MockAnalysisGateway::new()), Arc::new(AtomicBool::new(true)));
        stage.start_recording().await.unwrap();

        assert_eq!(stage.start_recording().await, Err(StageError::Busy));
        assert_eq!(stage.next_question().await, Err(StageError::Busy));
        stage.cancel().await;
    }

    #[tokio::test]
    async fn cancel_releases_device() {
        let released = Arc::new(AtomicBool::new(true));
        let stage = stage(Arc::new(MockAnalysisGateway::new()), Arc::clone(&released));
        stage.start_recording().await.unwrap();
        tokio::task::yield_now().await;

        stage.cancel().await;

        assert!(released.load(Ordering::SeqCst));
        assert!(!stage.is_recording().await);
        assert!(!stage.has_recording(0).await);
    }

    #[tokio::test]
    async fn permission_denied_maps_to_capture_error() {
        let stage = CommunicationStage::new(
            Arc::new(MockAnalysisGateway::new()),
            Arc::new(DeniedCapture),
            vec!["Q1".into()],
        );
        assert!(matches!(
            stage.start_recording().await,
            Err(StageError::Capture(_))
        ));
    }

    #[tokio::test]
    async fn analyze_current_runs_once_per_recording() {
        let gateway = Arc::new(MockAnalysisGateway::new());
        let stage = stage(Arc::clone(&gateway), Arc::new(AtomicBool::new(true)));
        record(&stage).await;

        stage.analyze_current(&ctx()).await.unwrap();
        stage.analyze_current(&ctx()).await.unwrap();

        assert_eq!(gateway.calls_to(MockOperation::AnalyzeCommunication), 1);
    }

    #[tokio::test]
    async fn submit_requires_every_question_recorded() {
        let gateway = Arc::new(MockAnalysisGateway::new());
        let stage = stage(Arc::clone(&gateway), Arc::new(AtomicBool::new(true)));
        record(&stage).await;

        let err = stage.submit(&ctx()).await.unwrap_err();

        assert!(matches!(err, StageError::Validation(_)));
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn submit_analyzes_pending_and_aggregates() {
        let gateway = Arc::new(
            MockAnalysisGateway::new()
                .with_communication(analysis(60.0, 2, &["Pace well"]))
                .with_communication(analysis(81.0, 3, &["Pace well", "Be concise"])),
        );
        let stage = stage(Arc::clone(&gateway), Arc::new(AtomicBool::new(true)));
        record(&stage).await;
        stage.analyze_current(&ctx()).await.unwrap();
        stage.next_question().await.unwrap();
        record(&stage).await;

        let outcome = stage.submit(&ctx()).await.unwrap();

        assert_eq!(gateway.calls_to(MockOperation::AnalyzeCommunication), 2);
        match outcome.result {
            StageResult::Communication(r) => {
                assert_eq!(r.score, Score::new(71));
                assert_eq!(r.metrics.filler_word_count, 5);
                assert_eq!(r.feedback, vec!["Pace well".to_string(), "Be concise".to_string()]);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn analyze_requires_candidate() {
        let stage = stage(Arc::new(MockAnalysisGateway::new()), Arc::new(AtomicBool::new(true)));
        record(&stage).await;
        let ctx = StageContext::new(BearerToken::new("token").unwrap(), None);

        assert_eq!(
            stage.analyze_current(&ctx).await.unwrap_err(),
            StageError::MissingCandidate
        );
    }

    #[test]
    fn aggregate_takes_latest_confidence_label() {
        let mut first = analysis(50.0, 0, &[]);
        first.confidence_level = "Low".into();
        let mut second = analysis(50.0, 0, &[]);
        second.confidence_level = "".into();

        let result = aggregate_analyses(&[first, second]).unwrap();
        assert_eq!(result.metrics.confidence_label, "Low");
    }

    #[test]
    fn aggregate_rejects_empty_input() {
        assert!(matches!(
            aggregate_analyses(&[]),
            Err(StageError::AnalysisFailure(_))
        ));
    }
}
