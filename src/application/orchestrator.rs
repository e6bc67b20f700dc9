//! AssessmentOrchestrator - drives the session through its stages.
//!
//! The orchestrator is the only writer of the session. Every change is
//! applied to a copy, persisted, and only then swapped in, so a storage
//! failure never leaves memory ahead of the store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::domain::assessment::{AssessmentEvent, AssessmentSession, StageOutcome, StageSequence};
use crate::domain::foundation::{AssessmentStage, CandidateId, Score, StageKind};
use crate::domain::scoring::StageWeights;
use crate::ports::{
    BearerToken, SessionStore, SessionStoreError, StageAdapter, StageContext, StageError, StoreKey,
};

use super::stages::{CountdownEnd, TechnicalStage};

/// Shape of a new session.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentSettings {
    pub workflow: StageSequence,
    pub weights: StageWeights,
}

impl Default for AssessmentSettings {
    fn default() -> Self {
        Self {
            workflow: StageSequence::standard(),
            weights: StageWeights::CANONICAL,
        }
    }
}

/// Result of a successful stage completion.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvanceOutcome {
    pub previous: AssessmentStage,
    pub current: AssessmentStage,
    /// View to show next.
    pub route: &'static str,
    pub running_score: Score,
    pub final_score: Option<Score>,
}

/// Clears the busy flag when dropped.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, StageError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(flag))
            .map_err(|_| StageError::Busy)
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives one assessment session.
pub struct AssessmentOrchestrator {
    store: Arc<dyn SessionStore>,
    settings: AssessmentSettings,
    session: Mutex<AssessmentSession>,
    busy: AtomicBool,
}

impl AssessmentOrchestrator {
    /// Restores the persisted session or starts a new one.
    ///
    /// A snapshot that cannot be read back is logged and replaced.
    pub async fn start(
        store: Arc<dyn SessionStore>,
        settings: AssessmentSettings,
    ) -> Result<Self, StageError> {
        let restored = match store.get(StoreKey::Snapshot).await? {
            Some(yaml) => match serde_yaml::from_str::<AssessmentSession>(&yaml) {
                Ok(session) => Some(session),
                Err(e) => {
                    warn!(error = %e, "Discarding unreadable session snapshot");
                    None
                }
            },
            None => None,
        };

        let session = match restored {
            Some(session) => {
                info!(
                    session_id = %session.id(),
                    stage = %session.current_stage(),
                    started_at = %session.created_at(),
                    "Session restored"
                );
                session
            }
            None => {
                let mut session = Self::new_session(&settings)?;
                persist(store.as_ref(), &session).await?;
                log_events(session.take_events());
                session
            }
        };

        Ok(Self {
            store,
            settings,
            session: Mutex::new(session),
            busy: AtomicBool::new(false),
        })
    }

    fn new_session(settings: &AssessmentSettings) -> Result<AssessmentSession, StageError> {
        Ok(AssessmentSession::new(
            settings.workflow.clone(),
            settings.weights,
        )?)
    }

    pub fn settings(&self) -> &AssessmentSettings {
        &self.settings
    }

    /// Copy of the current session.
    pub async fn snapshot(&self) -> AssessmentSession {
        self.session.lock().await.clone()
    }

    pub async fn current_stage(&self) -> AssessmentStage {
        self.session.lock().await.current_stage()
    }

    /// View matching the current stage.
    pub async fn route(&self) -> &'static str {
        self.current_stage().await.route()
    }

    pub async fn candidate_id(&self) -> Option<CandidateId> {
        self.session.lock().await.candidate_id().cloned()
    }

    pub async fn follow_up_questions(&self) -> Vec<String> {
        self.session.lock().await.follow_up_questions().to_vec()
    }

    /// Weighted score over the stages completed so far.
    pub async fn running_score(&self) -> Score {
        self.session.lock().await.running_score()
    }

    pub async fn final_score(&self) -> Option<Score> {
        self.session.lock().await.final_score()
    }

    /// Credential and candidate id for a stage about to run.
    ///
    /// Fails with `Auth` when no credential is stored, and with
    /// `MissingCandidate` when a stage after the first runs without a
    /// candidate id.
    pub async fn stage_context(&self, kind: StageKind) -> Result<StageContext, StageError> {
        let raw = self
            .store
            .get(StoreKey::Credential)
            .await?
            .ok_or(StageError::Auth)?;
        let credential = BearerToken::new(raw.trim()).map_err(|_| StageError::Auth)?;

        let session = self.session.lock().await;
        let candidate_id = session.candidate_id().cloned();
        if candidate_id.is_none() && session.workflow().requires_candidate(kind) {
            return Err(StageError::MissingCandidate);
        }

        Ok(StageContext::new(credential, candidate_id))
    }

    /// Applies a stage outcome and persists the new state.
    pub async fn advance(
        &self,
        kind: StageKind,
        outcome: StageOutcome,
    ) -> Result<AdvanceOutcome, StageError> {
        let mut session = self.session.lock().await;

        let mut next = session.clone();
        let transition = next.advance(kind, outcome)?;

        if let Err(e) = persist(self.store.as_ref(), &next).await {
            error!(stage = %kind, error = %e, "Failed to persist session; stage not advanced");
            return Err(e);
        }

        if let Some(ignored) = &transition.ignored_candidate_id {
            warn!(
                ignored = %ignored,
                "Ignoring candidate id; one is already assigned"
            );
        }
        log_events(next.take_events());

        *session = next;

        info!(
            from = %transition.previous,
            to = %transition.current,
            "Stage advanced"
        );

        Ok(AdvanceOutcome {
            previous: transition.previous,
            current: transition.current,
            route: transition.current.route(),
            running_score: session.running_score(),
            final_score: session.final_score(),
        })
    }

    /// Validates, submits and records one stage.
    ///
    /// Only one completion runs at a time; a concurrent call fails with
    /// `Busy`. No error changes the current stage.
    pub async fn complete_stage(
        &self,
        adapter: &dyn StageAdapter,
    ) -> Result<AdvanceOutcome, StageError> {
        let _guard = BusyGuard::acquire(&self.busy)?;
        let kind = adapter.kind();

        let result = self.run_stage(kind, adapter).await;
        if let Err(e) = &result {
            warn!(stage = %kind, error = %e, "Stage submission failed");
        }
        result
    }

    async fn run_stage(
        &self,
        kind: StageKind,
        adapter: &dyn StageAdapter,
    ) -> Result<AdvanceOutcome, StageError> {
        self.session.lock().await.validate_can_submit(kind)?;

        let ctx = self.stage_context(kind).await?;
        adapter.validate(&ctx).await?;

        debug!(stage = %kind, "Submitting stage");
        let outcome = adapter.submit(&ctx).await?;
        let advanced = self.advance(kind, outcome).await?;
        adapter.committed().await;
        Ok(advanced)
    }

    /// Waits for the technical countdown and finalizes on expiry.
    ///
    /// Returns `None` when the countdown is cancelled, or when a manual
    /// submission is running or has already finalized the stage.
    pub async fn run_countdown(
        &self,
        technical: &TechnicalStage,
    ) -> Option<Result<AdvanceOutcome, StageError>> {
        if technical.countdown().wait().await == CountdownEnd::Cancelled {
            debug!("Countdown cancelled");
            return None;
        }

        info!("Time limit reached; finalizing technical stage");
        match self.complete_stage(&technical.on_timer()).await {
            Err(StageError::Busy) | Err(StageError::AlreadyFinalized) => None,
            other => Some(other),
        }
    }

    /// Drops the current session and starts a fresh one.
    pub async fn discard(&self) -> Result<(), StageError> {
        let _guard = BusyGuard::acquire(&self.busy)?;
        let mut session = self.session.lock().await;

        let mut fresh = Self::new_session(&self.settings)?;
        persist(self.store.as_ref(), &fresh).await?;
        log_events(fresh.take_events());

        info!(previous = %session.id(), current = %fresh.id(), "Session discarded");
        *session = fresh;

        // Restore reads only the snapshot
        if let Err(e) = self.store.clear(StoreKey::CandidateId).await {
            warn!(error = %e, "Failed to clear stored candidate id");
        }
        Ok(())
    }
}

/// Writes the session. The snapshot write is the commit point.
async fn persist(store: &dyn SessionStore, session: &AssessmentSession) -> Result<(), StageError> {
    let yaml = serde_yaml::to_string(session).map_err(|e| {
        SessionStoreError::SerializationFailed {
            key: StoreKey::Snapshot,
            message: e.to_string(),
        }
    })?;

    // Immutable once assigned; the snapshot below is the commit point
    if let Some(candidate_id) = session.candidate_id() {
        store.set(StoreKey::CandidateId, candidate_id.as_str()).await?;
    }
    store.set(StoreKey::Snapshot, &yaml).await?;
    Ok(())
}

fn log_events(events: Vec<AssessmentEvent>) {
    for event in events {
        match event {
            AssessmentEvent::Started { session_id, .. } => {
                info!(%session_id, "Assessment started");
            }
            AssessmentEvent::CandidateAssigned {
                session_id,
                candidate_id,
            } => {
                info!(%session_id, %candidate_id, "Candidate assigned");
            }
            AssessmentEvent::StageCompleted {
                session_id,
                stage,
                score,
            } => {
                info!(%session_id, %stage, score = score.value(), "Stage completed");
            }
            AssessmentEvent::Completed {
                session_id,
                final_score,
            } => {
                info!(%session_id, final_score = final_score.value(), "Assessment completed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::InMemorySessionStore;
    use crate::domain::assessment::{ResumeResult, StageResult};
    use async_trait::async_trait;

    struct FixedStage {
        kind: StageKind,
        outcome: StageOutcome,
    }

    #[async_trait]
    impl StageAdapter for FixedStage {
        fn kind(&self) -> StageKind {
            self.kind
        }

        async fn validate(&self, _ctx: &StageContext) -> Result<(), StageError> {
            Ok(())
        }

        async fn submit(&self, _ctx: &StageContext) -> Result<StageOutcome, StageError> {
            Ok(self.outcome.clone())
        }

        async fn cancel(&self) {}
    }

    fn resume_stage() -> FixedStage {
        FixedStage {
            kind: StageKind::Resume,
            outcome: StageOutcome::from_result(StageResult::Resume(ResumeResult {
                score: Score::new(80),
                ..Default::default()
            }))
            .with_candidate(CandidateId::new("cand-001").unwrap()),
        }
    }

    async fn orchestrator(store: &InMemorySessionStore) -> AssessmentOrchestrator {
        AssessmentOrchestrator::start(Arc::new(store.clone()), AssessmentSettings::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn start_persists_new_session() {
        let store = InMemorySessionStore::new();
        let orch = orchestrator(&store).await;

        assert_eq!(orch.current_stage().await, AssessmentStage::Resume);
        assert_eq!(orch.route().await, "resume");
        assert!(store.get(StoreKey::Snapshot).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn missing_credential_is_auth_error() {
        let store = InMemorySessionStore::new();
        let orch = orchestrator(&store).await;

        let err = orch.complete_stage(&resume_stage()).await.unwrap_err();

        assert_eq!(err, StageError::Auth);
        assert_eq!(orch.current_stage().await, AssessmentStage::Resume);
    }

    #[tokio::test]
    async fn resume_completion_advances_and_stores_candidate() {
        let store = InMemorySessionStore::with_credential("token");
        let orch = orchestrator(&store).await;

        let outcome = orch.complete_stage(&resume_stage()).await.unwrap();

        assert_eq!(outcome.current, AssessmentStage::Technical);
        assert_eq!(outcome.route, "technical");
        assert_eq!(outcome.running_score, Score::new(32));
        assert_eq!(
            store.get(StoreKey::CandidateId).await.unwrap().as_deref(),
            Some("cand-001")
        );
    }

    #[tokio::test]
    async fn out_of_order_stage_is_rejected() {
        let store = InMemorySessionStore::with_credential("token");
        let orch = orchestrator(&store).await;
        let writes = store.write_count();
        let technical = FixedStage {
            kind: StageKind::Technical,
            outcome: resume_stage().outcome,
        };

        let err = orch.complete_stage(&technical).await.unwrap_err();

        assert!(matches!(err, StageError::Validation(_)));
        assert_eq!(store.write_count(), writes);
    }

    #[tokio::test]
    async fn storage_failure_leaves_state_unchanged() {
        let store = InMemorySessionStore::with_credential("token");
        let orch = orchestrator(&store).await;
        store.set_fail_writes(true);

        let err = orch.complete_stage(&resume_stage()).await.unwrap_err();

        assert!(matches!(err, StageError::Storage(_)));
        assert_eq!(orch.current_stage().await, AssessmentStage::Resume);
        assert!(orch.candidate_id().await.is_none());
    }

    #[tokio::test]
    async fn failed_candidate_id_write_commits_nothing() {
        let store = InMemorySessionStore::with_credential("token");
        let orch = orchestrator(&store).await;
        let before = store.get(StoreKey::Snapshot).await.unwrap();
        store.set_fail_writes_for(StoreKey::CandidateId, true);

        let err = orch.complete_stage(&resume_stage()).await.unwrap_err();

        assert!(matches!(err, StageError::Storage(_)));
        assert_eq!(store.get(StoreKey::Snapshot).await.unwrap(), before);
        let restarted = orchestrator(&store).await;
        assert_eq!(restarted.current_stage().await, AssessmentStage::Resume);
    }

    #[tokio::test]
    async fn failed_discard_keeps_stored_session() {
        let store = InMemorySessionStore::with_credential("token");
        let orch = orchestrator(&store).await;
        orch.complete_stage(&resume_stage()).await.unwrap();
        let stored = store.get(StoreKey::Snapshot).await.unwrap();
        store.set_fail_writes(true);

        assert!(orch.discard().await.is_err());

        assert_eq!(orch.current_stage().await, AssessmentStage::Technical);
        assert_eq!(store.get(StoreKey::Snapshot).await.unwrap(), stored);
        assert!(store.get(StoreKey::CandidateId).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_replaced() {
        let store = InMemorySessionStore::new();
        store.set(StoreKey::Snapshot, "{not: [valid").await.unwrap();

        let orch = orchestrator(&store).await;

        assert_eq!(orch.current_stage().await, AssessmentStage::Resume);
        let yaml = store.get(StoreKey::Snapshot).await.unwrap().unwrap();
        assert!(serde_yaml::from_str::<AssessmentSession>(&yaml).is_ok());
    }

    #[tokio::test]
    async fn discard_starts_fresh_session() {
        let store = InMemorySessionStore::with_credential("token");
        let orch = orchestrator(&store).await;
        orch.complete_stage(&resume_stage()).await.unwrap();
        let old_id = orch.snapshot().await.id();

        orch.discard().await.unwrap();

        assert_eq!(orch.current_stage().await, AssessmentStage::Resume);
        assert_ne!(orch.snapshot().await.id(), old_id);
        assert!(store.get(StoreKey::CandidateId).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalid_weights_fail_to_start() {
        let store = InMemorySessionStore::new();
        let settings = AssessmentSettings {
            workflow: StageSequence::standard(),
            weights: StageWeights::with_communication(),
        };

        let result = AssessmentOrchestrator::start(Arc::new(store), settings).await;
        assert!(matches!(result, Err(StageError::Validation(_))));
    }
}
