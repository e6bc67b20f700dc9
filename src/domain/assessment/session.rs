//! AssessmentSession aggregate - the root entity for one candidate attempt.
//!
//! The session owns the stage results and the candidate id, and enforces the
//! forward-only stage progression. The final score is derived from the
//! completed results and weights and is never set directly.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::foundation::{
    AssessmentStage, CandidateId, DomainError, ErrorCode, Score, SessionId, StageKind,
    StateMachine, Timestamp,
};
use crate::domain::scoring::{ScoreAggregator, StageWeights};

use super::{AssessmentEvent, StageResult, StageSequence};

/// What a stage adapter hands back after a successful submission.
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutcome {
    pub result: StageResult,
    /// Candidate id issued by the gateway (resume stage only).
    pub candidate_id: Option<CandidateId>,
    /// Follow-up questions for the communication stage.
    pub follow_up_questions: Vec<String>,
}

impl StageOutcome {
    /// Outcome carrying only a result.
    pub fn from_result(result: StageResult) -> Self {
        Self {
            result,
            candidate_id: None,
            follow_up_questions: Vec::new(),
        }
    }

    pub fn with_candidate(mut self, candidate_id: CandidateId) -> Self {
        self.candidate_id = Some(candidate_id);
        self
    }

    pub fn with_follow_up_questions(mut self, questions: Vec<String>) -> Self {
        self.follow_up_questions = questions;
        self
    }
}

/// Record of a successful `advance`.
#[derive(Debug, Clone, PartialEq)]
pub struct StageTransition {
    pub previous: AssessmentStage,
    pub current: AssessmentStage,
    /// Set when the outcome carried a candidate id different from the one
    /// already assigned. The assigned id is kept.
    pub ignored_candidate_id: Option<CandidateId>,
}

/// The AssessmentSession aggregate root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentSession {
    id: SessionId,
    candidate_id: Option<CandidateId>,
    current_stage: AssessmentStage,
    workflow: StageSequence,
    stage_results: BTreeMap<StageKind, StageResult>,
    #[serde(default)]
    follow_up_questions: Vec<String>,
    weights: StageWeights,
    final_score: Option<Score>,
    created_at: Timestamp,
    updated_at: Timestamp,
    #[serde(skip)]
    domain_events: Vec<AssessmentEvent>,
}

impl AssessmentSession {
    /// Creates a new session at the first stage of the workflow.
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailed` if the weights are inconsistent with the
    /// workflow.
    pub fn new(workflow: StageSequence, weights: StageWeights) -> Result<Self, DomainError> {
        weights.validate_for(&workflow)?;

        let id = SessionId::new();
        let now = Timestamp::now();

        let mut session = Self {
            id,
            candidate_id: None,
            current_stage: workflow.first(),
            workflow,
            stage_results: BTreeMap::new(),
            follow_up_questions: Vec::new(),
            weights,
            final_score: None,
            created_at: now,
            updated_at: now,
            domain_events: Vec::new(),
        };

        session.record_event(AssessmentEvent::Started {
            session_id: id,
            started_at: now,
        });

        Ok(session)
    }

    // ───────────────────────────────────────────────────────────────
    // Accessors
    // ───────────────────────────────────────────────────────────────

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn candidate_id(&self) -> Option<&CandidateId> {
        self.candidate_id.as_ref()
    }

    pub fn current_stage(&self) -> AssessmentStage {
        self.current_stage
    }

    pub fn workflow(&self) -> &StageSequence {
        &self.workflow
    }

    pub fn stage_results(&self) -> &BTreeMap<StageKind, StageResult> {
        &self.stage_results
    }

    pub fn stage_result(&self, kind: StageKind) -> Option<&StageResult> {
        self.stage_results.get(&kind)
    }

    pub fn follow_up_questions(&self) -> &[String] {
        &self.follow_up_questions
    }

    pub fn weights(&self) -> &StageWeights {
        &self.weights
    }

    pub fn final_score(&self) -> Option<Score> {
        self.final_score
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn is_completed(&self) -> bool {
        self.current_stage.is_completed()
    }

    /// Weighted score over the stages completed so far.
    pub fn running_score(&self) -> Score {
        ScoreAggregator::aggregate(&self.stage_results, &self.weights)
    }

    /// Drains recorded domain events.
    pub fn take_events(&mut self) -> Vec<AssessmentEvent> {
        std::mem::take(&mut self.domain_events)
    }

    // ───────────────────────────────────────────────────────────────
    // Commands
    // ───────────────────────────────────────────────────────────────

    /// Checks that `kind` may submit right now, without mutating anything.
    ///
    /// Checks:
    /// 1. Session is not completed
    /// 2. `kind` is the current stage
    /// 3. Stages after the first have a candidate id
    pub fn validate_can_submit(&self, kind: StageKind) -> Result<(), DomainError> {
        if self.is_completed() {
            return Err(DomainError::new(
                ErrorCode::AssessmentCompleted,
                "Assessment is already completed",
            ));
        }

        if self.current_stage.kind() != Some(kind) {
            return Err(DomainError::new(
                ErrorCode::StageOutOfOrder,
                format!(
                    "Cannot submit {} while the session is at {}",
                    kind, self.current_stage
                ),
            )
            .with_detail("stage", kind.to_string()));
        }

        if self.workflow.requires_candidate(kind) && self.candidate_id.is_none() {
            return Err(DomainError::new(
                ErrorCode::CandidateRequired,
                format!("{} requires a candidate id", kind.display_name()),
            ));
        }

        Ok(())
    }

    /// Accepts the outcome of `kind` and moves to the next stage.
    ///
    /// On error the session is left untouched.
    pub fn advance(
        &mut self,
        kind: StageKind,
        outcome: StageOutcome,
    ) -> Result<StageTransition, DomainError> {
        self.validate_can_submit(kind)?;

        if outcome.result.kind() != kind {
            return Err(DomainError::new(
                ErrorCode::InvalidStageResult,
                format!(
                    "Result for {} submitted as {}",
                    outcome.result.kind(),
                    kind
                ),
            ));
        }

        outcome.result.validate()?;

        if self.candidate_id.is_none() && outcome.candidate_id.is_none() {
            return Err(DomainError::new(
                ErrorCode::CandidateRequired,
                "Resume submission did not yield a candidate id",
            ));
        }

        let previous = self.current_stage;
        let next = previous
            .transition_to(self.workflow.next_after(kind))
            .map_err(|e| DomainError::new(ErrorCode::InvalidStateTransition, e.to_string()))?;

        let ignored_candidate_id = match outcome.candidate_id {
            Some(id) => self.assign_candidate_id(id),
            None => None,
        };

        if kind == StageKind::Resume {
            self.follow_up_questions = if outcome.follow_up_questions.is_empty() {
                match &outcome.result {
                    StageResult::Resume(r) => r.generated_questions.clone(),
                    _ => Vec::new(),
                }
            } else {
                outcome.follow_up_questions
            };
        }

        let score = outcome.result.score();
        self.stage_results.insert(kind, outcome.result);
        self.current_stage = next;
        self.updated_at = Timestamp::now();

        self.record_event(AssessmentEvent::StageCompleted {
            session_id: self.id,
            stage: kind,
            score,
        });

        if next.is_completed() {
            let final_score = self.running_score();
            self.final_score = Some(final_score);
            self.record_event(AssessmentEvent::Completed {
                session_id: self.id,
                final_score,
            });
        }

        Ok(StageTransition {
            previous,
            current: next,
            ignored_candidate_id,
        })
    }

    /// Sets the candidate id if none is assigned yet.
    ///
    /// Returns the rejected id when a different one is already assigned.
    fn assign_candidate_id(&mut self, candidate_id: CandidateId) -> Option<CandidateId> {
        match &self.candidate_id {
            None => {
                self.record_event(AssessmentEvent::CandidateAssigned {
                    session_id: self.id,
                    candidate_id: candidate_id.clone(),
                });
                self.candidate_id = Some(candidate_id);
                None
            }
            Some(existing) if *existing == candidate_id => None,
            Some(_) => Some(candidate_id),
        }
    }

    fn record_event(&mut self, event: AssessmentEvent) {
        self.domain_events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::assessment::{ResumeResult, TechnicalBreakdown, TechnicalResult};
    use proptest::prelude::*;

    fn create_session() -> AssessmentSession {
        AssessmentSession::new(StageSequence::standard(), StageWeights::CANONICAL).unwrap()
    }

    fn cand(id: &str) -> CandidateId {
        CandidateId::new(id).unwrap()
    }

    fn resume_outcome(score: u8) -> StageOutcome {
        StageOutcome::from_result(StageResult::Resume(ResumeResult {
            score: Score::new(score),
            generated_questions: vec!["Tell me about a hard bug".into()],
            ..Default::default()
        }))
        .with_candidate(cand("cand-1"))
    }

    fn technical_outcome(score: u8) -> StageOutcome {
        StageOutcome::from_result(StageResult::Technical(TechnicalResult {
            score: Score::new(score),
            raw_points: u32::from(score),
            max_points: 100,
            breakdown: TechnicalBreakdown::default(),
            answered: 10,
            unattempted: vec![],
        }))
    }

    #[test]
    fn new_session_starts_at_resume_and_records_event() {
        let mut session = create_session();
        assert_eq!(session.current_stage(), AssessmentStage::Resume);
        assert!(session.candidate_id().is_none());
        assert!(session.final_score().is_none());

        let events = session.take_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], AssessmentEvent::Started { .. }));
    }

    #[test]
    fn new_session_rejects_weights_for_disabled_stage() {
        let result =
            AssessmentSession::new(StageSequence::standard(), StageWeights::with_communication());
        assert_eq!(result.unwrap_err().code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn resume_advances_to_technical_and_assigns_candidate() {
        let mut session = create_session();
        let transition = session.advance(StageKind::Resume, resume_outcome(80)).unwrap();

        assert_eq!(transition.previous, AssessmentStage::Resume);
        assert_eq!(transition.current, AssessmentStage::Technical);
        assert_eq!(session.candidate_id(), Some(&cand("cand-1")));
        assert_eq!(session.follow_up_questions().len(), 1);
    }

    #[test]
    fn resume_without_candidate_id_is_rejected() {
        let mut session = create_session();
        let outcome = StageOutcome::from_result(StageResult::Resume(ResumeResult::default()));

        let err = session.advance(StageKind::Resume, outcome).unwrap_err();
        assert_eq!(err.code, ErrorCode::CandidateRequired);
        assert_eq!(session.current_stage(), AssessmentStage::Resume);
    }

    #[test]
    fn out_of_order_stage_is_rejected_without_side_effects() {
        let mut session = create_session();
        session.take_events();
        let before = session.updated_at();

        let err = session
            .advance(StageKind::Technical, technical_outcome(90))
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::StageOutOfOrder);
        assert_eq!(session.current_stage(), AssessmentStage::Resume);
        assert!(session.stage_results().is_empty());
        assert_eq!(session.updated_at(), before);
        assert!(session.take_events().is_empty());
    }

    #[test]
    fn mismatched_result_kind_is_rejected() {
        let mut session = create_session();
        let err = session
            .advance(StageKind::Resume, technical_outcome(50).with_candidate(cand("c")))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStageResult);
    }

    #[test]
    fn invalid_result_schema_is_rejected() {
        let mut session = create_session();
        session.advance(StageKind::Resume, resume_outcome(80)).unwrap();

        let mut outcome = technical_outcome(50);
        if let StageResult::Technical(ref mut t) = outcome.result {
            t.raw_points = 500;
        }
        let err = session.advance(StageKind::Technical, outcome).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(session.current_stage(), AssessmentStage::Technical);
    }

    #[test]
    fn completing_technical_sets_final_score() {
        let mut session = create_session();
        session.advance(StageKind::Resume, resume_outcome(80)).unwrap();
        session.advance(StageKind::Technical, technical_outcome(70)).unwrap();

        assert!(session.is_completed());
        assert_eq!(session.final_score(), Some(Score::new(74)));

        let events = session.take_events();
        assert!(matches!(
            events.last(),
            Some(AssessmentEvent::Completed { final_score, .. }) if final_score.value() == 74
        ));
    }

    #[test]
    fn completed_session_cannot_advance() {
        let mut session = create_session();
        session.advance(StageKind::Resume, resume_outcome(80)).unwrap();
        session.advance(StageKind::Technical, technical_outcome(70)).unwrap();

        let err = session
            .advance(StageKind::Technical, technical_outcome(100))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::AssessmentCompleted);
        assert_eq!(session.final_score(), Some(Score::new(74)));
    }

    #[test]
    fn candidate_id_is_immutable_once_set() {
        let mut session =
            AssessmentSession::new(StageSequence::with_communication(), StageWeights::with_communication())
                .unwrap();
        session.advance(StageKind::Resume, resume_outcome(80)).unwrap();

        let outcome = StageOutcome::from_result(StageResult::Communication(
            crate::domain::assessment::CommunicationResult {
                score: Score::new(60),
                fluency: Score::new(60),
                clarity: Score::new(60),
                professionalism: Score::new(60),
                metrics: Default::default(),
                feedback: vec![],
            },
        ))
        .with_candidate(cand("someone-else"));

        let transition = session.advance(StageKind::Communication, outcome).unwrap();
        assert_eq!(transition.ignored_candidate_id, Some(cand("someone-else")));
        assert_eq!(session.candidate_id(), Some(&cand("cand-1")));
    }

    #[test]
    fn snapshot_round_trips_through_yaml() {
        let mut session = create_session();
        session.advance(StageKind::Resume, resume_outcome(65)).unwrap();

        let yaml = serde_yaml::to_string(&session).unwrap();
        let restored: AssessmentSession = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(restored.id(), session.id());
        assert_eq!(restored.current_stage(), session.current_stage());
        assert_eq!(restored.stage_results(), session.stage_results());
        assert_eq!(restored.candidate_id(), session.candidate_id());
    }

    proptest! {
        #[test]
        fn stages_only_move_forward(order in proptest::collection::vec(0usize..3, 1..8)) {
            let mut session = create_session();
            let mut last_index = 0usize;

            for pick in order {
                let (kind, outcome) = match pick {
                    0 => (StageKind::Resume, resume_outcome(50)),
                    1 => (StageKind::Communication, technical_outcome(50)),
                    _ => (StageKind::Technical, technical_outcome(50)),
                };
                let _ = session.advance(kind, outcome);

                let index = match session.current_stage() {
                    AssessmentStage::Resume => 0,
                    AssessmentStage::Communication => 1,
                    AssessmentStage::Technical => 2,
                    AssessmentStage::Completed => 3,
                };
                prop_assert!(index >= last_index);
                last_index = index;
            }
        }
    }
}
