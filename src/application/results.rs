//! Results queries - what the results view and the CLI display.

use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::domain::assessment::{AssessmentSession, StageResult};
use crate::domain::foundation::{AssessmentStage, CandidateId, Score, SessionId, StageKind};
use crate::domain::scoring::{ScoreAggregator, StageContribution};
use crate::ports::{AnalysisGateway, CandidateSummary, StageError};

use super::orchestrator::AssessmentOrchestrator;

/// Compact status of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub session_id: SessionId,
    pub stage: AssessmentStage,
    pub route: &'static str,
    pub candidate_id: Option<CandidateId>,
    pub completed_stages: Vec<StageKind>,
    pub running_score: Score,
    pub final_score: Option<Score>,
}

impl SessionStatus {
    pub fn from_session(session: &AssessmentSession) -> Self {
        Self {
            session_id: session.id(),
            stage: session.current_stage(),
            route: session.current_stage().route(),
            candidate_id: session.candidate_id().cloned(),
            completed_stages: session.stage_results().keys().copied().collect(),
            running_score: session.running_score(),
            final_score: session.final_score(),
        }
    }
}

/// Candidate identity shown on the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportCandidate {
    pub name: String,
    pub email: String,
}

impl From<CandidateSummary> for ReportCandidate {
    fn from(summary: CandidateSummary) -> Self {
        Self {
            name: summary.name,
            email: summary.email,
        }
    }
}

/// Full results report for a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateReport {
    #[serde(flatten)]
    pub status: SessionStatus,
    pub candidate: Option<ReportCandidate>,
    pub contributions: Vec<StageContribution>,
    pub results: Vec<StageResult>,
}

impl CandidateReport {
    /// Builds the report from the session alone.
    pub fn from_session(session: &AssessmentSession) -> Self {
        let breakdown = ScoreAggregator::breakdown(session.stage_results(), session.weights());
        Self {
            status: SessionStatus::from_session(session),
            candidate: None,
            contributions: breakdown.contributions,
            results: session.stage_results().values().cloned().collect(),
        }
    }

    pub fn with_candidate(mut self, candidate: ReportCandidate) -> Self {
        self.candidate = Some(candidate);
        self
    }
}

/// Query handler producing the results report.
pub struct GetReportHandler {
    gateway: Arc<dyn AnalysisGateway>,
}

impl GetReportHandler {
    pub fn new(gateway: Arc<dyn AnalysisGateway>) -> Self {
        Self { gateway }
    }

    /// Builds the report, enriching it with the candidate's name and email
    /// from the gateway when available.
    ///
    /// A failed lookup leaves the candidate section empty. A missing
    /// credential is still an error.
    pub async fn handle(
        &self,
        orchestrator: &AssessmentOrchestrator,
    ) -> Result<CandidateReport, StageError> {
        let session = orchestrator.snapshot().await;
        let report = CandidateReport::from_session(&session);

        let Some(candidate_id) = session.candidate_id() else {
            return Ok(report);
        };
        let ctx = orchestrator.stage_context(StageKind::Technical).await?;

        match self
            .gateway
            .fetch_aggregate_results(&ctx.credential, candidate_id)
            .await
        {
            Ok(results) => Ok(match results.candidate {
                Some(candidate) => report.with_candidate(candidate.into()),
                None => report,
            }),
            Err(e) => {
                warn!(candidate_id = %candidate_id, error = %e, "Candidate details unavailable");
                Ok(report)
            }
        }
    }
}
