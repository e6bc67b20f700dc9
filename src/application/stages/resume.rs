//! ResumeStage - uploads the resume and job description for matching.
//!
//! All candidate input is checked locally first; nothing reaches the
//! gateway unless every field is valid. A successful upload yields the
//! candidate id that every later stage depends on.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::assessment::{
    CandidateInfo, JobDescription, ResumeDocument, ResumeResult, StageResult, SubmissionMetadata,
    DEFAULT_MAX_DOCUMENT_BYTES,
};
use crate::domain::foundation::{Score, StageKind, ValidationError};
use crate::ports::{
    AnalysisGateway, ResumeAnalysis, ResumeSubmission, StageAdapter, StageContext, StageError,
    StageOutcome,
};

/// Raw input collected from the resume form.
#[derive(Debug, Clone, Default)]
pub struct ResumeForm {
    pub candidate_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub hr_name: String,
    pub job_position: String,
    pub job_description: String,
    pub file_name: String,
    pub mime_type: String,
    pub document: Vec<u8>,
}

/// Stage adapter for the resume / job description match.
pub struct ResumeStage {
    gateway: Arc<dyn AnalysisGateway>,
    form: ResumeForm,
    max_document_bytes: usize,
}

impl ResumeStage {
    pub fn new(gateway: Arc<dyn AnalysisGateway>, form: ResumeForm) -> Self {
        Self {
            gateway,
            form,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }

    /// Overrides the document size ceiling.
    pub fn with_max_document_bytes(mut self, max_bytes: usize) -> Self {
        self.max_document_bytes = max_bytes;
        self
    }

    /// Builds the validated submission from the raw form.
    pub fn submission(&self) -> Result<ResumeSubmission, ValidationError> {
        let form = &self.form;
        Ok(ResumeSubmission {
            candidate: CandidateInfo::new(
                form.candidate_name.as_str(),
                form.email.as_str(),
                form.phone.as_deref(),
            )?,
            metadata: SubmissionMetadata::new(form.hr_name.as_str(), form.job_position.as_str())?,
            job_description: JobDescription::new(form.job_description.as_str())?,
            document: ResumeDocument::new(
                form.file_name.as_str(),
                form.mime_type.as_str(),
                form.document.clone(),
                self.max_document_bytes,
            )?,
        })
    }
}

/// Normalizes the gateway's analysis into a stage result.
///
/// An out-of-range score or an inconsistent skill list is reported as an
/// analysis failure, since it came from the gateway rather than the user.
fn to_result(analysis: ResumeAnalysis) -> Result<ResumeResult, StageError> {
    let score = Score::from_f64("match_score", analysis.match_score)
        .map_err(|e| StageError::AnalysisFailure(e.to_string()))?;

    let result = ResumeResult {
        score,
        matched_skills: analysis.matched_skills.into_iter().collect(),
        missing_skills: analysis.missing_skills.into_iter().collect(),
        highlights: analysis.highlights,
        generated_questions: analysis
            .questions
            .into_iter()
            .filter(|q| !q.trim().is_empty())
            .collect(),
        experience_match: analysis.experience_match,
    };

    StageResult::Resume(result.clone())
        .validate()
        .map_err(|e| StageError::AnalysisFailure(e.to_string()))?;

    Ok(result)
}

#[async_trait]
impl StageAdapter for ResumeStage {
    fn kind(&self) -> StageKind {
        StageKind::Resume
    }

    async fn validate(&self, _ctx: &StageContext) -> Result<(), StageError> {
        self.submission()?;
        Ok(())
    }

    async fn submit(&self, ctx: &StageContext) -> Result<StageOutcome, StageError> {
        let submission = self.submission()?;
        debug!(
            file_name = submission.document.file_name(),
            bytes = submission.document.len(),
            "Uploading resume"
        );

        let receipt = self
            .gateway
            .submit_resume(&ctx.credential, &submission)
            .await?;
        let result = to_result(receipt.analysis)?;

        info!(
            candidate_id = %receipt.candidate_id,
            score = result.score.value(),
            questions = result.generated_questions.len(),
            "Resume analyzed"
        );

        let questions = result.generated_questions.clone();
        Ok(StageOutcome::from_result(StageResult::Resume(result))
            .with_candidate(receipt.candidate_id)
            .with_follow_up_questions(questions))
    }

    async fn cancel(&self) {
        // Upload is a single request; nothing to release
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::gateway::{MockAnalysisGateway, MockOperation};
    use crate::ports::{BearerToken, GatewayError};

    fn valid_form() -> ResumeForm {
        ResumeForm {
            candidate_name: "Jane Doe".into(),
            email: "jane@x.com".into(),
            phone: Some("(555) 010-2030".into()),
            hr_name: "Sam".into(),
            job_position: "Backend Engineer".into(),
            job_description: "Rust services".into(),
            file_name: "cv.pdf".into(),
            mime_type: "application/pdf".into(),
            document: b"%PDF-1.7".to_vec(),
        }
    }

    fn ctx() -> StageContext {
        StageContext::new(BearerToken::new("token").unwrap(), None)
    }

    #[tokio::test]
    async fn submit_returns_candidate_and_questions() {
        let gateway = Arc::new(MockAnalysisGateway::new());
        let stage = ResumeStage::new(gateway.clone(), valid_form());

        let outcome = stage.submit(&ctx()).await.unwrap();

        assert_eq!(outcome.candidate_id.unwrap().as_str(), "cand-001");
        assert_eq!(outcome.follow_up_questions.len(), 2);
        assert_eq!(outcome.result.score(), Score::new(80));
        assert_eq!(gateway.calls_to(MockOperation::SubmitResume), 1);
    }

    #[tokio::test]
    async fn executable_attachment_never_reaches_gateway() {
        let gateway = Arc::new(MockAnalysisGateway::new());
        let form = ResumeForm {
            file_name: "cv.exe".into(),
            mime_type: "application/x-msdownload".into(),
            ..valid_form()
        };
        let stage = ResumeStage::new(gateway.clone(), form);

        let err = stage.validate(&ctx()).await.unwrap_err();

        assert!(matches!(err, StageError::Validation(_)));
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn oversized_document_rejected() {
        let gateway = Arc::new(MockAnalysisGateway::new());
        let stage = ResumeStage::new(gateway, valid_form()).with_max_document_bytes(4);

        assert!(matches!(
            stage.validate(&ctx()).await,
            Err(StageError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn out_of_range_score_is_analysis_failure() {
        let mut receipt = MockAnalysisGateway::default_receipt().unwrap();
        receipt.analysis.match_score = 140.0;
        let gateway = Arc::new(MockAnalysisGateway::new().with_resume_receipt(receipt));
        let stage = ResumeStage::new(gateway, valid_form());

        assert!(matches!(
            stage.submit(&ctx()).await,
            Err(StageError::AnalysisFailure(_))
        ));
    }

    #[tokio::test]
    async fn gateway_failure_message_is_surfaced() {
        let gateway = Arc::new(
            MockAnalysisGateway::new().with_resume_error(GatewayError::analysis("Resume unreadable")),
        );
        let stage = ResumeStage::new(gateway, valid_form());

        let err = stage.submit(&ctx()).await.unwrap_err();
        assert_eq!(err.user_message(), "Resume unreadable");
    }

    #[test]
    fn conflicting_skills_are_analysis_failure() {
        let analysis = ResumeAnalysis {
            match_score: 50.0,
            matched_skills: vec!["rust".into()],
            missing_skills: vec!["rust".into()],
            ..Default::default()
        };
        assert!(matches!(to_result(analysis), Err(StageError::AnalysisFailure(_))));
    }
}
