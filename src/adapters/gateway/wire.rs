//! Wire format of the analysis gateway.
//!
//! Every response is wrapped in `{ status, message?, data? }`. The DTOs here
//! are deliberately lenient (missing lists default to empty, ids may be
//! numbers) and are converted into port types at the edge.

use serde::{Deserialize, Serialize};

use crate::domain::assessment::{QuestionType, QuizItem};
use crate::domain::foundation::{CandidateId, QuizId};
use crate::ports::{
    AggregateResults, CandidateSummary, CommunicationAnalysis, GatewayError, ResumeAnalysis,
    ResumeReceipt, TechnicalSummary,
};

fn default_status() -> bool {
    true
}

/// Response envelope shared by all endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default = "default_status")]
    pub status: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Fails on `status: false`, passing the gateway's message through.
    pub fn check(self) -> Result<Option<T>, GatewayError> {
        if !self.status {
            return Err(GatewayError::analysis(
                self.message.unwrap_or_else(|| "Analysis failed".to_string()),
            ));
        }
        Ok(self.data)
    }

    /// Like `check`, but a payload is required.
    pub fn into_data(self) -> Result<T, GatewayError> {
        self.check()?
            .ok_or_else(|| GatewayError::analysis("Response did not contain any data"))
    }
}

/// Identifiers arrive as either strings or numbers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum WireId {
    Text(String),
    Number(i64),
}

impl WireId {
    fn into_string(self) -> String {
        match self {
            WireId::Text(s) => s,
            WireId::Number(n) => n.to_string(),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Resume upload
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ResumeAnalysisDto {
    #[serde(default)]
    pub match_score: f64,
    #[serde(default)]
    pub matched_skills: Vec<String>,
    #[serde(default)]
    pub missing_skills: Vec<String>,
    #[serde(default)]
    pub experience_match: String,
    #[serde(default)]
    pub key_highlights: Vec<String>,
    #[serde(default)]
    pub questions: Vec<String>,
}

impl From<ResumeAnalysisDto> for ResumeAnalysis {
    fn from(dto: ResumeAnalysisDto) -> Self {
        Self {
            match_score: dto.match_score,
            matched_skills: dto.matched_skills,
            missing_skills: dto.missing_skills,
            experience_match: dto.experience_match,
            highlights: dto.key_highlights,
            questions: dto.questions,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResumeUploadDto {
    pub candidate_id: Option<WireId>,
    #[serde(default)]
    pub analysis: ResumeAnalysisDto,
}

impl TryFrom<ResumeUploadDto> for ResumeReceipt {
    type Error = GatewayError;

    fn try_from(dto: ResumeUploadDto) -> Result<Self, Self::Error> {
        let raw = dto
            .candidate_id
            .map(WireId::into_string)
            .unwrap_or_default();
        let candidate_id = CandidateId::new(raw)
            .map_err(|_| GatewayError::analysis("Resume analysis did not return a candidate id"))?;
        Ok(Self {
            candidate_id,
            analysis: dto.analysis.into(),
        })
    }
}

// ───────────────────────────────────────────────────────────────
// Quiz
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct QuizQuestionDto {
    pub quiz_id: WireId,
    #[serde(alias = "question")]
    pub question_text: String,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default, rename = "type")]
    pub question_type: Option<String>,
}

/// Converts the quiz list, resolving question types from position.
pub(crate) fn quiz_items(dtos: Vec<QuizQuestionDto>) -> Result<Vec<QuizItem>, GatewayError> {
    dtos.into_iter()
        .enumerate()
        .map(|(position, dto)| {
            let id = QuizId::new(dto.quiz_id.into_string())
                .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
            let explicit = dto
                .question_type
                .as_deref()
                .map(str::parse::<QuestionType>)
                .transpose()
                .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
            QuizItem::new(id, dto.question_text, dto.options, explicit, position)
                .map_err(|e| GatewayError::InvalidResponse(e.to_string()))
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub(crate) struct AnswerDto<'a> {
    #[serde(rename = "type")]
    pub question_type: &'a str,
    pub quiz_id: &'a str,
    pub candidate_uid: &'a str,
    pub user_answer: &'a str,
}

// ───────────────────────────────────────────────────────────────
// Communication
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub(crate) struct KeyMetricsDto {
    #[serde(default)]
    pub response_time: f64,
    #[serde(default)]
    pub filler_words: u32,
    #[serde(default)]
    pub speech_rate: f64,
    #[serde(default)]
    pub confidence_level: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommunicationDto {
    pub communication_score: f64,
    #[serde(default)]
    pub fluency: f64,
    #[serde(default)]
    pub clarity: f64,
    #[serde(default)]
    pub professionalism: f64,
    #[serde(default)]
    pub key_metrics: KeyMetricsDto,
    #[serde(default)]
    pub feedback: Vec<String>,
}

impl From<CommunicationDto> for CommunicationAnalysis {
    fn from(dto: CommunicationDto) -> Self {
        Self {
            communication_score: dto.communication_score,
            fluency: dto.fluency,
            clarity: dto.clarity,
            professionalism: dto.professionalism,
            response_time_secs: dto.key_metrics.response_time,
            filler_words: dto.key_metrics.filler_words,
            speech_rate_wpm: dto.key_metrics.speech_rate,
            confidence_level: dto.key_metrics.confidence_level,
            feedback: dto.feedback,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Aggregate results
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct TechnicalDataDto {
    pub overall_score: f64,
    #[serde(default)]
    pub experience_based: f64,
    #[serde(default)]
    pub coding_percentage: f64,
    #[serde(default)]
    pub text_percentage: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CandidateDataDto {
    #[serde(default)]
    pub candidate_name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AggregateDto {
    #[serde(default)]
    pub analyze_answer_response: Option<ResumeAnalysisDto>,
    #[serde(default)]
    pub communication_data: Option<CommunicationDto>,
    // The service spells this key "teachnical_data".
    #[serde(alias = "teachnical_data")]
    pub technical_data: Option<TechnicalDataDto>,
    #[serde(default)]
    pub candidate_data: Option<CandidateDataDto>,
}

impl TryFrom<AggregateDto> for AggregateResults {
    type Error = GatewayError;

    fn try_from(dto: AggregateDto) -> Result<Self, Self::Error> {
        let technical = dto
            .technical_data
            .ok_or_else(|| GatewayError::analysis("Technical results are not available yet"))?;
        Ok(Self {
            resume: dto.analyze_answer_response.map(Into::into),
            communication: dto.communication_data.map(Into::into),
            technical: TechnicalSummary {
                overall_score: technical.overall_score,
                experience_based: technical.experience_based,
                coding_percentage: technical.coding_percentage,
                text_percentage: technical.text_percentage,
            },
            candidate: dto.candidate_data.map(|c| CandidateSummary {
                name: c.candidate_name,
                email: c.email,
            }),
        })
    }
}
