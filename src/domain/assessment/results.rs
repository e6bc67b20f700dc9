//! Stage results - normalized outcome of each completed stage.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use crate::domain::foundation::{QuizId, Score, StageKind, ValidationError};

/// Outcome of the resume / job description match.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResumeResult {
    pub score: Score,
    #[serde(default)]
    pub matched_skills: BTreeSet<String>,
    #[serde(default)]
    pub missing_skills: BTreeSet<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
    /// Follow-up questions produced by the analysis, in order.
    #[serde(default)]
    pub generated_questions: Vec<String>,
    #[serde(default)]
    pub experience_match: String,
}

/// Speech metrics reported for spoken answers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpeechMetrics {
    pub response_time_secs: f64,
    pub filler_word_count: u32,
    pub speech_rate_wpm: f64,
    pub confidence_label: String,
}

/// Outcome of the spoken-communication stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunicationResult {
    pub score: Score,
    pub fluency: Score,
    pub clarity: Score,
    pub professionalism: Score,
    pub metrics: SpeechMetrics,
    #[serde(default)]
    pub feedback: Vec<String>,
}

/// Sub-scores of the technical stage.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TechnicalBreakdown {
    pub experience: Score,
    pub requirements: Score,
    pub scenarios: Score,
}

/// Outcome of the technical screening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalResult {
    pub score: Score,
    pub raw_points: u32,
    pub max_points: u32,
    pub breakdown: TechnicalBreakdown,
    /// Number of questions with a submitted answer.
    pub answered: u32,
    #[serde(default)]
    pub unattempted: Vec<QuizId>,
}

/// Normalized result of a completed stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageResult {
    Resume(ResumeResult),
    Communication(CommunicationResult),
    Technical(TechnicalResult),
}

impl StageResult {
    /// Which stage produced this result.
    pub fn kind(&self) -> StageKind {
        match self {
            StageResult::Resume(_) => StageKind::Resume,
            StageResult::Communication(_) => StageKind::Communication,
            StageResult::Technical(_) => StageKind::Technical,
        }
    }

    /// Headline score of the stage.
    pub fn score(&self) -> Score {
        match self {
            StageResult::Resume(r) => r.score,
            StageResult::Communication(r) => r.score,
            StageResult::Technical(r) => r.score,
        }
    }

    /// Schema check applied before a result is stored on the session.
    ///
    /// Scores are bounded by construction; this covers the remaining
    /// structural rules of each variant.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            StageResult::Resume(r) => {
                if let Some(skill) = r.matched_skills.intersection(&r.missing_skills).next() {
                    return Err(ValidationError::invalid_format(
                        "missing_skills",
                        format!("skill '{}' is both matched and missing", skill),
                    ));
                }
                if r.generated_questions.iter().any(|q| q.trim().is_empty()) {
                    return Err(ValidationError::empty_field("generated_questions"));
                }
                Ok(())
            }
            StageResult::Communication(r) => {
                let m = &r.metrics;
                if !m.response_time_secs.is_finite() || m.response_time_secs < 0.0 {
                    return Err(ValidationError::invalid_format(
                        "metrics.response_time_secs",
                        "must be a non-negative number",
                    ));
                }
                if !m.speech_rate_wpm.is_finite() || m.speech_rate_wpm < 0.0 {
                    return Err(ValidationError::invalid_format(
                        "metrics.speech_rate_wpm",
                        "must be a non-negative number",
                    ));
                }
                Ok(())
            }
            StageResult::Technical(r) => {
                if r.raw_points > r.max_points {
                    return Err(ValidationError::invalid_format(
                        "raw_points",
                        format!("{} exceeds maximum of {}", r.raw_points, r.max_points),
                    ));
                }
                let mut seen = HashSet::new();
                if let Some(dup) = r.unattempted.iter().find(|id| !seen.insert(*id)) {
                    return Err(ValidationError::invalid_format(
                        "unattempted",
                        format!("question {} listed twice", dup),
                    ));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn technical() -> TechnicalResult {
        TechnicalResult {
            score: Score::new(70),
            raw_points: 70,
            max_points: 100,
            breakdown: TechnicalBreakdown::default(),
            answered: 7,
            unattempted: vec![QuizId::new("q8").unwrap()],
        }
    }

    #[test]
    fn kind_and_score_follow_variant() {
        let result = StageResult::Technical(technical());
        assert_eq!(result.kind(), StageKind::Technical);
        assert_eq!(result.score().value(), 70);
    }

    #[test]
    fn valid_technical_result_passes() {
        assert!(StageResult::Technical(technical()).validate().is_ok());
    }

    #[test]
    fn raw_points_cannot_exceed_maximum() {
        let mut t = technical();
        t.raw_points = 120;
        assert!(StageResult::Technical(t).validate().is_err());
    }

    #[test]
    fn duplicate_unattempted_rejected() {
        let mut t = technical();
        t.unattempted.push(QuizId::new("q8").unwrap());
        let err = StageResult::Technical(t).validate().unwrap_err();
        assert_eq!(err.field(), "unattempted");
    }

    #[test]
    fn skill_cannot_be_matched_and_missing() {
        let mut r = ResumeResult {
            score: Score::new(60),
            ..Default::default()
        };
        r.matched_skills.insert("rust".into());
        r.missing_skills.insert("rust".into());
        assert!(StageResult::Resume(r).validate().is_err());
    }

    #[test]
    fn negative_speech_rate_rejected() {
        let result = StageResult::Communication(CommunicationResult {
            score: Score::new(50),
            fluency: Score::new(50),
            clarity: Score::new(50),
            professionalism: Score::new(50),
            metrics: SpeechMetrics {
                speech_rate_wpm: -4.0,
                ..Default::default()
            },
            feedback: vec![],
        });
        assert!(result.validate().is_err());
    }

    #[test]
    fn serializes_with_stage_tag() {
        let json = serde_json::to_value(StageResult::Technical(technical())).unwrap();
        assert_eq!(json["stage"], "technical");
        assert_eq!(json["raw_points"], 70);
    }

    #[test]
    fn deserialization_rejects_out_of_range_score() {
        let yaml = "stage: resume\nscore: 140\n";
        assert!(serde_yaml::from_str::<StageResult>(yaml).is_err());
    }
}
