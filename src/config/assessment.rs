//! Assessment workflow configuration

use serde::Deserialize;
use std::time::Duration;

use crate::application::{AssessmentSettings, TechnicalSettings};
use crate::domain::assessment::{StageSequence, DEFAULT_MAX_DOCUMENT_BYTES};
use crate::domain::scoring::StageWeights;

use super::error::ValidationError;

/// Assessment workflow configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AssessmentConfig {
    /// Run the spoken-communication stage between resume and technical
    #[serde(default)]
    pub communication_enabled: bool,

    /// Stage weights for the final score
    #[serde(default)]
    pub weights: WeightsConfig,

    /// Technical stage time limit in seconds
    #[serde(default = "default_time_limit")]
    pub time_limit_secs: u64,

    /// Largest accepted resume upload in bytes
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: usize,

    /// Points awarded per technical question
    #[serde(default = "default_points_per_question")]
    pub points_per_question: u32,
}

/// Stage weights as configured
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_resume_weight")]
    pub resume: f64,
    #[serde(default)]
    pub communication: f64,
    #[serde(default = "default_technical_weight")]
    pub technical: f64,
}

impl WeightsConfig {
    pub fn to_weights(self) -> StageWeights {
        StageWeights {
            resume: self.resume,
            communication: self.communication,
            technical: self.technical,
        }
    }
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            resume: default_resume_weight(),
            communication: 0.0,
            technical: default_technical_weight(),
        }
    }
}

impl AssessmentConfig {
    /// Stage sequence implied by the feature flags
    pub fn workflow(&self) -> StageSequence {
        StageSequence::from_flags(self.communication_enabled)
    }

    /// Settings for new sessions
    pub fn settings(&self) -> AssessmentSettings {
        AssessmentSettings {
            workflow: self.workflow(),
            weights: self.weights.to_weights(),
        }
    }

    /// Settings for the technical stage
    pub fn technical(&self) -> TechnicalSettings {
        TechnicalSettings {
            points_per_question: self.points_per_question,
            time_limit: Duration::from_secs(self.time_limit_secs),
        }
    }

    /// Validate assessment configuration
    ///
    /// Weights must sum to one, stages outside the workflow must weigh
    /// zero, and an enabled communication stage must weigh something.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let weights = self.weights.to_weights();
        weights
            .validate_for(&self.workflow())
            .map_err(|e| ValidationError::InvalidWeights(e.to_string()))?;
        if self.communication_enabled && weights.communication == 0.0 {
            return Err(ValidationError::CommunicationWeightMissing);
        }
        if self.time_limit_secs == 0 {
            return Err(ValidationError::InvalidTimeLimit);
        }
        if self.points_per_question == 0 {
            return Err(ValidationError::InvalidPointsPerQuestion);
        }
        if self.max_document_bytes == 0 {
            return Err(ValidationError::InvalidDocumentLimit);
        }
        Ok(())
    }
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            communication_enabled: false,
            weights: WeightsConfig::default(),
            time_limit_secs: default_time_limit(),
            max_document_bytes: default_max_document_bytes(),
            points_per_question: default_points_per_question(),
        }
    }
}

fn default_time_limit() -> u64 {
    1800
}

fn default_max_document_bytes() -> usize {
    DEFAULT_MAX_DOCUMENT_BYTES
}

fn default_points_per_question() -> u32 {
    10
}

fn default_resume_weight() -> f64 {
    0.4
}

fn default_technical_weight() -> f64 {
    0.6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_canonical() {
        let config = AssessmentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.weights.to_weights(), StageWeights::CANONICAL);
        assert_eq!(config.technical().time_limit, Duration::from_secs(1800));
        assert_eq!(config.workflow(), StageSequence::standard());
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let config = AssessmentConfig {
            weights: WeightsConfig {
                resume: 0.5,
                communication: 0.0,
                technical: 0.6,
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidWeights(_))
        ));
    }

    #[test]
    fn test_communication_needs_weight_when_enabled() {
        let config = AssessmentConfig {
            communication_enabled: true,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::CommunicationWeightMissing)
        ));

        let config = AssessmentConfig {
            communication_enabled: true,
            weights: WeightsConfig {
                resume: 0.3,
                communication: 0.2,
                technical: 0.5,
            },
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert!(config.workflow().contains(crate::domain::foundation::StageKind::Communication));
    }

    #[test]
    fn test_disabled_communication_must_weigh_zero() {
        let config = AssessmentConfig {
            weights: WeightsConfig {
                resume: 0.3,
                communication: 0.2,
                technical: 0.5,
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_time_limit_rejected() {
        let config = AssessmentConfig {
            time_limit_secs: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidTimeLimit)
        ));
    }
}
