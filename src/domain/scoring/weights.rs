//! Stage weights used by the score aggregator.

use serde::{Deserialize, Serialize};

use crate::domain::assessment::StageSequence;
use crate::domain::foundation::{StageKind, ValidationError};

/// Allowed drift from an exact sum of 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Fractional contribution of each stage to the final score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageWeights {
    pub resume: f64,
    pub communication: f64,
    pub technical: f64,
}

impl StageWeights {
    /// Canonical weights for the resume + technical workflow.
    pub const CANONICAL: StageWeights = StageWeights {
        resume: 0.4,
        communication: 0.0,
        technical: 0.6,
    };

    /// Preset for workflows that include the communication stage.
    pub fn with_communication() -> Self {
        Self {
            resume: 0.3,
            communication: 0.2,
            technical: 0.5,
        }
    }

    /// Returns the weight for a stage.
    pub fn weight(&self, kind: StageKind) -> f64 {
        match kind {
            StageKind::Resume => self.resume,
            StageKind::Communication => self.communication,
            StageKind::Technical => self.technical,
        }
    }

    pub fn sum(&self) -> f64 {
        self.resume + self.communication + self.technical
    }

    /// Checks range and sum constraints.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for kind in StageKind::all() {
            let w = self.weight(*kind);
            if !w.is_finite() || !(0.0..=1.0).contains(&w) {
                return Err(ValidationError::invalid_format(
                    format!("weights.{}", kind),
                    format!("weight must be within [0, 1], got {}", w),
                ));
            }
        }
        if (self.sum() - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ValidationError::invalid_format(
                "weights",
                format!("weights must sum to 1.0, got {}", self.sum()),
            ));
        }
        Ok(())
    }

    /// Validates the weights against the stages a workflow actually runs.
    ///
    /// A stage that is not part of the workflow can never contribute, so it
    /// must carry zero weight.
    pub fn validate_for(&self, workflow: &StageSequence) -> Result<(), ValidationError> {
        self.validate()?;
        for kind in StageKind::all() {
            if !workflow.contains(*kind) && self.weight(*kind) != 0.0 {
                return Err(ValidationError::invalid_format(
                    format!("weights.{}", kind),
                    "stage is not part of the workflow and must have zero weight",
                ));
            }
        }
        Ok(())
    }
}

impl Default for StageWeights {
    fn default() -> Self {
        Self::CANONICAL
    }
}
