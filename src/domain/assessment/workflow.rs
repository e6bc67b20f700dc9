//! StageSequence - the ordered stages a session runs through.
//!
//! Resume and Technical are always present. Communication is included only
//! when the workflow enables it. The sequence is fixed when a session is
//! created and persisted with it, so a configuration change never reorders
//! a session that is already underway.

use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::foundation::{AssessmentStage, StageKind};

/// Ordered list of active stages for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StageSequence(Vec<StageKind>);

impl StageSequence {
    /// Resume followed by Technical.
    pub fn standard() -> Self {
        Self(vec![StageKind::Resume, StageKind::Technical])
    }

    /// Resume, Communication, then Technical.
    pub fn with_communication() -> Self {
        Self(StageKind::all().to_vec())
    }

    /// Builds the sequence from the communication toggle.
    pub fn from_flags(communication_enabled: bool) -> Self {
        if communication_enabled {
            Self::with_communication()
        } else {
            Self::standard()
        }
    }

    /// Returns the stages in order.
    pub fn stages(&self) -> &[StageKind] {
        &self.0
    }

    pub fn contains(&self, kind: StageKind) -> bool {
        self.0.contains(&kind)
    }

    /// The stage a fresh session starts in.
    pub fn first(&self) -> AssessmentStage {
        self.0
            .first()
            .map(StageKind::as_stage)
            .unwrap_or(AssessmentStage::Completed)
    }

    /// Where the session goes after `kind` completes.
    ///
    /// The last stage leads to `Completed`.
    pub fn next_after(&self, kind: StageKind) -> AssessmentStage {
        self.0
            .iter()
            .position(|k| *k == kind)
            .and_then(|idx| self.0.get(idx + 1))
            .map(StageKind::as_stage)
            .unwrap_or(AssessmentStage::Completed)
    }

    /// True when `kind` is a stage that requires an assigned candidate.
    pub fn requires_candidate(&self, kind: StageKind) -> bool {
        self.0.first().is_some_and(|first| *first != kind)
    }
}

impl Default for StageSequence {
    fn default() -> Self {
        Self::standard()
    }
}

impl<'de> Deserialize<'de> for StageSequence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut stages = Vec::<StageKind>::deserialize(deserializer)?;
        stages.sort();
        stages.dedup();
        if !stages.contains(&StageKind::Resume) || !stages.contains(&StageKind::Technical) {
            return Err(serde::de::Error::custom(
                "workflow must contain the resume and technical stages",
            ));
        }
        Ok(Self(stages))
    }
}
