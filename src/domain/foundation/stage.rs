//! Assessment stage enums.
//!
//! `StageKind` names a scorable stage. `AssessmentStage` is the position of a
//! session in the workflow and adds the terminal `Completed` state.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::StateMachine;

/// A scorable phase of the assessment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Resume,
    Communication,
    Technical,
}

impl StageKind {
    /// Returns all stage kinds in workflow order.
    pub fn all() -> &'static [StageKind] {
        &[
            StageKind::Resume,
            StageKind::Communication,
            StageKind::Technical,
        ]
    }

    /// Returns the human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            StageKind::Resume => "Resume Analysis",
            StageKind::Communication => "Communication Assessment",
            StageKind::Technical => "Technical Assessment",
        }
    }

    /// Returns the 0-based position in the full workflow.
    pub fn order_index(&self) -> usize {
        match self {
            StageKind::Resume => 0,
            StageKind::Communication => 1,
            StageKind::Technical => 2,
        }
    }

    /// Returns the session stage this kind corresponds to.
    pub fn as_stage(&self) -> AssessmentStage {
        match self {
            StageKind::Resume => AssessmentStage::Resume,
            StageKind::Communication => AssessmentStage::Communication,
            StageKind::Technical => AssessmentStage::Technical,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StageKind::Resume => "resume",
            StageKind::Communication => "communication",
            StageKind::Technical => "technical",
        };
        write!(f, "{}", s)
    }
}

/// Where a session currently sits in the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStage {
    #[default]
    Resume,
    Communication,
    Technical,
    Completed,
}

impl AssessmentStage {
    /// Returns the scorable kind, or `None` once completed.
    pub fn kind(&self) -> Option<StageKind> {
        match self {
            AssessmentStage::Resume => Some(StageKind::Resume),
            AssessmentStage::Communication => Some(StageKind::Communication),
            AssessmentStage::Technical => Some(StageKind::Technical),
            AssessmentStage::Completed => None,
        }
    }

    /// Name of the view that renders this stage.
    pub fn route(&self) -> &'static str {
        match self {
            AssessmentStage::Resume => "resume",
            AssessmentStage::Communication => "communication",
            AssessmentStage::Technical => "technical",
            AssessmentStage::Completed => "results",
        }
    }

    /// Returns true once every stage has been completed.
    pub fn is_completed(&self) -> bool {
        matches!(self, AssessmentStage::Completed)
    }
}

impl StateMachine for AssessmentStage {
    fn can_transition_to(&self, target: &Self) -> bool {
        use AssessmentStage::*;
        matches!(
            (self, target),
            (Resume, Communication)
                | (Resume, Technical)
                | (Communication, Technical)
                | (Technical, Completed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use AssessmentStage::*;
        match self {
            Resume => vec![Communication, Technical],
            Communication => vec![Technical],
            Technical => vec![Completed],
            Completed => vec![],
        }
    }
}

impl fmt::Display for AssessmentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssessmentStage::Resume => "Resume",
            AssessmentStage::Communication => "Communication",
            AssessmentStage::Technical => "Technical",
            AssessmentStage::Completed => "Completed",
        };
        write!(f, "{}", s)
    }
}
