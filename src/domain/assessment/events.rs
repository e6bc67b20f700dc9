//! Assessment domain events.

use crate::domain::foundation::{CandidateId, Score, SessionId, StageKind, Timestamp};
use serde::{Deserialize, Serialize};

/// Events recorded while a session progresses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AssessmentEvent {
    /// A new session was created.
    Started {
        session_id: SessionId,
        started_at: Timestamp,
    },

    /// The gateway assigned a candidate id.
    CandidateAssigned {
        session_id: SessionId,
        candidate_id: CandidateId,
    },

    /// A stage result was accepted.
    StageCompleted {
        session_id: SessionId,
        stage: StageKind,
        score: Score,
    },

    /// Every stage is done and the final score is known.
    Completed {
        session_id: SessionId,
        final_score: Score,
    },
}
