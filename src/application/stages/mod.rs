//! Stage adapters - one per assessment stage.
//!
//! Each stage implements `StageAdapter` and is driven by the orchestrator.
//! Stage-local interaction (recording, answering, navigation) is exposed as
//! inherent methods on each stage.

mod communication;
mod countdown;
mod resume;
mod technical;

pub use communication::{aggregate_analyses, CommunicationStage};
pub use countdown::{Countdown, CountdownEnd, DEFAULT_TIME_LIMIT};
pub use resume::{ResumeForm, ResumeStage};
pub use technical::{
    FinalizeTrigger, NavigationOutcome, SubmissionStatus, TechnicalSettings, TechnicalStage,
    DEFAULT_POINTS_PER_QUESTION,
};
