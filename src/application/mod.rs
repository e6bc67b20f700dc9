//! Application layer - Orchestration, stages and queries.
//!
//! This layer coordinates the domain with the ports. The orchestrator owns
//! the session; stages perform the gateway work for one stage each; the
//! results handlers read completed sessions.

pub mod orchestrator;
pub mod results;
pub mod stages;

pub use orchestrator::{AdvanceOutcome, AssessmentOrchestrator, AssessmentSettings};
pub use results::{CandidateReport, GetReportHandler, ReportCandidate, SessionStatus};
pub use stages::{
    CommunicationStage, Countdown, CountdownEnd, FinalizeTrigger, NavigationOutcome, ResumeForm,
    ResumeStage, SubmissionStatus, TechnicalSettings, TechnicalStage,
};
