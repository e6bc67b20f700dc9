//! Scoring - stage weights and the weighted score aggregator.

mod aggregator;
mod weights;

pub use aggregator::{ScoreAggregator, ScoreBreakdown, StageContribution};
pub use weights::{StageWeights, WEIGHT_SUM_TOLERANCE};
