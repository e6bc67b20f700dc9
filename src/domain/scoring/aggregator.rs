//! Score aggregator - weighted final score over completed stages.
//!
//! Pure domain service: given the completed stage results and the configured
//! weights, produce the final score and a per-stage breakdown. Stages that have
//! not been completed contribute nothing.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::assessment::StageResult;
use crate::domain::foundation::{Score, StageKind};

use super::StageWeights;

/// One stage's share of the aggregate score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StageContribution {
    pub stage: StageKind,
    pub score: Score,
    pub weight: f64,
    /// `weight * score`, unrounded.
    pub weighted: f64,
}

/// Aggregate score with the contributions that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub total: Score,
    pub contributions: Vec<StageContribution>,
}

/// Stateless service computing weighted scores.
pub struct ScoreAggregator;

impl ScoreAggregator {
    /// `round(Σ weight * score)` over completed stages, clamped to [0, 100].
    pub fn aggregate(results: &BTreeMap<StageKind, StageResult>, weights: &StageWeights) -> Score {
        Self::breakdown(results, weights).total
    }

    /// Computes the aggregate along with each stage's contribution.
    pub fn breakdown(
        results: &BTreeMap<StageKind, StageResult>,
        weights: &StageWeights,
    ) -> ScoreBreakdown {
        let contributions: Vec<StageContribution> = results
            .iter()
            .map(|(stage, result)| {
                let weight = weights.weight(*stage);
                let score = result.score();
                StageContribution {
                    stage: *stage,
                    score,
                    weight,
                    weighted: weight * score.as_f64(),
                }
            })
            .collect();

        let sum: f64 = contributions.iter().map(|c| c.weighted).sum();

        ScoreBreakdown {
            total: Score::saturating_from_f64(sum),
            contributions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::assessment::{
        CommunicationResult, ResumeResult, SpeechMetrics, TechnicalBreakdown, TechnicalResult,
    };
    use proptest::prelude::*;

    fn resume(score: u8) -> StageResult {
        StageResult::Resume(ResumeResult {
            score: Score::new(score),
            ..ResumeResult::default()
        })
    }

    fn communication(score: u8) -> StageResult {
        StageResult::Communication(CommunicationResult {
            score: Score::new(score),
            fluency: Score::new(score),
            clarity: Score::new(score),
            professionalism: Score::new(score),
            metrics: SpeechMetrics::default(),
            feedback: vec![],
        })
    }

    fn technical(score: u8) -> StageResult {
        StageResult::Technical(TechnicalResult {
            score: Score::new(score),
            raw_points: 0,
            max_points: 0,
            breakdown: TechnicalBreakdown::default(),
            answered: 0,
            unattempted: vec![],
        })
    }

    #[test]
    fn empty_results_aggregate_to_zero() {
        let results = BTreeMap::new();
        assert_eq!(
            ScoreAggregator::aggregate(&results, &StageWeights::CANONICAL),
            Score::ZERO
        );
    }

    #[test]
    fn canonical_weights_combine_resume_and_technical() {
        let mut results = BTreeMap::new();
        results.insert(StageKind::Resume, resume(80));
        results.insert(StageKind::Technical, technical(70));

        // 0.4 * 80 + 0.6 * 70 = 74
        assert_eq!(
            ScoreAggregator::aggregate(&results, &StageWeights::CANONICAL).value(),
            74
        );
    }

    #[test]
    fn running_score_counts_only_completed_stages() {
        let mut results = BTreeMap::new();
        results.insert(StageKind::Resume, resume(90));

        assert_eq!(
            ScoreAggregator::aggregate(&results, &StageWeights::CANONICAL).value(),
            36
        );
    }

    #[test]
    fn aggregate_includes_communication_when_weighted() {
        let mut results = BTreeMap::new();
        results.insert(StageKind::Resume, resume(85));
        results.insert(StageKind::Communication, communication(60));
        results.insert(StageKind::Technical, technical(71));

        // 0.3 * 85 + 0.2 * 60 + 0.5 * 71 = 25.5 + 12 + 35.5 = 73
        let breakdown = ScoreAggregator::breakdown(&results, &StageWeights::with_communication());
        assert_eq!(breakdown.total.value(), 73);
        assert_eq!(breakdown.contributions.len(), 3);
        assert_eq!(breakdown.contributions[0].stage, StageKind::Resume);
    }

    fn arb_weights() -> impl Strategy<Value = StageWeights> {
        (0u32..=100, 0u32..=100).prop_map(|(a, b)| {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            StageWeights {
                resume: f64::from(lo) / 100.0,
                communication: f64::from(hi - lo) / 100.0,
                technical: f64::from(100 - hi) / 100.0,
            }
        })
    }

    proptest! {
        #[test]
        fn final_score_is_bounded_and_matches_weighted_sum(
            r in 0u8..=100,
            c in 0u8..=100,
            t in 0u8..=100,
            weights in arb_weights(),
        ) {
            let mut results = BTreeMap::new();
            results.insert(StageKind::Resume, resume(r));
            results.insert(StageKind::Communication, communication(c));
            results.insert(StageKind::Technical, technical(t));

            let score = ScoreAggregator::aggregate(&results, &weights);
            let expected = (weights.resume * f64::from(r)
                + weights.communication * f64::from(c)
                + weights.technical * f64::from(t))
                .round()
                .clamp(0.0, 100.0);

            prop_assert!(score.value() <= 100);
            prop_assert_eq!(score.as_f64(), expected);
        }
    }
}
