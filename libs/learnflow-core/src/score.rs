//! Running score of a session.

use tracing::info;

use crate::error::InvariantViolation;
use crate::types::{ScoreBreakdown, StageKind, StageResult};

/// Collects one [`StageResult`] per stage and folds them into the breakdown.
///
/// Every contribution is clamped into `[0, ceiling]` of its stage, so the
/// breakdown never exceeds 100 in total.
#[derive(Debug, Clone, Default)]
pub struct ScoreAggregator {
    contributions: [Option<f64>; 5],
    finalized: bool,
}

impl ScoreAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stage's result and return the contribution it was clamped to.
    pub fn record_stage(&mut self, result: StageResult) -> Result<f64, InvariantViolation> {
        if self.finalized {
            return Err(InvariantViolation::AlreadyFinalized);
        }
        let kind = result.stage_kind;
        let slot = &mut self.contributions[kind.index()];
        if slot.is_some() {
            return Err(InvariantViolation::StageRecordedTwice(kind));
        }

        let ceiling = result.weight_ceiling.min(kind.ceiling()).max(0.0);
        let contribution = if result.attempted && result.raw_score.is_finite() {
            result.raw_score.clamp(0.0, ceiling)
        } else {
            0.0
        };
        *slot = Some(contribution);
        Ok(contribution)
    }

    pub fn is_recorded(&self, kind: StageKind) -> bool {
        self.contributions[kind.index()].is_some()
    }

    /// Sum of the stages recorded so far.
    pub fn running_total(&self) -> f64 {
        self.contributions.iter().flatten().sum()
    }

    fn contribution(&self, kind: StageKind) -> f64 {
        self.contributions[kind.index()].unwrap_or(0.0)
    }

    /// The breakdown of what has been recorded so far.
    pub fn breakdown(&self) -> ScoreBreakdown {
        ScoreBreakdown {
            translation: self.contribution(StageKind::Translation),
            spelling_pron: self.contribution(StageKind::Spelling)
                + self.contribution(StageKind::Pronunciation),
            context: self.contribution(StageKind::Context),
            matching: self.contribution(StageKind::Matching),
        }
    }

    /// Produce the session's single breakdown. A second call is rejected.
    pub fn finalize(&mut self) -> Result<ScoreBreakdown, InvariantViolation> {
        if self.finalized {
            return Err(InvariantViolation::AlreadyFinalized);
        }
        self.finalized = true;
        let breakdown = self.breakdown();
        info!(
            translation = breakdown.translation,
            spelling_pron = breakdown.spelling_pron,
            context = breakdown.context,
            matching = breakdown.matching,
            total = breakdown.total(),
            "score finalized"
        );
        Ok(breakdown)
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }
}
