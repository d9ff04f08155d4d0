//! Grading rules per exercise kind.
//!
//! Each rule turns one answer into a [`Grade`]. Stage-level helpers convert the
//! summed points of a stage into its percentage contribution.

use serde::{Deserialize, Serialize};

use crate::distance::{classify, EditClass};
use crate::error::FlowError;
use crate::transport::PronunciationResult;
use crate::types::SpellingTask;

/// Points for a correct typed (spelling or pronunciation) answer.
pub const TYPED_TASK_POINTS: f64 = 3.0;

/// Points for a one-edit spelling miss on a previously mis-learned word.
pub const PARTIAL_CREDIT_POINTS: f64 = 1.0;

/// Scale that spelling and pronunciation are each normalized to.
pub const TYPED_STAGE_SCALE: f64 = 15.0;

/// Contribution of a completed context stage.
pub const CONTEXT_STAGE_POINTS: f64 = 30.0;

/// Contribution of a completed matching stage.
pub const MATCHING_STAGE_POINTS: f64 = 10.0;

/// Points awarded for one answer and whether it counts as correct.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub points: f64,
    pub is_correct: bool,
}

impl Grade {
    pub fn zero() -> Self {
        Self {
            points: 0.0,
            is_correct: false,
        }
    }

    fn from_points(points: f64) -> Self {
        Self {
            points,
            is_correct: points > 0.0,
        }
    }
}

/// Trim and lower-case a typed answer.
pub fn normalize_answer(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Grade a resolved translation task. Every correct task is worth
/// `3 × (10 / total)`, so a stage never exceeds 30 whatever its size.
pub fn grade_translation(total_tasks: usize, correct: bool) -> Grade {
    if !correct || total_tasks == 0 {
        return Grade::zero();
    }
    Grade::from_points(3.0 * (10.0 / total_tasks as f64))
}

/// Grade a typed spelling answer.
///
/// A one-edit miss earns partial credit only when the word has exactly one
/// prior mistake.
pub fn grade_spelling(task: &SpellingTask, answer: &str) -> (EditClass, Grade) {
    let class = classify(&normalize_answer(&task.en), &normalize_answer(answer));
    let points = match class {
        EditClass::Exact => TYPED_TASK_POINTS,
        EditClass::OneEdit if task.prior_mistake_count == 1 => PARTIAL_CREDIT_POINTS,
        _ => 0.0,
    };
    (class, Grade::from_points(points))
}

/// Grade the scorer's verdict on a pronunciation clip. A rejected clip or a
/// failed round trip is worth nothing.
pub fn grade_pronunciation(result: &Result<PronunciationResult, FlowError>) -> Grade {
    match result {
        Ok(r) if r.ok && r.points.is_finite() => {
            Grade::from_points(r.points.clamp(0.0, TYPED_TASK_POINTS))
        }
        _ => Grade::zero(),
    }
}

/// Normalize the summed points of a spelling or pronunciation stage to 0–15.
pub fn normalize_typed_stage(raw_sum: f64, task_count: usize) -> f64 {
    if task_count == 0 {
        return 0.0;
    }
    raw_sum / (task_count as f64 * TYPED_TASK_POINTS) * TYPED_STAGE_SCALE
}

/// Context is all-or-nothing: any completed task earns the full stage.
pub fn context_stage_points(completed_tasks: usize) -> f64 {
    if completed_tasks > 0 {
        CONTEXT_STAGE_POINTS
    } else {
        0.0
    }
}

/// Matching has no failure state; it pays out once every pair is matched.
pub fn matching_stage_points(all_matched: bool) -> f64 {
    if all_matched {
        MATCHING_STAGE_POINTS
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spelling(en: &str, prior_mistake_count: u32) -> SpellingTask {
        SpellingTask {
            id: "s".into(),
            en: en.into(),
            ru: "ru".into(),
            prior_mistake_count,
        }
    }

    #[test]
    fn translation_stage_caps_at_thirty() {
        for n in [1usize, 3, 7, 10, 13] {
            let sum: f64 = (0..n).map(|_| grade_translation(n, true).points).sum();
            assert!((sum - 30.0).abs() < 1e-9, "n = {n}: {sum}");
        }
        assert_eq!(grade_translation(4, false), Grade::zero());
    }

    #[test]
    fn spelling_exact_match_ignores_case_and_padding() {
        let (class, grade) = grade_spelling(&spelling("Cat", 0), "  cAT ");
        assert_eq!(class, EditClass::Exact);
        assert_eq!(grade.points, 3.0);
        assert!(grade.is_correct);
    }

    #[test]
    fn partial_credit_needs_exactly_one_prior_mistake() {
        assert_eq!(grade_spelling(&spelling("cat", 1), "cot").1.points, 1.0);
        assert_eq!(grade_spelling(&spelling("cat", 0), "cot").1.points, 0.0);
        assert_eq!(grade_spelling(&spelling("cat", 2), "cot").1.points, 0.0);
        assert_eq!(grade_spelling(&spelling("cat", 1), "dog").1.points, 0.0);
    }

    #[test]
    fn spelling_stage_normalization() {
        let raw = grade_spelling(&spelling("cat", 0), "cat").1.points
            + grade_spelling(&spelling("dog", 1), "dg").1.points;
        assert_eq!(raw, 4.0);
        assert!((normalize_typed_stage(raw, 2) - 10.0).abs() < 1e-9);
        assert_eq!(normalize_typed_stage(0.0, 0), 0.0);
    }

    #[test]
    fn pronunciation_failures_are_worth_zero() {
        let accepted = Ok(PronunciationResult {
            ok: true,
            points: 3.0,
            dtw: Some(97.5),
        });
        assert_eq!(grade_pronunciation(&accepted).points, 3.0);

        let rejected = Ok(PronunciationResult {
            ok: false,
            points: 3.0,
            dtw: None,
        });
        assert_eq!(grade_pronunciation(&rejected), Grade::zero());

        let failed = Err(FlowError::Transport("reset".into()));
        assert_eq!(grade_pronunciation(&failed), Grade::zero());
    }

    #[test]
    fn pronunciation_points_are_clamped() {
        let inflated = Ok(PronunciationResult {
            ok: true,
            points: 40.0,
            dtw: None,
        });
        assert_eq!(grade_pronunciation(&inflated).points, TYPED_TASK_POINTS);
    }

    #[test]
    fn fixed_stage_points() {
        assert_eq!(context_stage_points(2), 30.0);
        assert_eq!(context_stage_points(0), 0.0);
        assert_eq!(matching_stage_points(true), 10.0);
        assert_eq!(matching_stage_points(false), 0.0);
    }
}
