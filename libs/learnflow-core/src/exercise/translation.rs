//! Attempt tracking for one multiple-choice translation task.

use serde::{Deserialize, Serialize};

use crate::error::ActionError;
use crate::types::TranslationTask;

/// What a pick did to the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum TranslationStep {
    /// Correct option; the task resolves correct.
    Correct,
    /// Wrong option with attempts left; the option is ruled out.
    Wrong { attempts_left: u32 },
    /// Wrong option on the last attempt; the answer is revealed and the task
    /// resolves with nothing.
    Revealed { correct_index: usize },
}

impl TranslationStep {
    /// Whether the task reached a terminal outcome.
    pub fn resolves(self) -> bool {
        !matches!(self, Self::Wrong { .. })
    }
}

#[derive(Debug, Clone)]
pub struct TranslationAttempt {
    correct_index: usize,
    variant_count: usize,
    attempts_allowed: u32,
    attempts_left: u32,
    ruled_out: Vec<usize>,
}

impl TranslationAttempt {
    pub fn new(task: &TranslationTask) -> Self {
        Self {
            correct_index: task.correct_index,
            variant_count: task.variants.len(),
            attempts_allowed: task.attempts_allowed.max(1),
            attempts_left: task.attempts_allowed.max(1),
            ruled_out: Vec::new(),
        }
    }

    pub fn choose(&mut self, index: usize) -> Result<TranslationStep, ActionError> {
        if index >= self.variant_count {
            return Err(ActionError::OptionOutOfRange {
                index,
                len: self.variant_count,
            });
        }
        if self.ruled_out.contains(&index) {
            return Err(ActionError::OptionRuledOut(index));
        }

        if index == self.correct_index {
            return Ok(TranslationStep::Correct);
        }

        self.attempts_left = self.attempts_left.saturating_sub(1);
        if self.attempts_left == 0 {
            Ok(TranslationStep::Revealed {
                correct_index: self.correct_index,
            })
        } else {
            self.ruled_out.push(index);
            Ok(TranslationStep::Wrong {
                attempts_left: self.attempts_left,
            })
        }
    }

    /// Skipping opens up after a wrong pick, while attempts remain.
    pub fn can_skip(&self) -> bool {
        self.attempts_left > 0 && self.attempts_left < self.attempts_allowed
    }

    pub fn attempts_left(&self) -> u32 {
        self.attempts_left
    }

    pub fn ruled_out(&self) -> &[usize] {
        &self.ruled_out
    }
}
