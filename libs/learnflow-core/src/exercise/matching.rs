//! Pair matching between two independently shuffled columns.

use serde::{Deserialize, Serialize};

use super::SessionRng;
use crate::error::ActionError;
use crate::types::MatchingTask;

/// Column of the matching board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Source-language terms.
    Left,
    /// Target-language terms.
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchOption {
    pub pair_id: usize,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MatchStep {
    /// Only one side is selected so far.
    Selected,
    Matched { remaining: usize },
    /// Both selections were cleared; nothing was removed.
    Mismatched,
}

#[derive(Debug, Clone)]
pub struct MatchingBoard {
    left: Vec<MatchOption>,
    right: Vec<MatchOption>,
    selected_left: Option<usize>,
    selected_right: Option<usize>,
    remaining: usize,
}

impl MatchingBoard {
    pub fn new(task: &MatchingTask, rng: &mut SessionRng) -> Self {
        let mut left: Vec<MatchOption> = task
            .pairs
            .iter()
            .enumerate()
            .map(|(pair_id, p)| MatchOption {
                pair_id,
                text: p.en.clone(),
            })
            .collect();
        let mut right: Vec<MatchOption> = task
            .pairs
            .iter()
            .enumerate()
            .map(|(pair_id, p)| MatchOption {
                pair_id,
                text: p.ru.clone(),
            })
            .collect();
        rng.shuffle(&mut left);
        rng.shuffle(&mut right);

        Self {
            left,
            right,
            selected_left: None,
            selected_right: None,
            remaining: task.pairs.len(),
        }
    }

    /// Select `pair_id` on one side. Once both sides hold a selection they are
    /// compared and both selections clear.
    pub fn select(&mut self, side: Side, pair_id: usize) -> Result<MatchStep, ActionError> {
        let column = match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        };
        if !column.iter().any(|o| o.pair_id == pair_id) {
            return Err(ActionError::UnknownPair(pair_id));
        }

        match side {
            Side::Left => self.selected_left = Some(pair_id),
            Side::Right => self.selected_right = Some(pair_id),
        }

        let (Some(left), Some(right)) = (self.selected_left, self.selected_right) else {
            return Ok(MatchStep::Selected);
        };
        self.selected_left = None;
        self.selected_right = None;

        if left != right {
            return Ok(MatchStep::Mismatched);
        }
        self.left.retain(|o| o.pair_id != left);
        self.right.retain(|o| o.pair_id != right);
        self.remaining -= 1;
        Ok(MatchStep::Matched {
            remaining: self.remaining,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn left(&self) -> &[MatchOption] {
        &self.left
    }

    pub fn right(&self) -> &[MatchOption] {
        &self.right
    }

    pub fn selected(&self, side: Side) -> Option<usize> {
        match side {
            Side::Left => self.selected_left,
            Side::Right => self.selected_right,
        }
    }
}
