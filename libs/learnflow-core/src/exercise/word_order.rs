//! Word-order assembly for context tasks.
//!
//! The learner rebuilds a sentence by picking tokens from a shuffled pool. Only
//! the next expected token is accepted; wrong picks raise a transient flag and
//! cost nothing.

use serde::{Deserialize, Serialize};

use super::SessionRng;
use crate::error::ActionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PickOutcome {
    Placed { remaining: usize },
    Completed,
    Misplaced { index: usize },
}

#[derive(Debug, Clone)]
pub struct WordOrderBoard {
    expected: Vec<String>,
    pool: Vec<String>,
    picked: Vec<String>,
    wrong_flag: Option<usize>,
}

impl WordOrderBoard {
    pub fn new(tokens: Vec<String>, rng: &mut SessionRng) -> Self {
        let mut pool = tokens.clone();
        rng.shuffle(&mut pool);
        Self {
            expected: tokens,
            pool,
            picked: Vec::new(),
            wrong_flag: None,
        }
    }

    /// Pick the token at `index` of the current pool.
    pub fn pick(&mut self, index: usize) -> Result<PickOutcome, ActionError> {
        if index >= self.pool.len() {
            return Err(ActionError::TokenOutOfRange {
                index,
                len: self.pool.len(),
            });
        }
        self.wrong_flag = None;

        let next = &self.expected[self.picked.len()];
        if self.pool[index] != *next {
            self.wrong_flag = Some(index);
            return Ok(PickOutcome::Misplaced { index });
        }

        let token = self.pool.remove(index);
        self.picked.push(token);
        if self.is_complete() {
            Ok(PickOutcome::Completed)
        } else {
            Ok(PickOutcome::Placed {
                remaining: self.pool.len(),
            })
        }
    }

    pub fn clear_wrong_flag(&mut self) {
        self.wrong_flag = None;
    }

    pub fn is_complete(&self) -> bool {
        self.picked.len() == self.expected.len()
    }

    pub fn pool(&self) -> &[String] {
        &self.pool
    }

    pub fn picked(&self) -> &[String] {
        &self.picked
    }

    pub fn wrong_flag(&self) -> Option<usize> {
        self.wrong_flag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    fn solve(board: &mut WordOrderBoard, sentence: &str) -> Vec<PickOutcome> {
        let mut steps = Vec::new();
        for word in sentence.split_whitespace() {
            let index = board.pool().iter().position(|t| t == word).unwrap();
            steps.push(board.pick(index).unwrap());
        }
        steps
    }

    #[test]
    fn assembling_in_order_completes() {
        let sentence = "the cat sat on the mat";
        let mut board = WordOrderBoard::new(tokens(sentence), &mut SessionRng::seeded(3));
        let steps = solve(&mut board, sentence);

        assert_eq!(steps.last(), Some(&PickOutcome::Completed));
        assert_eq!(steps[0], PickOutcome::Placed { remaining: 5 });
        assert_eq!(board.picked().join(" "), sentence);
        assert!(board.pool().is_empty());
    }

    #[test]
    fn wrong_pick_flags_without_changing_state() {
        let mut board = WordOrderBoard::new(tokens("a b c"), &mut SessionRng::seeded(1));
        let wrong = board.pool().iter().position(|t| t != "a").unwrap();
        let pool_before = board.pool().to_vec();

        assert_eq!(board.pick(wrong), Ok(PickOutcome::Misplaced { index: wrong }));
        assert_eq!(board.wrong_flag(), Some(wrong));
        assert_eq!(board.pool(), pool_before.as_slice());
        assert!(board.picked().is_empty());

        board.clear_wrong_flag();
        assert_eq!(board.wrong_flag(), None);
    }

    #[test]
    fn next_pick_clears_the_flag() {
        let mut board = WordOrderBoard::new(tokens("a b"), &mut SessionRng::seeded(5));
        let wrong = board.pool().iter().position(|t| t == "b").unwrap();
        board.pick(wrong).unwrap();
        let right = board.pool().iter().position(|t| t == "a").unwrap();
        board.pick(right).unwrap();
        assert_eq!(board.wrong_flag(), None);
    }

    #[test]
    fn duplicate_tokens_are_interchangeable() {
        let mut board = WordOrderBoard::new(tokens("go go go"), &mut SessionRng::seeded(9));
        assert_eq!(board.pick(2), Ok(PickOutcome::Placed { remaining: 2 }));
        assert_eq!(board.pick(0), Ok(PickOutcome::Placed { remaining: 1 }));
        assert_eq!(board.pick(0), Ok(PickOutcome::Completed));
    }

    #[test]
    fn out_of_range_pick_is_rejected() {
        let mut board = WordOrderBoard::new(tokens("one"), &mut SessionRng::seeded(0));
        assert_eq!(
            board.pick(4),
            Err(ActionError::TokenOutOfRange { index: 4, len: 1 })
        );
    }
}
