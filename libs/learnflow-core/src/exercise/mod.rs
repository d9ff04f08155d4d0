//! Per-task state machines for the interactive exercise kinds.

pub mod matching;
pub mod translation;
pub mod word_order;

use std::fmt;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

pub use matching::{MatchOption, MatchStep, MatchingBoard, Side};
pub use translation::{TranslationAttempt, TranslationStep};
pub use word_order::{PickOutcome, WordOrderBoard};

/// Source of every random choice a session makes (shuffles, display language).
///
/// Seeded in tests for deterministic sequences; seeded from entropy otherwise.
pub struct SessionRng {
    rng: StdRng,
}

impl SessionRng {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }

    pub fn coin_flip(&mut self) -> bool {
        self.rng.gen_bool(0.5)
    }
}

impl fmt::Debug for SessionRng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRng").finish_non_exhaustive()
    }
}
