//! Bounded edit-distance check for typed answers.
//!
//! Only answers whether two strings are identical, one edit apart, or further
//! apart. Grading depends on exactly that trichotomy, so this is deliberately
//! not a general Levenshtein distance.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// How far a typed answer is from the expected one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditClass {
    Exact,
    OneEdit,
    Far,
}

/// Classify `actual` against `expected` in a single left-to-right pass.
///
/// Inputs are compared character by character as given; trimming and case
/// folding are the caller's job.
pub fn classify(expected: &str, actual: &str) -> EditClass {
    let expected: Vec<char> = expected.chars().collect();
    let actual: Vec<char> = actual.chars().collect();
    let (n, m) = (expected.len(), actual.len());

    if n.abs_diff(m) > 1 {
        return EditClass::Far;
    }

    let (mut i, mut j) = (0, 0);
    let mut mismatch = false;
    while i < n && j < m {
        if expected[i] == actual[j] {
            i += 1;
            j += 1;
            continue;
        }
        if mismatch {
            return EditClass::Far;
        }
        mismatch = true;

        // The longer side absorbs the skip; equal lengths mean substitution.
        match n.cmp(&m) {
            Ordering::Equal => {
                i += 1;
                j += 1;
            }
            Ordering::Greater => i += 1,
            Ordering::Less => j += 1,
        }
    }

    if mismatch || n != m {
        EditClass::OneEdit
    } else {
        EditClass::Exact
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_are_exact() {
        for s in ["", "a", "cat", "ёжик", "two words"] {
            assert_eq!(classify(s, s), EditClass::Exact, "{s:?}");
        }
    }

    #[test]
    fn length_gap_over_one_is_far() {
        assert_eq!(classify("cat", "c"), EditClass::Far);
        assert_eq!(classify("", "ab"), EditClass::Far);
        assert_eq!(classify("elephant", "elephantine"), EditClass::Far);
    }

    #[test]
    fn single_edits() {
        assert_eq!(classify("cat", "cot"), EditClass::OneEdit);
        assert_eq!(classify("cat", "ct"), EditClass::OneEdit);
        assert_eq!(classify("cat", "cats"), EditClass::OneEdit);
        assert_eq!(classify("cat", "at"), EditClass::OneEdit);
        assert_eq!(classify("", "a"), EditClass::OneEdit);
    }

    #[test]
    fn two_edits_are_far() {
        assert_eq!(classify("cat", "dog"), EditClass::Far);
        assert_eq!(classify("ab", "ba"), EditClass::Far);
        assert_eq!(classify("abc", "xbcd"), EditClass::Far);
    }

    #[test]
    fn compares_characters_not_bytes() {
        assert_eq!(classify("ёж", "еж"), EditClass::OneEdit);
    }

    #[test]
    fn inputs_are_not_normalized() {
        assert_eq!(classify("cat", "Cat"), EditClass::OneEdit);
        assert_eq!(classify("cat", " cat "), EditClass::Far);
    }
}
