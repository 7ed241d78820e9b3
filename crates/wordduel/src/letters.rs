//! Letter comparison engine.
//!
//! Scores a guess against the solution one letter at a time. Exact matches
//! are claimed first so that a duplicated guess letter can never be reported
//! more often than it appears in the solution.

use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Status of a single guessed letter.
///
/// Serialized with the compact one-letter codes the clients expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LetterStatus {
    /// Right letter, right position.
    #[serde(rename = "c")]
    Correct,
    /// Letter occurs in an unclaimed position of the solution.
    #[serde(rename = "p")]
    Present,
    /// Letter is not in the solution (or all occurrences are claimed).
    #[serde(rename = "a")]
    Absent,
}

/// Compares `guess` against `solution`, returning one status per guess letter.
///
/// Both words are expected to have the same length. Positions past the end
/// of the shorter word are reported as [`LetterStatus::Absent`].
#[instrument]
pub fn compare(guess: &str, solution: &str) -> Vec<LetterStatus> {
    let guess: Vec<char> = guess.chars().collect();
    let solution: Vec<char> = solution.chars().collect();
    debug_assert_eq!(guess.len(), solution.len(), "guess and solution differ in length");

    let mut statuses: Vec<Option<LetterStatus>> = vec![None; guess.len()];
    let mut taken = vec![false; solution.len()];

    for (i, letter) in guess.iter().enumerate() {
        if solution.get(i) == Some(letter) {
            statuses[i] = Some(LetterStatus::Correct);
            taken[i] = true;
        }
    }

    for (i, letter) in guess.iter().enumerate() {
        if statuses[i].is_some() {
            continue;
        }

        let unclaimed = solution
            .iter()
            .enumerate()
            .position(|(j, candidate)| candidate == letter && !taken[j]);

        statuses[i] = Some(match unclaimed {
            Some(j) => {
                taken[j] = true;
                LetterStatus::Present
            }
            None => LetterStatus::Absent,
        });
    }

    statuses
        .into_iter()
        .map(|status| status.unwrap_or(LetterStatus::Absent))
        .collect()
}

/// A submitted guess together with its scored letters.
///
/// Guesses are immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guess {
    raw: String,
    computed: Vec<LetterStatus>,
}

impl Guess {
    /// Scores `raw` against `solution`.
    pub fn new(raw: impl Into<String>, solution: &str) -> Self {
        let raw = raw.into();
        let computed = compare(&raw, solution);
        Self { raw, computed }
    }

    /// The word as typed.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Per-letter statuses, same length as [`Guess::raw`].
    pub fn computed(&self) -> &[LetterStatus] {
        &self.computed
    }

    /// True when every letter is [`LetterStatus::Correct`].
    pub fn is_solved(&self) -> bool {
        !self.computed.is_empty()
            && self
                .computed
                .iter()
                .all(|status| *status == LetterStatus::Correct)
    }
}
