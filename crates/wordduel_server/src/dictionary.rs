//! Guess validation and solution selection.

use derive_more::{Display, Error};
use rand::Rng;
use std::collections::HashSet;
use std::fmt::Debug;
use std::path::Path;
use tracing::{debug, info, instrument};
use wordduel::SOLUTION_SIZE;

const BUNDLED_SOLUTIONS: &str = include_str!("../data/solutions.txt");
const BUNDLED_WORDS: &str = include_str!("../data/words.txt");

/// Decides whether a complete guess is a real word.
pub trait Dictionary: Debug + Send + Sync {
    /// True when `word` may be submitted.
    fn is_valid(&self, word: &str) -> bool;
}

/// A set of accepted lowercase words.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordList {
    words: HashSet<String>,
}

impl WordList {
    /// Builds a list from arbitrary words, keeping only well-formed ones.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: words.into_iter().filter_map(|w| normalize(w.as_ref())).collect(),
        }
    }

    /// The compiled-in list: every solution plus the extra guess words.
    #[instrument]
    pub fn bundled() -> Self {
        let list = Self::from_words(BUNDLED_SOLUTIONS.lines().chain(BUNDLED_WORDS.lines()));
        info!(words = list.len(), "Loaded bundled word list");
        list
    }

    /// Reads one word per line from `path`.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DictionaryError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| DictionaryError::new(format!("Failed to read word list: {}", e)))?;
        let list = Self::from_words(content.lines());
        if list.is_empty() {
            return Err(DictionaryError::new("Word list has no usable words"));
        }
        info!(words = list.len(), "Loaded word list from file");
        Ok(list)
    }

    /// Adds every word of `other`.
    pub fn extend(&mut self, other: WordList) {
        self.words.extend(other.words);
    }

    /// Number of accepted words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// True when nothing is accepted.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Dictionary for WordList {
    fn is_valid(&self, word: &str) -> bool {
        let valid = self.words.contains(&word.to_ascii_lowercase());
        if !valid {
            debug!(word, "Rejected guess");
        }
        valid
    }
}

/// Picks solutions for new matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionSource {
    solutions: Vec<String>,
}

impl SolutionSource {
    /// Creates a source from candidate words.
    ///
    /// # Errors
    ///
    /// Returns [`DictionaryError`] if no candidate is a well-formed solution.
    pub fn new<I, S>(words: I) -> Result<Self, DictionaryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut solutions: Vec<String> = words.into_iter().filter_map(|w| normalize(w.as_ref())).collect();
        solutions.sort();
        solutions.dedup();
        if solutions.is_empty() {
            return Err(DictionaryError::new("No usable solutions"));
        }
        Ok(Self { solutions })
    }

    /// The compiled-in solution list.
    #[instrument]
    pub fn bundled() -> Result<Self, DictionaryError> {
        Self::new(BUNDLED_SOLUTIONS.lines())
    }

    /// A uniformly random solution.
    pub fn random_solution(&self) -> &str {
        let index = rand::rng().random_range(0..self.solutions.len());
        &self.solutions[index]
    }

    /// Every candidate, sorted.
    pub fn solutions(&self) -> &[String] {
        &self.solutions
    }
}

fn normalize(word: &str) -> Option<String> {
    let word = word.trim();
    (word.len() == SOLUTION_SIZE && word.chars().all(|c| c.is_ascii_alphabetic()))
        .then(|| word.to_ascii_lowercase())
}

/// Word list loading error.
#[derive(Debug, Clone, Display, Error)]
#[display("Dictionary error: {} at {}:{}", message, file, line)]
pub struct DictionaryError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl DictionaryError {
    /// Creates a new dictionary error with caller location tracking.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}
