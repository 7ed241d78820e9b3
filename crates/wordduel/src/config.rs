//! Match configuration supplied by the lobby before a session exists.

use derive_getters::Getters;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Length of every solution and every accepted guess.
pub const SOLUTION_SIZE: usize = 5;

/// Guess cap a session starts with.
pub const MAX_GUESSES: usize = 6;

/// Number of players in every match.
pub const MAX_PLAYERS: usize = 2;

/// Which rule set a match is played under.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GameMode {
    /// Players alternate guesses against a shared board.
    Coop,
    /// Players race on separate boards against the same word.
    Race,
}

/// Time budget per turn (cooperative) or per submission (race).
///
/// On the wire this is `30`, `60`, or `8`; the lobby uses `8` to mean untimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TimeToGuess {
    /// Thirty seconds.
    #[default]
    Seconds30,
    /// Sixty seconds.
    Seconds60,
    /// No deadline at all.
    Untimed,
}

impl TimeToGuess {
    /// The budget as a duration, `None` when untimed.
    pub fn duration(self) -> Option<Duration> {
        match self {
            Self::Seconds30 => Some(Duration::from_secs(30)),
            Self::Seconds60 => Some(Duration::from_secs(60)),
            Self::Untimed => None,
        }
    }
}

impl TryFrom<u8> for TimeToGuess {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            30 => Ok(Self::Seconds30),
            60 => Ok(Self::Seconds60),
            8 => Ok(Self::Untimed),
            other => Err(format!("unsupported timeToGuess: {other}")),
        }
    }
}

impl From<TimeToGuess> for u8 {
    fn from(value: TimeToGuess) -> Self {
        match value {
            TimeToGuess::Seconds30 => 30,
            TimeToGuess::Seconds60 => 60,
            TimeToGuess::Untimed => 8,
        }
    }
}

/// Everything a session needs to know before the first player joins.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct MatchConfig {
    /// The word to guess. Lowercase, [`SOLUTION_SIZE`] letters.
    #[setters(skip)]
    solution: String,
    /// Deadline budget.
    time_to_guess: TimeToGuess,
    /// Initial guess cap.
    max_guesses: usize,
}

impl MatchConfig {
    /// Creates a timed config with the default guess cap.
    pub fn new(solution: impl Into<String>) -> Self {
        Self {
            solution: solution.into().to_lowercase(),
            time_to_guess: TimeToGuess::default(),
            max_guesses: MAX_GUESSES,
        }
    }

    /// Number of letters in the solution.
    pub fn solution_size(&self) -> usize {
        self.solution.chars().count()
    }
}
