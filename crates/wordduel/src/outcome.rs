//! Terminal outcomes and per-player result attribution.

use crate::{Player, PlayerId};
use serde::{Deserialize, Serialize};

/// How a match ended. Once set on a session it never changes.
///
/// Cooperative matches only ever end in [`GameOver::Win`] or
/// [`GameOver::TimeLimit`]; race matches can end in any variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GameOver {
    /// Someone solved the word.
    Win {
        /// The solver.
        #[serde(rename = "playerId")]
        player_id: PlayerId,
    },
    /// A deadline passed without the holder acting.
    TimeLimit {
        /// The player who ran out of time.
        #[serde(rename = "playerId")]
        player_id: PlayerId,
    },
    /// A race player used every guess without solving.
    OutOfGuesses {
        /// The player who ran out of guesses.
        #[serde(rename = "playerId")]
        player_id: PlayerId,
    },
    /// A race deadline passed before either player guessed at all.
    NoGuesses,
}

/// A single player's result, as reported to the stats store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MatchResult {
    /// The player won.
    Win,
    /// The player lost.
    Loss,
}

impl GameOver {
    /// The player the outcome is about, if any.
    pub fn player_id(&self) -> Option<&str> {
        match self {
            Self::Win { player_id }
            | Self::TimeLimit { player_id }
            | Self::OutOfGuesses { player_id } => Some(player_id.as_str()),
            Self::NoGuesses => None,
        }
    }

    /// Attributes a win or loss to each player in `roster`.
    ///
    /// A win credits the named player; a timeout or exhausted cap debits
    /// them and credits everyone else. [`GameOver::NoGuesses`] attributes
    /// nothing.
    pub fn results<'a>(&self, roster: &'a [Player]) -> Vec<(&'a Player, MatchResult)> {
        let (named, named_result, others_result) = match self {
            Self::Win { player_id } => (player_id, MatchResult::Win, MatchResult::Loss),
            Self::TimeLimit { player_id } | Self::OutOfGuesses { player_id } => {
                (player_id, MatchResult::Loss, MatchResult::Win)
            }
            Self::NoGuesses => return Vec::new(),
        };

        roster
            .iter()
            .map(|player| {
                if player.id() == named {
                    (player, named_result)
                } else {
                    (player, others_result)
                }
            })
            .collect()
    }
}
