//! Race mode: both players guess independently against the same word.
//!
//! Each player's outcome is decided from their own track alone. Deadlines
//! start at one shared instant and then restart per player on every
//! submission.

use crate::session::{Projection, Rules, SessionError, Table};
use crate::{GameMode, GameOver, Guess, LetterStatus, MatchConfig, Player, PlayerId};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Simultaneous rules with one guess track per player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Race {
    tracks: BTreeMap<PlayerId, Vec<Guess>>,
    max_guesses: usize,
}

impl Race {
    /// The player's own guesses, oldest first.
    pub fn guesses_of(&self, player_id: &str) -> &[Guess] {
        self.tracks.get(player_id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Guess cap per player.
    pub fn max_guesses(&self) -> usize {
        self.max_guesses
    }

    /// Whether anybody has submitted anything yet.
    pub fn anyone_guessed(&self) -> bool {
        self.tracks.values().any(|track| !track.is_empty())
    }
}

impl Rules for Race {
    type View = RaceView;

    const MODE: GameMode = GameMode::Race;

    fn new(config: &MatchConfig) -> Self {
        Self {
            tracks: BTreeMap::new(),
            max_guesses: *config.max_guesses(),
        }
    }

    #[instrument(skip(self, table))]
    fn start(&mut self, table: &mut Table<'_>, _first: &str) {
        for player_id in table.roster() {
            self.tracks.entry(player_id.to_string()).or_default();
        }
        table.arm_everyone();
    }

    fn may_act(&self, _player_id: &str) -> Result<(), SessionError> {
        Ok(())
    }

    #[instrument(skip(self, table, guess))]
    fn record(&mut self, table: &mut Table<'_>, player_id: &str, guess: Guess) -> Option<GameOver> {
        let track = self.tracks.entry(player_id.to_string()).or_default();
        track.push(guess);

        if track.iter().any(Guess::is_solved) {
            return Some(GameOver::Win {
                player_id: player_id.to_string(),
            });
        }

        if track.len() >= self.max_guesses {
            return Some(GameOver::OutOfGuesses {
                player_id: player_id.to_string(),
            });
        }

        debug!(used = track.len(), max = self.max_guesses, "Restarting player deadline");
        table.arm(player_id);
        None
    }

    fn expire(&self, holder: &str) -> GameOver {
        if self.anyone_guessed() {
            GameOver::TimeLimit {
                player_id: holder.to_string(),
            }
        } else {
            GameOver::NoGuesses
        }
    }

    fn project(&self, projection: &Projection<'_>) -> RaceView {
        let viewer = projection.viewer();
        RaceView {
            you: RaceSelf {
                player: viewer.player().clone(),
                guesses: self.guesses_of(viewer.id()).to_vec(),
                current_guess: viewer.buffer().clone(),
                guess_by_ms: projection.remaining_ms(viewer.id()),
            },
            others: projection
                .others()
                .iter()
                .map(|seat| RaceOpponent {
                    player: seat.player().clone(),
                    guesses: self
                        .guesses_of(seat.id())
                        .iter()
                        .map(|guess| guess.computed().to_vec())
                        .collect(),
                    current_guess: seat.buffer_len(),
                    guess_by_ms: projection.remaining_ms(seat.id()),
                })
                .collect(),
        }
    }
}

/// What a race player sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct RaceView {
    /// The viewer.
    you: RaceSelf,
    /// The viewer's rival.
    others: Vec<RaceOpponent>,
}

/// The viewer's own track, words and buffer shown in full.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct RaceSelf {
    /// Player record.
    #[serde(flatten)]
    player: Player,
    /// The viewer's guesses.
    guesses: Vec<Guess>,
    /// Letters typed so far.
    current_guess: String,
    /// Milliseconds left on the viewer's deadline, when timed.
    guess_by_ms: Option<u64>,
}

/// The rival's track: status rows only, buffer reduced to its length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct RaceOpponent {
    /// Player record.
    #[serde(flatten)]
    player: Player,
    /// Status rows of the rival's guesses, words withheld.
    guesses: Vec<Vec<LetterStatus>>,
    /// How many letters the rival has typed.
    current_guess: usize,
    /// Milliseconds left on the rival's deadline, when timed.
    guess_by_ms: Option<u64>,
}
