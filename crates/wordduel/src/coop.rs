//! Cooperative mode: players alternate guesses on one shared board.
//!
//! The guess cap never forces the match to end. Each time the shared log
//! reaches one short of the cap, the cap grows by one.

use crate::session::{Projection, Rules, SessionError, Table};
use crate::{GameMode, GameOver, Guess, MatchConfig, Player, PlayerId};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Turn-gated rules with a shared guess log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cooperative {
    current_turn: Option<PlayerId>,
    guesses: Vec<Guess>,
    max_guesses: usize,
}

impl Cooperative {
    /// The player holding the turn, once the match has started.
    pub fn current_turn(&self) -> Option<&str> {
        self.current_turn.as_deref()
    }

    /// Shared guess log, oldest first.
    pub fn guesses(&self) -> &[Guess] {
        &self.guesses
    }

    /// Current guess cap.
    pub fn max_guesses(&self) -> usize {
        self.max_guesses
    }

    fn is_turn_of(&self, player_id: &str) -> bool {
        self.current_turn.as_deref() == Some(player_id)
    }
}

impl Rules for Cooperative {
    type View = CoopView;

    const MODE: GameMode = GameMode::Coop;

    fn new(config: &MatchConfig) -> Self {
        Self {
            current_turn: None,
            guesses: Vec::new(),
            max_guesses: *config.max_guesses(),
        }
    }

    #[instrument(skip(self, table))]
    fn start(&mut self, table: &mut Table<'_>, first: &str) {
        self.current_turn = Some(first.to_string());
        table.arm_exclusive(first);
    }

    fn may_act(&self, player_id: &str) -> Result<(), SessionError> {
        if self.is_turn_of(player_id) {
            Ok(())
        } else {
            Err(SessionError::NotYourTurn(player_id.to_string()))
        }
    }

    #[instrument(skip(self, table, guess), fields(log_len = self.guesses.len()))]
    fn record(&mut self, table: &mut Table<'_>, player_id: &str, guess: Guess) -> Option<GameOver> {
        let solved = guess.is_solved();
        self.guesses.push(guess);

        if solved {
            return Some(GameOver::Win {
                player_id: player_id.to_string(),
            });
        }

        let next = table.opponent_of(player_id).unwrap_or(player_id).to_string();

        if self.guesses.len() + 1 >= self.max_guesses {
            self.max_guesses += 1;
            debug!(max_guesses = self.max_guesses, "Extended guess cap");
        }

        table.arm_exclusive(&next);
        self.current_turn = Some(next);
        None
    }

    fn expire(&self, holder: &str) -> GameOver {
        GameOver::TimeLimit {
            player_id: self.current_turn.clone().unwrap_or_else(|| holder.to_string()),
        }
    }

    fn project(&self, projection: &Projection<'_>) -> CoopView {
        let viewer = projection.viewer();
        CoopView {
            you: CoopSelf {
                player: viewer.player().clone(),
                current_guess: viewer.buffer().clone(),
                is_current_turn: self.is_turn_of(viewer.id()),
            },
            others: projection
                .others()
                .iter()
                .map(|seat| CoopOpponent {
                    player: seat.player().clone(),
                    current_guess: seat.buffer_len(),
                    is_current_turn: self.is_turn_of(seat.id()),
                })
                .collect(),
            guesses: self.guesses.clone(),
            max_guesses: self.max_guesses,
            guess_by_ms: projection.next_remaining_ms(),
        }
    }
}

/// What a cooperative player sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct CoopView {
    /// The viewer.
    you: CoopSelf,
    /// The viewer's partner.
    others: Vec<CoopOpponent>,
    /// Shared guess log.
    guesses: Vec<Guess>,
    /// Current guess cap.
    max_guesses: usize,
    /// Milliseconds left for the turn holder, when timed.
    guess_by_ms: Option<u64>,
}

/// The viewer's own record, buffer shown in full.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct CoopSelf {
    /// Player record.
    #[serde(flatten)]
    player: Player,
    /// Letters typed so far.
    current_guess: String,
    /// Whether the viewer holds the turn.
    is_current_turn: bool,
}

/// The partner's record, buffer reduced to its length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct CoopOpponent {
    /// Player record.
    #[serde(flatten)]
    player: Player,
    /// How many letters the partner has typed.
    current_guess: usize,
    /// Whether the partner holds the turn.
    is_current_turn: bool,
}
