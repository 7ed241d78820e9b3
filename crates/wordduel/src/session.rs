//! The authoritative per-match state machine.
//!
//! [`GameSession`] owns everything both modes share: the solution, the
//! roster and their in-progress guess buffers, the deadline table, and the
//! terminal state. What differs between modes (turn gating, how a guess
//! changes progress, how an expired deadline is classified, what a viewer is
//! shown) lives behind the [`Rules`] strategy.
//!
//! Every mutating method checks its preconditions first. A command that
//! fails them returns [`SessionError`] and leaves the session untouched.

use crate::invariants::{InvariantSet, SessionInvariants};
use crate::{Deadlines, Environment, GameMode, GameOver, Guess, MAX_PLAYERS, MatchConfig, Player, PlayerId};
use derive_getters::Getters;
use serde::Serialize;
use std::fmt::Debug;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Why a command had no effect.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum SessionError {
    /// Both seats are taken.
    #[display("Session already has {} players", MAX_PLAYERS)]
    SessionFull,
    /// The player never joined this session.
    #[display("Unknown player {}", _0)]
    UnknownPlayer(PlayerId),
    /// The second player has not joined yet.
    #[display("Waiting for players")]
    WaitingForPlayers,
    /// The match already ended.
    #[display("Game is already over")]
    GameOver,
    /// Another player holds the turn.
    #[display("Not {}'s turn", _0)]
    NotYourTurn(PlayerId),
    /// The buffer already holds a full word.
    #[display("Guess buffer is full")]
    BufferFull,
    /// The buffer does not hold a full word yet.
    #[display("Guess has {} of {} letters", len, expected)]
    IncompleteGuess {
        /// Letters typed so far.
        len: usize,
        /// Letters required.
        expected: usize,
    },
    /// Only ASCII letters can be typed.
    #[display("Invalid letter {:?}", _0)]
    InvalidLetter(char),
}

impl std::error::Error for SessionError {}

/// What [`GameSession::add_player`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The player took a free seat; still waiting for an opponent.
    Seated,
    /// The player took the last seat and the match started.
    Started,
    /// The player was already seated; nothing changed.
    AlreadySeated,
}

/// A seated player and their in-progress guess.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct Seat {
    /// The player.
    player: Player,
    /// Letters typed but not yet submitted.
    buffer: String,
}

impl Seat {
    fn new(player: Player) -> Self {
        Self {
            player,
            buffer: String::new(),
        }
    }

    /// Shorthand for the seated player's id.
    pub fn id(&self) -> &str {
        self.player.id()
    }

    /// Number of letters typed so far.
    pub fn buffer_len(&self) -> usize {
        self.buffer.chars().count()
    }
}

/// The shared state a rule set may touch while handling an event.
#[derive(Debug)]
pub struct Table<'a> {
    seats: &'a [Seat],
    deadlines: &'a mut Deadlines,
    now: Instant,
    budget: Option<Duration>,
}

impl Table<'_> {
    /// Current time.
    pub fn now(&self) -> Instant {
        self.now
    }

    /// Deadline budget, `None` when untimed.
    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }

    /// Ids of everyone seated, in join order.
    pub fn roster(&self) -> impl Iterator<Item = &str> {
        self.seats.iter().map(Seat::id)
    }

    /// The seated player who is not `player_id`.
    pub fn opponent_of(&self, player_id: &str) -> Option<&str> {
        self.roster().find(|id| *id != player_id)
    }

    /// Restarts `holder`'s deadline one budget from now. No-op when untimed.
    pub fn arm(&mut self, holder: &str) {
        if let Some(budget) = self.budget {
            self.deadlines.arm(holder, self.now + budget);
        }
    }

    /// Cancels every deadline and starts one for `holder` only.
    pub fn arm_exclusive(&mut self, holder: &str) {
        if let Some(budget) = self.budget {
            self.deadlines.arm_exclusive(holder, self.now + budget);
        }
    }

    /// Starts a deadline for every seated player, all at the same instant.
    pub fn arm_everyone(&mut self) {
        if let Some(budget) = self.budget {
            let at = self.now + budget;
            for seat in self.seats {
                self.deadlines.arm(seat.id(), at);
            }
        }
    }
}

/// Read-only context for building one viewer's projection.
#[derive(Debug)]
pub struct Projection<'a> {
    viewer: &'a Seat,
    others: Vec<&'a Seat>,
    deadlines: &'a Deadlines,
    now: Instant,
}

impl<'a> Projection<'a> {
    /// The requesting player's seat.
    pub fn viewer(&self) -> &'a Seat {
        self.viewer
    }

    /// Everyone else's seats.
    pub fn others(&self) -> &[&'a Seat] {
        &self.others
    }

    /// Milliseconds left on `holder`'s deadline, `None` if none is pending.
    pub fn remaining_ms(&self, holder: &str) -> Option<u64> {
        self.deadlines.get(holder).map(|at| {
            let left = at.saturating_duration_since(self.now);
            u64::try_from(left.as_millis()).unwrap_or(u64::MAX)
        })
    }

    /// Milliseconds left on whichever deadline is pending soonest.
    pub fn next_remaining_ms(&self) -> Option<u64> {
        self.deadlines.next_due().map(|at| {
            let left = at.saturating_duration_since(self.now);
            u64::try_from(left.as_millis()).unwrap_or(u64::MAX)
        })
    }
}

/// Mode-specific rules plugged into a [`GameSession`].
pub trait Rules: Debug + Send + 'static {
    /// Per-viewer projection type.
    type View: Serialize + Clone + Debug + Send;

    /// The mode these rules implement.
    const MODE: GameMode;

    /// Creates the initial progress for a match.
    fn new(config: &MatchConfig) -> Self;

    /// Called exactly once, when the last seat is taken.
    ///
    /// `first` is chosen uniformly at random from the roster.
    fn start(&mut self, table: &mut Table<'_>, first: &str);

    /// Whether `player_id` may type or submit right now.
    fn may_act(&self, player_id: &str) -> Result<(), SessionError>;

    /// Records a scored guess and returns the terminal outcome, if any.
    fn record(&mut self, table: &mut Table<'_>, player_id: &str, guess: Guess) -> Option<GameOver>;

    /// Classifies the expiry of `holder`'s deadline.
    fn expire(&self, holder: &str) -> GameOver;

    /// Builds what the viewer is allowed to see.
    fn project(&self, projection: &Projection<'_>) -> Self::View;
}

/// One match, generic over its rules and environment.
#[derive(Debug)]
pub struct GameSession<R: Rules, E: Environment> {
    config: MatchConfig,
    env: E,
    seats: Vec<Seat>,
    rules: R,
    deadlines: Deadlines,
    game_over: Option<GameOver>,
}

impl<R: Rules, E: Environment> GameSession<R, E> {
    /// Creates an empty session waiting for players.
    #[instrument(skip(env), fields(mode = %R::MODE))]
    pub fn new(config: MatchConfig, env: E) -> Self {
        info!(
            time_to_guess = ?config.time_to_guess(),
            max_guesses = config.max_guesses(),
            "Creating game session"
        );
        Self {
            rules: R::new(&config),
            config,
            env,
            seats: Vec::with_capacity(MAX_PLAYERS),
            deadlines: Deadlines::new(),
            game_over: None,
        }
    }

    /// Seats a player. Joining twice with the same id changes nothing.
    ///
    /// When the last seat is taken the starting player is drawn at random
    /// and the rules start their deadlines.
    #[instrument(skip(self, player), fields(mode = %R::MODE, player_id = %player.id()))]
    pub fn add_player(&mut self, player: Player) -> Result<JoinOutcome, SessionError> {
        if self.has_player(player.id()) {
            debug!("Player already seated");
            return Ok(JoinOutcome::AlreadySeated);
        }
        if self.is_full() {
            warn!("Session already has {} players", MAX_PLAYERS);
            return Err(SessionError::SessionFull);
        }

        info!(username = %player.username(), "Seating player");
        self.seats.push(Seat::new(player));

        if !self.is_full() {
            return Ok(JoinOutcome::Seated);
        }

        let first = self.seats[self.env.random_index(self.seats.len())]
            .id()
            .to_string();
        let mut table = Table {
            seats: &self.seats,
            deadlines: &mut self.deadlines,
            now: self.env.now(),
            budget: self.config.time_to_guess().duration(),
        };
        self.rules.start(&mut table, &first);
        info!(first = %first, "Match started");

        self.check_invariants();
        Ok(JoinOutcome::Started)
    }

    /// Appends a letter to the player's buffer, or removes the last one
    /// when `letter` is `None`.
    #[instrument(skip(self), fields(mode = %R::MODE))]
    pub fn type_letter(&mut self, player_id: &str, letter: Option<char>) -> Result<(), SessionError> {
        self.ensure_may_act(player_id)?;
        let size = self.config.solution_size();
        let seat = self.seat_mut(player_id)?;

        match letter {
            None => {
                seat.buffer.pop();
            }
            Some(letter) => {
                if !letter.is_ascii_alphabetic() {
                    return Err(SessionError::InvalidLetter(letter));
                }
                if seat.buffer_len() >= size {
                    return Err(SessionError::BufferFull);
                }
                seat.buffer.push(letter.to_ascii_lowercase());
            }
        }

        debug!(len = seat.buffer_len(), "Buffer updated");
        self.check_invariants();
        Ok(())
    }

    /// Returns the word `player_id` would submit, if a submission would be
    /// accepted right now. Never mutates.
    ///
    /// Hosts use this to run dictionary validation before
    /// [`GameSession::submit_guess`].
    pub fn pending_guess(&self, player_id: &str) -> Result<&str, SessionError> {
        self.ensure_may_act(player_id)?;
        let seat = self.seat(player_id)?;
        let expected = self.config.solution_size();
        if seat.buffer_len() != expected {
            return Err(SessionError::IncompleteGuess {
                len: seat.buffer_len(),
                expected,
            });
        }
        Ok(&seat.buffer)
    }

    /// Scores the player's buffer against the solution and hands the guess
    /// to the rules.
    ///
    /// Returns the terminal outcome when this guess ended the match.
    #[instrument(skip(self), fields(mode = %R::MODE))]
    pub fn submit_guess(&mut self, player_id: &str) -> Result<Option<GameOver>, SessionError> {
        let raw = self.pending_guess(player_id)?.to_string();
        let guess = Guess::new(raw, self.config.solution());
        info!(raw = %guess.raw(), solved = guess.is_solved(), "Guess submitted");

        self.seat_mut(player_id)?.buffer.clear();

        let mut table = Table {
            seats: &self.seats,
            deadlines: &mut self.deadlines,
            now: self.env.now(),
            budget: self.config.time_to_guess().duration(),
        };
        let outcome = self.rules.record(&mut table, player_id, guess);

        if let Some(over) = &outcome {
            self.finish(over.clone());
        }

        self.check_invariants();
        Ok(outcome)
    }

    /// Fires every deadline that is due at the environment's current time.
    ///
    /// Returns the terminal outcome if one of them ended the match. Once
    /// the match is over any remaining due deadlines are discarded.
    #[instrument(skip(self), fields(mode = %R::MODE))]
    pub fn advance(&mut self) -> Option<GameOver> {
        if self.is_game_over() {
            return None;
        }

        let due = self.deadlines.take_due(self.env.now());
        let holder = due.first()?;
        debug!(holder = %holder, due = due.len(), "Deadline expired");

        let over = self.rules.expire(holder);
        self.finish(over.clone());
        self.check_invariants();
        Some(over)
    }

    /// Builds the projection `player_id` is allowed to see.
    ///
    /// Returns `None` for players who are not seated.
    pub fn project_for(&self, player_id: &str) -> Option<R::View> {
        let viewer = self.seats.iter().find(|seat| seat.id() == player_id)?;
        let projection = Projection {
            viewer,
            others: self.seats.iter().filter(|seat| seat.id() != player_id).collect(),
            deadlines: &self.deadlines,
            now: self.env.now(),
        };
        Some(self.rules.project(&projection))
    }

    /// The mode this session is played under.
    pub fn mode(&self) -> GameMode {
        R::MODE
    }

    /// Match configuration.
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// The word to guess.
    pub fn solution(&self) -> &str {
        self.config.solution()
    }

    /// Mode-specific progress.
    pub fn rules(&self) -> &R {
        &self.rules
    }

    /// Seated players with their buffers, in join order.
    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    /// Seated players, in join order.
    pub fn roster(&self) -> Vec<Player> {
        self.seats.iter().map(|seat| seat.player.clone()).collect()
    }

    /// Looks up a seated player.
    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.seats
            .iter()
            .find(|seat| seat.id() == player_id)
            .map(Seat::player)
    }

    /// The player's in-progress buffer.
    pub fn buffer(&self, player_id: &str) -> Option<&str> {
        self.seat(player_id).ok().map(|seat| seat.buffer.as_str())
    }

    /// Whether `player_id` is seated.
    pub fn has_player(&self, player_id: &str) -> bool {
        self.seats.iter().any(|seat| seat.id() == player_id)
    }

    /// Whether every seat is taken.
    pub fn is_full(&self) -> bool {
        self.seats.len() >= MAX_PLAYERS
    }

    /// Whether the match has ended.
    pub fn is_game_over(&self) -> bool {
        self.game_over.is_some()
    }

    /// The terminal outcome, once set.
    pub fn game_over(&self) -> Option<&GameOver> {
        self.game_over.as_ref()
    }

    /// Pending deadlines.
    pub fn deadlines(&self) -> &Deadlines {
        &self.deadlines
    }

    /// When the timer driver should next call [`GameSession::advance`].
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.next_due()
    }

    fn ensure_may_act(&self, player_id: &str) -> Result<(), SessionError> {
        if self.is_game_over() {
            return Err(SessionError::GameOver);
        }
        if !self.has_player(player_id) {
            return Err(SessionError::UnknownPlayer(player_id.to_string()));
        }
        if !self.is_full() {
            return Err(SessionError::WaitingForPlayers);
        }
        self.rules.may_act(player_id)
    }

    fn seat(&self, player_id: &str) -> Result<&Seat, SessionError> {
        self.seats
            .iter()
            .find(|seat| seat.id() == player_id)
            .ok_or_else(|| SessionError::UnknownPlayer(player_id.to_string()))
    }

    fn seat_mut(&mut self, player_id: &str) -> Result<&mut Seat, SessionError> {
        self.seats
            .iter_mut()
            .find(|seat| seat.id() == player_id)
            .ok_or_else(|| SessionError::UnknownPlayer(player_id.to_string()))
    }

    fn finish(&mut self, over: GameOver) {
        info!(outcome = ?over, "Game over");
        self.deadlines.disarm_all();
        self.game_over = Some(over);
    }

    fn check_invariants(&self) {
        if let Err(violations) = SessionInvariants::check_all(self) {
            for violation in &violations {
                warn!(invariant = %violation.description, "Session invariant violated");
            }
            debug_assert!(violations.is_empty(), "Session invariants violated: {violations:?}");
        }
    }
}
