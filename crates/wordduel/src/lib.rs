//! Word Duel game logic.
//!
//! Pure, I/O-free rules for a two-player word-guessing game played in one of
//! two modes:
//!
//! - **Cooperative**: players alternate guesses on a shared board; the first
//!   correct guess wins and the guess cap keeps growing.
//! - **Race**: players guess simultaneously on separate boards against the
//!   same word.
//!
//! # Architecture
//!
//! - **Letters**: the two-pass comparison engine ([`compare`])
//! - **Session**: [`GameSession`] owns players, buffers, deadlines and the
//!   terminal state; mode differences plug in through [`Rules`]
//! - **Environment**: injectable clock and randomness ([`Environment`]) so
//!   deadlines are testable without waiting
//! - **Rematch**: consent tracking after a match ends
//!
//! # Example
//!
//! ```
//! use wordduel::{CoopSession, ManualEnv, MatchConfig, Player};
//!
//! let mut session = CoopSession::<ManualEnv>::new(MatchConfig::new("stone"), ManualEnv::new());
//! session.add_player(Player::anon("a", "Ann")).unwrap();
//! session.add_player(Player::anon("b", "Ben")).unwrap();
//! assert!(session.rules().current_turn().is_some());
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod coop;
mod deadlines;
mod env;
pub mod invariants;
mod letters;
mod outcome;
mod player;
mod race;
mod rematch;
mod session;

pub use config::{GameMode, MAX_GUESSES, MAX_PLAYERS, MatchConfig, SOLUTION_SIZE, TimeToGuess};
pub use coop::{CoopOpponent, CoopSelf, CoopView, Cooperative};
pub use deadlines::Deadlines;
pub use env::{Environment, ManualEnv, SystemEnv};
pub use letters::{Guess, LetterStatus, compare};
pub use outcome::{GameOver, MatchResult};
pub use player::{IdentityClass, Player, PlayerId};
pub use race::{Race, RaceOpponent, RaceSelf, RaceView};
pub use rematch::Rematch;
pub use session::{GameSession, JoinOutcome, Projection, Rules, Seat, SessionError, Table};

/// A cooperative session.
pub type CoopSession<E = SystemEnv> = GameSession<Cooperative, E>;

/// A race session.
pub type RaceSession<E = SystemEnv> = GameSession<Race, E>;
