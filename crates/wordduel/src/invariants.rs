//! First-class session invariants.
//!
//! Invariants are logical properties that must hold after every command a
//! session accepts. They are checked in debug builds and can be tested
//! independently.

use crate::{Environment, GameSession, MAX_PLAYERS, Rules};
use std::collections::HashSet;

/// A logical property that must hold for a given state.
pub trait Invariant<S> {
    /// Checks if the invariant holds for the given state.
    fn holds(state: &S) -> bool;

    /// Human-readable description of the invariant.
    fn description() -> &'static str;
}

/// Violation of an invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub description: String,
}

impl InvariantViolation {
    /// Creates a new invariant violation.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// A set of invariants that can be checked together.
pub trait InvariantSet<S> {
    /// Checks all invariants in the set, collecting every violation.
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>>;
}

impl<S, I1, I2, I3> InvariantSet<S> for (I1, I2, I3)
where
    I1: Invariant<S>,
    I2: Invariant<S>,
    I3: Invariant<S>,
{
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
        let violations: Vec<InvariantViolation> = [
            (I1::holds(state), I1::description()),
            (I2::holds(state), I2::description()),
            (I3::holds(state), I3::description()),
        ]
        .into_iter()
        .filter(|(holds, _)| !holds)
        .map(|(_, description)| InvariantViolation::new(description))
        .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

/// Invariant: at most two players, no duplicate ids.
pub struct RosterBounded;

impl<R: Rules, E: Environment> Invariant<GameSession<R, E>> for RosterBounded {
    fn holds(session: &GameSession<R, E>) -> bool {
        let ids: HashSet<&str> = session.seats().iter().map(|seat| seat.id()).collect();
        session.seats().len() <= MAX_PLAYERS && ids.len() == session.seats().len()
    }

    fn description() -> &'static str {
        "At most two distinct players are seated"
    }
}

/// Invariant: no buffer is longer than the solution.
pub struct BuffersBounded;

impl<R: Rules, E: Environment> Invariant<GameSession<R, E>> for BuffersBounded {
    fn holds(session: &GameSession<R, E>) -> bool {
        let size = session.config().solution_size();
        session.seats().iter().all(|seat| seat.buffer_len() <= size)
    }

    fn description() -> &'static str {
        "Guess buffers never exceed the solution length"
    }
}

/// Invariant: deadlines belong to seated players and none survive game over.
pub struct DeadlinesOwned;

impl<R: Rules, E: Environment> Invariant<GameSession<R, E>> for DeadlinesOwned {
    fn holds(session: &GameSession<R, E>) -> bool {
        let deadlines = session.deadlines();
        if session.is_game_over() {
            return deadlines.is_empty();
        }
        deadlines.len() <= session.seats().len()
            && session
                .seats()
                .iter()
                .filter(|seat| deadlines.get(seat.id()).is_some())
                .count()
                == deadlines.len()
    }

    fn description() -> &'static str {
        "Deadlines are held only by seated players and cleared at game over"
    }
}

/// Every session invariant as a composable set.
pub type SessionInvariants = (RosterBounded, BuffersBounded, DeadlinesOwned);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cooperative, ManualEnv, MatchConfig, Player};

    #[test]
    fn test_invariants_hold_for_empty_session() {
        let session: GameSession<Cooperative, _> =
            GameSession::new(MatchConfig::new("stone"), ManualEnv::new());
        assert!(SessionInvariants::check_all(&session).is_ok());
    }

    #[test]
    fn test_invariants_hold_after_play() {
        let mut session: GameSession<Cooperative, _> =
            GameSession::new(MatchConfig::new("stone"), ManualEnv::new());
        session.add_player(Player::anon("a", "Ann")).expect("join");
        session.add_player(Player::anon("b", "Ben")).expect("join");
        assert_eq!(session.deadlines().len(), 1);
        assert!(SessionInvariants::check_all(&session).is_ok());
    }
}
