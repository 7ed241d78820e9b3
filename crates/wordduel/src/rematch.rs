//! Post-match rematch negotiation.

use crate::{MAX_PLAYERS, PlayerId};
use std::collections::BTreeMap;
use tracing::{info, instrument};

/// Collects rematch consent after a match ends.
///
/// Consent is monotonic: once a player agrees there is no way to take it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rematch {
    expected_players: usize,
    consents: BTreeMap<PlayerId, bool>,
}

impl Rematch {
    /// Creates a negotiator waiting on `expected_players` consents.
    pub fn new(expected_players: usize) -> Self {
        Self {
            expected_players,
            consents: BTreeMap::new(),
        }
    }

    /// Records that `player_id` wants a rematch.
    #[instrument(skip(self))]
    pub fn agree(&mut self, player_id: &str) {
        self.consents.insert(player_id.to_string(), true);
        info!(
            consents = self.consent_count(),
            expected = self.expected_players,
            "Rematch consent recorded"
        );
    }

    /// True once every expected player has agreed.
    pub fn everyone_wants_to(&self) -> bool {
        self.consent_count() == self.expected_players
    }

    /// True once anyone has agreed.
    pub fn someone_wants_to(&self) -> bool {
        !self.consents.is_empty()
    }

    /// Whether `player_id` has agreed.
    pub fn i_want_to(&self, player_id: &str) -> bool {
        self.consents.get(player_id).copied().unwrap_or(false)
    }

    /// Consent map, as sent in `rematchStatus`.
    pub fn consents(&self) -> &BTreeMap<PlayerId, bool> {
        &self.consents
    }

    fn consent_count(&self) -> usize {
        self.consents.values().filter(|agreed| **agreed).count()
    }
}

impl Default for Rematch {
    fn default() -> Self {
        Self::new(MAX_PLAYERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_both_players() {
        let mut rematch = Rematch::default();
        assert!(!rematch.someone_wants_to());

        rematch.agree("a");
        assert!(rematch.someone_wants_to());
        assert!(!rematch.everyone_wants_to());
        assert!(rematch.i_want_to("a"));
        assert!(!rematch.i_want_to("b"));

        rematch.agree("b");
        assert!(rematch.everyone_wants_to());
    }

    #[test]
    fn test_repeated_consent_counts_once() {
        let mut rematch = Rematch::default();
        rematch.agree("a");
        rematch.agree("a");
        assert!(!rematch.everyone_wants_to());
        assert_eq!(rematch.consents().len(), 1);
    }
}
