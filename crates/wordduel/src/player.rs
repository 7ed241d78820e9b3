//! Players and identity classes.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Opaque player identifier, stable for the lifetime of a match.
pub type PlayerId = String;

/// How a player's identity was established.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IdentityClass {
    /// Issued on the spot for a guest; stats are not recorded.
    Anon,
    /// Backed by a real account; stats are recorded.
    Verified,
}

/// A participant in a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct Player {
    /// Player's unique ID.
    id: PlayerId,
    /// Name shown to the opponent.
    username: String,
    /// Optional country code used for flags.
    country: Option<String>,
    /// Identity class.
    #[serde(rename = "type")]
    class: IdentityClass,
}

impl Player {
    /// Creates a new player record.
    pub fn new(
        id: impl Into<PlayerId>,
        username: impl Into<String>,
        country: Option<String>,
        class: IdentityClass,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            country,
            class,
        }
    }

    /// Shorthand for an anonymous player without a country.
    pub fn anon(id: impl Into<PlayerId>, username: impl Into<String>) -> Self {
        Self::new(id, username, None, IdentityClass::Anon)
    }

    /// True for players whose results should be persisted.
    pub fn is_verified(&self) -> bool {
        self.class == IdentityClass::Verified
    }
}
