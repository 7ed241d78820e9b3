//! JSON wire protocol.
//!
//! Every frame is a JSON object tagged by `type`, camelCase throughout.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wordduel::{CoopView, GameMode, GameOver, Player, PlayerId, RaceView, TimeToGuess};

/// Short id of a match, shared in links.
pub type MatchId = String;

/// Frames a player sends on a match socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Identify and take a seat.
    Join {
        /// Token from an earlier visit, if any.
        token: Option<String>,
        /// Name to show the opponent.
        username: String,
        /// Country code, overriding the one from the connection URL.
        #[serde(default)]
        country: Option<String>,
    },
    /// Type one letter, or erase one when `letter` is null.
    TypeLetter {
        /// The letter.
        letter: Option<char>,
    },
    /// Submit the buffered word.
    SubmitGuess,
    /// Ask for another match against the same opponent.
    RequestRematch,
}

/// Frames the server sends on a match socket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// The match exists and accepts `join`.
    Ready,
    /// The join was accepted.
    Welcome {
        /// The caller's player id.
        #[serde(rename = "playerId")]
        player_id: PlayerId,
        /// A newly issued token the client should store.
        #[serde(skip_serializing_if = "Option::is_none")]
        token: Option<String>,
    },
    /// Both seats are taken by other players.
    FullGame,
    /// The caller's current view of the match.
    Tick {
        /// The projection.
        game: GameView,
    },
    /// The submitted word is not in the dictionary.
    BadGuess,
    /// The match ended.
    GameOver {
        /// How it ended.
        state: GameOver,
        /// The word.
        solution: String,
        /// Everyone who played, by id.
        players: BTreeMap<PlayerId, Player>,
    },
    /// Who has asked for a rematch so far.
    RematchStatus {
        /// Consent per player.
        consents: BTreeMap<PlayerId, bool>,
    },
    /// Everyone agreed; the rematch lives at `matchId`.
    NewMatch {
        /// The new match.
        #[serde(rename = "matchId")]
        match_id: MatchId,
    },
    /// The opponent left; go back to the landing page.
    GoHome,
}

/// A projection in either mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum GameView {
    /// Cooperative projection.
    Coop(CoopView),
    /// Race projection.
    Race(RaceView),
}

impl From<CoopView> for GameView {
    fn from(view: CoopView) -> Self {
        Self::Coop(view)
    }
}

impl From<RaceView> for GameView {
    fn from(view: RaceView) -> Self {
        Self::Race(view)
    }
}

/// Frames sent by the lobbies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LobbyMessage {
    /// A public pairing was made; connect to the match.
    Join {
        /// The match to connect to.
        #[serde(rename = "matchId")]
        match_id: MatchId,
        /// Its mode.
        mode: GameMode,
    },
    /// A private match was created.
    Ready {
        /// The match to share.
        #[serde(rename = "matchId")]
        match_id: MatchId,
        /// Its mode.
        mode: GameMode,
    },
}

/// Body of `POST /private/{mode}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateMatchRequest {
    /// Time budget for the new match.
    #[serde(default)]
    pub time_to_guess: TimeToGuess,
}
