//! Database models and domain types.

use chrono::NaiveDateTime;
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use serde::Serialize;
use tracing::instrument;
use wordduel::{GameMode, MatchResult};

use crate::db::{DbError, DbErrorKind, schema};

/// One player's result in one finished match.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::match_results)]
pub struct MatchResultRow {
    id: i32,
    player_id: String,
    mode: String,
    outcome: String,
    recorded_at: NaiveDateTime,
}

impl MatchResultRow {
    /// Parses the stored outcome string.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the column holds an unknown value.
    #[instrument(skip(self), fields(outcome = %self.outcome))]
    pub fn parse_outcome(&self) -> Result<MatchResult, DbError> {
        self.outcome
            .parse()
            .map_err(|_| DbError::new(DbErrorKind::CorruptRow, format!("Invalid outcome: '{}'", self.outcome)))
    }

    /// Parses the stored mode string.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the column holds an unknown value.
    #[instrument(skip(self), fields(mode = %self.mode))]
    pub fn parse_mode(&self) -> Result<GameMode, DbError> {
        self.mode
            .parse()
            .map_err(|_| DbError::new(DbErrorKind::CorruptRow, format!("Invalid mode: '{}'", self.mode)))
    }
}

/// Insertable result row.
#[derive(Debug, Clone, Insertable, new, Getters)]
#[diesel(table_name = schema::match_results)]
pub struct NewMatchResult {
    player_id: String,
    mode: String,
    outcome: String,
}

impl NewMatchResult {
    /// Builds a row from domain values.
    pub fn from_domain(player_id: impl Into<String>, mode: GameMode, outcome: MatchResult) -> Self {
        Self::new(player_id.into(), mode.to_string(), outcome.to_string())
    }
}

/// Win/loss totals for a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Getters)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedStats {
    total_games: i32,
    wins: i32,
    losses: i32,
}

impl AggregatedStats {
    /// Creates new aggregated statistics.
    #[instrument]
    pub fn new(total_games: i32, wins: i32, losses: i32) -> Self {
        Self {
            total_games,
            wins,
            losses,
        }
    }

    /// Calculates win rate as a percentage (0.0–100.0).
    #[instrument(skip(self))]
    pub fn win_rate(&self) -> f64 {
        if self.total_games == 0 {
            0.0
        } else {
            (self.wins as f64 / self.total_games as f64) * 100.0
        }
    }
}
