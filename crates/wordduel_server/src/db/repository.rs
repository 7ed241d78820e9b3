//! Database repository for match results.

use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info, instrument, warn};
use wordduel::GameMode;

use crate::db::{AggregatedStats, DbError, DbErrorKind, MatchResultRow, NewMatchResult, schema};

/// Schema migrations compiled into the binary.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Database repository for result operations.
#[derive(Debug, Clone)]
pub struct StatsRepository {
    db_path: String,
}

impl StatsRepository {
    /// Creates a new repository for the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the path is empty.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn new(db_path: String) -> Result<Self, DbError> {
        if db_path.trim().is_empty() {
            return Err(DbError::new(DbErrorKind::Config, "Database path is empty"));
        }
        info!(path = %db_path, "Creating StatsRepository");
        Ok(Self { db_path })
    }

    /// Establishes a database connection.
    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, DbError> {
        debug!(path = %self.db_path, "Establishing connection");
        SqliteConnection::establish(&self.db_path)
            .map_err(|e| DbError::new(DbErrorKind::Connection, format!("Failed to connect to '{}': {}", self.db_path, e)))
    }

    /// Applies any pending schema migrations. Returns how many ran.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a migration fails.
    #[instrument(skip(self))]
    pub fn run_migrations(&self) -> Result<usize, DbError> {
        let mut conn = self.connection()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| DbError::new(DbErrorKind::Migration, format!("Migration failed: {}", e)))?;
        info!(count = applied.len(), "Migrations applied");
        Ok(applied.len())
    }

    /// Records one player's result.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self, result), fields(player_id = %result.player_id(), mode = %result.mode(), outcome = %result.outcome()))]
    pub fn record_result(&self, result: NewMatchResult) -> Result<MatchResultRow, DbError> {
        debug!("Recording match result");
        let mut conn = self.connection()?;

        let row = diesel::insert_into(schema::match_results::table)
            .values(&result)
            .returning(MatchResultRow::as_returning())
            .get_result(&mut conn)?;

        info!(
            row_id = row.id(),
            player_id = %row.player_id(),
            outcome = %row.outcome(),
            "Match result recorded"
        );
        Ok(row)
    }

    /// Gets a player's most recent results, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_history(&self, player_id: &str, limit: i64) -> Result<Vec<MatchResultRow>, DbError> {
        debug!("Loading match history");
        let mut conn = self.connection()?;

        let rows = schema::match_results::table
            .filter(schema::match_results::player_id.eq(player_id))
            .order((
                schema::match_results::recorded_at.desc(),
                schema::match_results::id.desc(),
            ))
            .limit(limit)
            .load::<MatchResultRow>(&mut conn)?;

        info!(count = rows.len(), "Match history loaded");
        Ok(rows)
    }

    /// Gets win/loss totals for a player, optionally restricted to one mode.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_aggregated_stats(
        &self,
        player_id: &str,
        mode: Option<GameMode>,
    ) -> Result<AggregatedStats, DbError> {
        debug!("Computing aggregated stats");
        let mut conn = self.connection()?;

        let mut query = schema::match_results::table
            .filter(schema::match_results::player_id.eq(player_id))
            .into_boxed();
        if let Some(mode) = mode {
            query = query.filter(schema::match_results::mode.eq(mode.to_string()));
        }
        let rows = query.load::<MatchResultRow>(&mut conn)?;

        let mut wins = 0;
        let mut losses = 0;

        for row in &rows {
            match row.outcome().as_str() {
                "win" => wins += 1,
                "loss" => losses += 1,
                other => warn!(outcome = %other, row_id = row.id(), "Unknown outcome value"),
            }
        }

        let aggregated = AggregatedStats::new(wins + losses, wins, losses);

        info!(
            total = %aggregated.total_games(),
            wins = %wins,
            losses = %losses,
            win_rate = %format!("{:.1}%", aggregated.win_rate()),
            "Aggregated stats computed"
        );

        Ok(aggregated)
    }
}
