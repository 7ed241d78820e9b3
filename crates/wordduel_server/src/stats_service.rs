//! Result recording business logic layer.

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use wordduel::{GameMode, GameOver, MatchResult, Player, PlayerId};

use crate::{AggregatedStats, DbError, MatchResultRow, NewMatchResult, StatsRepository};

/// Anything that can persist one player's result.
///
/// Implementations may block; hosts call them off the async runtime.
pub trait StatsStore: Send + Sync {
    /// Persists `result` for `player_id` in `mode`.
    fn record(&self, player_id: &str, mode: GameMode, result: MatchResult) -> Result<(), DbError>;
}

/// Service layer over [`StatsRepository`].
#[derive(Debug, Clone)]
pub struct StatsService {
    repository: StatsRepository,
}

impl StatsService {
    /// Creates a new stats service backed by the given repository.
    #[instrument(skip(repository))]
    pub fn new(repository: StatsRepository) -> Self {
        info!("Creating StatsService");
        Self { repository }
    }

    /// Returns the underlying repository.
    pub fn repository(&self) -> &StatsRepository {
        &self.repository
    }

    /// Returns aggregated win/loss totals for a player.
    #[instrument(skip(self))]
    pub fn get_stats(&self, player_id: &str, mode: Option<GameMode>) -> Result<AggregatedStats, DbError> {
        debug!("Getting aggregated stats");
        self.repository.get_aggregated_stats(player_id, mode)
    }

    /// Returns a player's most recent results, newest first.
    #[instrument(skip(self))]
    pub fn get_history(&self, player_id: &str, limit: i64) -> Result<Vec<MatchResultRow>, DbError> {
        debug!("Getting match history");
        self.repository.get_history(player_id, limit)
    }
}

impl StatsStore for StatsService {
    #[instrument(skip(self))]
    fn record(&self, player_id: &str, mode: GameMode, result: MatchResult) -> Result<(), DbError> {
        let row = self
            .repository
            .record_result(NewMatchResult::from_domain(player_id, mode, result))?;
        info!(row_id = row.id(), "Result recorded");
        Ok(())
    }
}

/// The results worth persisting: attributable ones for verified players.
pub fn verified_results(over: &GameOver, roster: &[Player]) -> Vec<(PlayerId, MatchResult)> {
    over.results(roster)
        .into_iter()
        .filter(|(player, _)| player.is_verified())
        .map(|(player, result)| (player.id().clone(), result))
        .collect()
}

/// Writes `results` on the blocking pool without waiting for completion.
///
/// Failures are logged and otherwise ignored.
#[instrument(skip(store, results), fields(count = results.len()))]
pub fn spawn_record(store: Arc<dyn StatsStore>, mode: GameMode, results: Vec<(PlayerId, MatchResult)>) {
    if results.is_empty() {
        debug!("No verified results to record");
        return;
    }

    tokio::task::spawn_blocking(move || {
        for (player_id, result) in results {
            if let Err(e) = store.record(&player_id, mode, result) {
                warn!(player_id = %player_id, error = %e, "Failed to record result");
            }
        }
    });
}
