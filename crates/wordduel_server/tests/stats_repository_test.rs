//! Tests for match result persistence.

use tempfile::NamedTempFile;
use wordduel::{GameMode, MatchResult};
use wordduel_server::{DbErrorKind, NewMatchResult, StatsRepository, StatsService, StatsStore};

/// Creates a temporary database file with schema applied, returns the file
/// handle (must stay in scope to keep the file alive) and a ready repository.
fn setup_test_db() -> (NamedTempFile, StatsRepository) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();

    let repo = StatsRepository::new(db_path).expect("Failed to create repository");
    repo.run_migrations().expect("Migrations failed");
    (db_file, repo)
}

fn record(repo: &StatsRepository, player_id: &str, mode: GameMode, outcome: MatchResult) {
    repo.record_result(NewMatchResult::from_domain(player_id, mode, outcome))
        .expect("Record failed");
}

#[test]
fn test_empty_path_rejected() {
    let err = StatsRepository::new("  ".to_string()).expect_err("Blank path accepted");
    assert_eq!(err.kind, DbErrorKind::Config);
}

#[test]
fn test_migrations_are_idempotent() {
    let (_db, repo) = setup_test_db();
    assert_eq!(repo.run_migrations().expect("Second run failed"), 0);
}

#[test]
fn test_record_result_returns_row() {
    let (_db, repo) = setup_test_db();
    let row = repo
        .record_result(NewMatchResult::from_domain("alice", GameMode::Race, MatchResult::Win))
        .expect("Record failed");

    assert!(*row.id() > 0);
    assert_eq!(row.player_id(), "alice");
    assert_eq!(row.parse_mode().expect("Mode"), GameMode::Race);
    assert_eq!(row.parse_outcome().expect("Outcome"), MatchResult::Win);
}

#[test]
fn test_stats_for_unknown_player_are_zero() {
    let (_db, repo) = setup_test_db();
    let stats = repo.get_aggregated_stats("nobody", None).expect("Query failed");

    assert_eq!(*stats.total_games(), 0);
    assert_eq!(*stats.wins(), 0);
    assert_eq!(*stats.losses(), 0);
    assert_eq!(stats.win_rate(), 0.0);
}

#[test]
fn test_stats_aggregate_per_mode() {
    let (_db, repo) = setup_test_db();
    record(&repo, "alice", GameMode::Coop, MatchResult::Win);
    record(&repo, "alice", GameMode::Coop, MatchResult::Loss);
    record(&repo, "alice", GameMode::Race, MatchResult::Win);
    record(&repo, "bob", GameMode::Race, MatchResult::Loss);

    let all = repo.get_aggregated_stats("alice", None).expect("Query failed");
    assert_eq!(*all.total_games(), 3);
    assert_eq!(*all.wins(), 2);
    assert_eq!(*all.losses(), 1);

    let coop = repo
        .get_aggregated_stats("alice", Some(GameMode::Coop))
        .expect("Query failed");
    assert_eq!(*coop.total_games(), 2);
    assert_eq!(*coop.wins(), 1);
    assert_eq!(coop.win_rate(), 50.0);

    let race = repo
        .get_aggregated_stats("alice", Some(GameMode::Race))
        .expect("Query failed");
    assert_eq!(*race.total_games(), 1);
    assert_eq!(*race.losses(), 0);
}

#[test]
fn test_history_newest_first_and_limited() {
    let (_db, repo) = setup_test_db();
    record(&repo, "alice", GameMode::Coop, MatchResult::Win);
    record(&repo, "alice", GameMode::Race, MatchResult::Loss);
    record(&repo, "alice", GameMode::Race, MatchResult::Win);
    record(&repo, "bob", GameMode::Coop, MatchResult::Win);

    let history = repo.get_history("alice", 2).expect("Query failed");
    assert_eq!(history.len(), 2);
    assert!(history[0].id() > history[1].id());
    assert_eq!(history[0].outcome(), "win");
    assert_eq!(history[1].outcome(), "loss");
    assert!(history.iter().all(|row| row.player_id() == "alice"));
}

#[test]
fn test_service_records_through_store() {
    let (_db, repo) = setup_test_db();
    let service = StatsService::new(repo);

    service
        .record("carol", GameMode::Coop, MatchResult::Loss)
        .expect("Record failed");

    let stats = service.get_stats("carol", Some(GameMode::Coop)).expect("Query failed");
    assert_eq!(*stats.total_games(), 1);
    assert_eq!(*stats.losses(), 1);
    assert_eq!(service.get_history("carol", 10).expect("History").len(), 1);
}
