//! Word Duel - server CLI

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;
use wordduel::{GameMode, IdentityClass};
use wordduel_server::{
    AppState, HostServices, MatchRegistry, Presence, ServerConfig, SolutionSource, StatsRepository,
    StatsService, TokenIssuer, WordList, router,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { config, port, host } => run_server(config, host, port).await,
        Command::Stats {
            player_id,
            mode,
            db,
            history,
        } => show_stats(&player_id, mode, db, history),
        Command::Migrate { db } => migrate(db),
        Command::IssueToken { player_id, config } => issue_token(&player_id, config),
    }
}

/// Run the HTTP and WebSocket server
#[instrument]
async fn run_server(config_path: Option<PathBuf>, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = ServerConfig::load(config_path.as_deref())?;
    if let Some(host) = host {
        config = config.with_host(host);
    }
    if let Some(port) = port {
        config = config.with_port(port);
    }
    config.validate()?;

    let repository = StatsRepository::new(config.database_path().clone())?;
    let applied = repository.run_migrations()?;
    info!(applied, "Database ready");
    let stats = StatsService::new(repository);

    let mut words = WordList::bundled();
    if let Some(path) = config.word_list() {
        words.extend(WordList::from_file(path)?);
    }
    info!(words = words.len(), "Dictionary loaded");
    let solutions = SolutionSource::bundled()?;

    let presence = Presence::new();
    let services = HostServices::new(Arc::new(words), Arc::new(stats.clone()), presence.clone());
    let registry = MatchRegistry::new(services, Arc::new(solutions), config.match_defaults());
    let tokens = TokenIssuer::new(config.jwt_secret().as_bytes());

    let app = router(AppState::new(registry, presence, tokens, stats));

    let listener = tokio::net::TcpListener::bind((config.host().as_str(), *config.port())).await?;
    info!(address = %listener.local_addr()?, "Server ready");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Print a player's totals and recent results
#[instrument]
fn show_stats(player_id: &str, mode: Option<GameMode>, db: String, history: i64) -> Result<()> {
    let repository = StatsRepository::new(db)?;
    repository.run_migrations()?;
    let service = StatsService::new(repository);

    let totals = service.get_stats(player_id, mode)?;
    println!(
        "{}: {} games, {} wins, {} losses ({:.0}% won)",
        player_id,
        totals.total_games(),
        totals.wins(),
        totals.losses(),
        totals.win_rate()
    );

    for row in service.get_history(player_id, history)? {
        println!("  {}  {:<5} {}", row.recorded_at(), row.mode(), row.outcome());
    }
    Ok(())
}

/// Apply pending migrations
#[instrument]
fn migrate(db: String) -> Result<()> {
    let applied = StatsRepository::new(db)?.run_migrations()?;
    println!("Applied {} migration(s)", applied);
    Ok(())
}

/// Print a verified token for `player_id`
#[instrument]
fn issue_token(player_id: &str, config_path: Option<PathBuf>) -> Result<()> {
    let config = ServerConfig::load(config_path.as_deref())?;
    config.validate()?;
    let token = TokenIssuer::new(config.jwt_secret().as_bytes()).issue_for(player_id, IdentityClass::Verified)?;
    println!("{}", token);
    Ok(())
}
