//! Word Duel server.
//!
//! Runs [`wordduel`] matches for players connected over WebSockets.
//!
//! # Architecture
//!
//! - **Host**: one actor task per match owns its session and serializes
//!   every client command and deadline
//! - **Registry**: finds live matches by mode and id and spawns new ones
//! - **Lobby**: pairs waiting players into fresh matches
//! - **Identity**: HS256 tokens that mark players anonymous or verified
//! - **Stats**: SQLite persistence of verified players' results
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use wordduel_server::{
//!     AppState, HostServices, MatchRegistry, Presence, ServerConfig, SolutionSource,
//!     StatsRepository, StatsService, TokenIssuer, WordList, router,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ServerConfig::default().with_jwt_secret("secret");
//! let repository = StatsRepository::new(config.database_path().clone())?;
//! repository.run_migrations()?;
//! let stats = StatsService::new(repository);
//!
//! let presence = Presence::new();
//! let services = HostServices::new(Arc::new(WordList::bundled()), Arc::new(stats.clone()), presence.clone());
//! let registry = MatchRegistry::new(services, Arc::new(SolutionSource::bundled()?), config.match_defaults());
//! let tokens = TokenIssuer::new(config.jwt_secret().as_bytes());
//!
//! let app = router(AppState::new(registry, presence, tokens, stats));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod db;
mod dictionary;
mod host;
mod identity;
mod lobby;
mod presence;
mod protocol;
mod registry;
mod server;
mod stats_service;

// Crate-level exports - Persistence
pub use db::{AggregatedStats, DbError, DbErrorKind, MIGRATIONS, MatchResultRow, NewMatchResult, StatsRepository};

// Crate-level exports - Configuration
pub use config::{ConfigError, MatchDefaults, ServerConfig};

// Crate-level exports - Identity
pub use identity::{Claims, Identity, IdentityError, TOKEN_ISSUER, TokenIssuer};

// Crate-level exports - Word lists
pub use dictionary::{Dictionary, DictionaryError, SolutionSource, WordList};

// Crate-level exports - Stats
pub use stats_service::{StatsService, StatsStore, spawn_record, verified_results};

// Crate-level exports - Wire protocol
pub use protocol::{ClientMessage, GameView, LobbyMessage, MatchId, PrivateMatchRequest, ServerMessage};

// Crate-level exports - Match hosting
pub use host::{ConnectionId, HostCommand, HostServices, MatchClosed, MatchHandle};
pub use lobby::Lobby;
pub use presence::Presence;
pub use registry::MatchRegistry;

// Crate-level exports - HTTP
pub use server::{AppState, ConnectParams, PlayerStats, StatsParams, router};
