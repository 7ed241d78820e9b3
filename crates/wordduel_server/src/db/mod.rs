//! Database persistence layer for per-player match results.

mod error;
mod models;
mod repository;
mod schema; // Diesel generated schema - internal use only

pub use error::{DbError, DbErrorKind};
pub use models::{AggregatedStats, MatchResultRow, NewMatchResult};
pub use repository::{MIGRATIONS, StatsRepository};
