//! Stats store errors.

use derive_more::{Display, Error};

/// Which part of the store failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DbErrorKind {
    /// The store was misconfigured.
    #[display("config")]
    Config,
    /// The database file could not be opened.
    #[display("connection")]
    Connection,
    /// A schema migration failed.
    #[display("migration")]
    Migration,
    /// A query failed.
    #[display("query")]
    Query,
    /// A stored value did not parse.
    #[display("corrupt row")]
    CorruptRow,
}

/// Stats store error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Stats store {} error: {} at {}:{}", kind, message, file, line)]
pub struct DbError {
    /// What failed.
    pub kind: DbErrorKind,
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl DbError {
    /// Creates an error of `kind` with caller location tracking.
    #[track_caller]
    pub fn new(kind: DbErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<diesel::result::Error> for DbError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        Self::new(DbErrorKind::Query, err.to_string())
    }
}

impl From<diesel::ConnectionError> for DbError {
    #[track_caller]
    fn from(err: diesel::ConnectionError) -> Self {
        Self::new(DbErrorKind::Connection, err.to_string())
    }
}
