use thiserror::Error;

// Pool setup and configuration
pub mod connection;
// Schema creation
pub mod migrations;

pub use connection::*;

/// Failures while configuring, opening or migrating the database
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An environment variable held an unusable value
    #[error("Database configuration error: {0}")]
    Config(String),

    /// `DB_TYPE` named a backend this build cannot open
    #[error("Unsupported database type: {0}")]
    Unsupported(String),

    /// The database file's directory could not be created
    #[error("Database storage error: {0}")]
    Storage(String),

    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Database migration failed: {0}")]
    Migration(String),
}
