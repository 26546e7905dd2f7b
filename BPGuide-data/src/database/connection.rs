//! Database connection module for the BPGuide application
//!
//! SQLite is the only supported backend. The pool is an explicit value built
//! once at startup and handed to the repositories; nothing here is global.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::DatabaseError;

#[cfg(feature = "sqlite")]
use r2d2_sqlite::SqliteConnectionManager;

/// Supported database types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    /// SQLite database (file-based)
    Sqlite,
}

impl DatabaseType {
    /// Convert from string to database type
    pub fn parse(s: &str) -> Result<Self, DatabaseError> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(DatabaseType::Sqlite),
            _ => Err(DatabaseError::Unsupported(s.to_string())),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database type
    pub db_type: DatabaseType,
    /// Path to SQLite database file
    pub sqlite_path: PathBuf,
    /// Maximum number of pooled connections
    pub max_connections: u32,
    /// Connection checkout timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: DatabaseType::Sqlite,
            sqlite_path: PathBuf::from("data/bp_guide.db"),
            max_connections: 10,
            timeout_seconds: 30,
        }
    }
}

impl DatabaseConfig {
    /// Create a new database configuration from environment variables
    pub fn from_env() -> Result<Self, DatabaseError> {
        let defaults = Self::default();

        let db_type = match env::var("DB_TYPE") {
            Ok(value) => DatabaseType::parse(&value)?,
            Err(_) => defaults.db_type,
        };

        let sqlite_path = match env::var("DB_SQLITE_PATH") {
            Ok(path) => PathBuf::from(path),
            Err(_) => {
                let data_dir = env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());
                PathBuf::from(data_dir).join("bp_guide.db")
            }
        };

        let max_connections = parse_env("DB_MAX_CONNECTIONS", defaults.max_connections)?;
        let timeout_seconds = parse_env("DB_TIMEOUT_SECONDS", defaults.timeout_seconds)?;

        info!(
            "Database configuration: path={}, max_connections={}, timeout={}s",
            sqlite_path.display(),
            max_connections,
            timeout_seconds
        );

        Ok(DatabaseConfig {
            db_type,
            sqlite_path,
            max_connections,
            timeout_seconds,
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, DatabaseError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| DatabaseError::Config(format!("{} has invalid value '{}'", key, raw))),
        Err(_) => Ok(default),
    }
}

/// Shared SQLite connection pool
#[cfg(feature = "sqlite")]
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: Arc<r2d2::Pool<SqliteConnectionManager>>,
    location: String,
}

#[cfg(feature = "sqlite")]
impl DatabasePool {
    /// Open (creating if needed) the SQLite file from `config` and run migrations
    pub fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        info!("Initializing SQLite database at: {}", config.sqlite_path.display());

        ensure_parent_dir(&config.sqlite_path)?;

        let manager = SqliteConnectionManager::file(&config.sqlite_path)
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));

        let pool = r2d2::Pool::builder()
            .max_size(config.max_connections)
            .connection_timeout(Duration::from_secs(config.timeout_seconds))
            .build(manager)?;

        let pool = Self {
            pool: Arc::new(pool),
            location: config.sqlite_path.display().to_string(),
        };
        pool.migrate()?;

        info!("SQLite connection pool created successfully");
        Ok(pool)
    }

    /// In-memory database on a single shared connection
    ///
    /// Every `:memory:` connection is its own database, so the pool is capped at one.
    pub fn in_memory() -> Result<Self, DatabaseError> {
        info!("Initializing in-memory SQLite database");

        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));

        let pool = r2d2::Pool::builder()
            .max_size(1)
            .connection_timeout(Duration::from_secs(5))
            .build(manager)?;

        let pool = Self {
            pool: Arc::new(pool),
            location: ":memory:".to_string(),
        };
        pool.migrate()?;
        Ok(pool)
    }

    /// Check out a connection
    pub fn get(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>, DatabaseError> {
        Ok(self.pool.get()?)
    }

    /// Human readable connection summary for health reporting
    pub fn connection_info(&self) -> String {
        let state = self.pool.state();
        let location = if self.location == ":memory:" {
            "SQLite in-memory database".to_string()
        } else {
            format!("SQLite database at {}", self.location)
        };
        format!(
            "{} (connections: active={}, idle={})",
            location, state.connections, state.idle_connections
        )
    }

    /// Run a trivial query to confirm the database answers
    pub fn ping(&self) -> Result<(), DatabaseError> {
        let conn = self.get()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        let conn = self.get()?;
        super::migrations::run_sqlite_migrations(&conn).map_err(DatabaseError::Migration)
    }
}

fn ensure_parent_dir(path: &Path) -> Result<(), DatabaseError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            info!("Creating parent directory: {:?}", parent);
            std::fs::create_dir_all(parent).map_err(|e| {
                warn!("Failed to create directory {:?}: {}", parent, e);
                DatabaseError::Storage(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
    }
    Ok(())
}
