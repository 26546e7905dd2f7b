// Schema migrations, one module per backend
#[cfg(feature = "sqlite")]
mod sqlite;
#[cfg(feature = "sqlite")]
pub use sqlite::run_migrations as run_sqlite_migrations;
