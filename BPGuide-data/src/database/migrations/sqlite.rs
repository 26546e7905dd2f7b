use rusqlite::Connection;
use tracing::info;

/// Run SQLite migrations
pub fn run_migrations(conn: &Connection) -> Result<(), String> {
    info!("Running SQLite migrations");

    enable_foreign_keys(conn)?;
    create_users_table(conn)?;
    create_bp_readings_table(conn)?;
    create_bp_readings_index(conn)?;

    info!("SQLite migrations completed successfully");
    Ok(())
}

/// Readings cascade on user deletion only when foreign keys are enforced
fn enable_foreign_keys(conn: &Connection) -> Result<(), String> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|e| format!("Failed to enable foreign keys: {}", e))
}

/// Create the users table
fn create_users_table(conn: &Connection) -> Result<(), String> {
    info!("Creating users table if not exists");

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            user_id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            age INTEGER NOT NULL,
            gender TEXT NOT NULL CHECK (gender IN ('Male', 'Female', 'Other')),
            language TEXT NOT NULL,
            problem TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    ).map_err(|e| e.to_string())?;

    Ok(())
}

/// Create the blood pressure readings table
fn create_bp_readings_table(conn: &Connection) -> Result<(), String> {
    info!("Creating bp_readings table if not exists");

    conn.execute(
        "CREATE TABLE IF NOT EXISTS bp_readings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
            systolic INTEGER NOT NULL,
            diastolic INTEGER NOT NULL,
            recorded_at TEXT NOT NULL
        )",
        [],
    ).map_err(|e| e.to_string())?;

    Ok(())
}

/// Create index on (user_id, recorded_at) for history lookups
fn create_bp_readings_index(conn: &Connection) -> Result<(), String> {
    info!("Creating index on bp_readings(user_id, recorded_at)");

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_bp_readings_user_recorded
        ON bp_readings (user_id, recorded_at)",
        [],
    ).map_err(|e| format!("Failed to create index: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('users', 'bp_readings')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);
    }

    #[test]
    fn test_gender_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO users (user_id, name, age, gender, language, problem, created_at, updated_at)
             VALUES (1234, 'Test', 45, 'Unknown', 'English', '', '', '')",
            [],
        );
        assert!(result.is_err());
    }
}
