use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use tracing::{debug, warn};

use crate::database::DatabasePool;
use crate::models::blood_pressure::{NewReading, ReadingRecord, VisitUpdate};
use crate::models::user::{NewUser, StoredGender, UserRecord};
use super::blood_pressure::{next_recorded_at, ReadingRepositoryTrait};
use super::errors::RepositoryError;
use super::user::UserRepositoryTrait;
use super::ReadingStore;

/// SQLite-backed store
///
/// rusqlite is synchronous, so every operation runs on the blocking pool.
#[derive(Debug, Clone)]
pub struct SqliteRepository {
    pool: DatabasePool,
}

impl SqliteRepository {
    /// Create a repository over an initialized pool
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn with_connection<T, F>(&self, op: F) -> Result<T, RepositoryError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, RepositoryError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(RepositoryError::from)?;
            op(&mut conn)
        })
        .await
        .map_err(|e| RepositoryError::Task(e.to_string()))?
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    let gender: String = row.get(3)?;
    let gender = StoredGender::parse(&gender).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            Type::Text,
            format!("unknown gender '{}'", gender).into(),
        )
    })?;
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;

    Ok(UserRecord {
        user_id: row.get(0)?,
        name: row.get(1)?,
        age: row.get(2)?,
        gender,
        language: row.get(4)?,
        problem: row.get(5)?,
        created_at: parse_timestamp(6, &created_at)?,
        updated_at: parse_timestamp(7, &updated_at)?,
    })
}

fn row_to_reading(row: &Row<'_>) -> rusqlite::Result<ReadingRecord> {
    let recorded_at: String = row.get(4)?;
    Ok(ReadingRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        systolic: row.get(2)?,
        diastolic: row.get(3)?,
        recorded_at: parse_timestamp(4, &recorded_at)?,
    })
}

const SELECT_USER: &str = "SELECT user_id, name, age, gender, language, problem, created_at, updated_at
     FROM users WHERE user_id = ?1";

fn user_exists(conn: &Connection, user_id: i64) -> Result<bool, RepositoryError> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM users WHERE user_id = ?1", params![user_id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

/// Append a reading inside an open transaction
fn append_reading(
    tx: &Transaction<'_>,
    user_id: i64,
    reading: NewReading,
) -> Result<ReadingRecord, RepositoryError> {
    let latest: Option<String> = tx.query_row(
        "SELECT MAX(recorded_at) FROM bp_readings WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;
    let latest = latest.map(|raw| parse_timestamp(0, &raw)).transpose()?;
    let recorded_at = next_recorded_at(latest, Utc::now());

    tx.execute(
        "INSERT INTO bp_readings (user_id, systolic, diastolic, recorded_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![user_id, reading.systolic, reading.diastolic, format_timestamp(&recorded_at)],
    )?;

    Ok(ReadingRecord {
        id: tx.last_insert_rowid(),
        user_id,
        systolic: reading.systolic,
        diastolic: reading.diastolic,
        recorded_at,
    })
}

/// Commit on success, roll back on error
fn finish<T>(tx: Transaction<'_>, result: Result<T, RepositoryError>) -> Result<T, RepositoryError> {
    match result {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback() {
                warn!("Failed to roll back transaction: {}", rollback_err);
            }
            Err(e)
        }
    }
}

#[async_trait]
impl UserRepositoryTrait for SqliteRepository {
    async fn get_user(&self, user_id: i64) -> Result<Option<UserRecord>, RepositoryError> {
        debug!("Loading user {} from database", user_id);
        self.with_connection(move |conn| {
            Ok(conn.query_row(SELECT_USER, params![user_id], row_to_user).optional()?)
        })
        .await
    }

    async fn user_exists(&self, user_id: i64) -> Result<bool, RepositoryError> {
        self.with_connection(move |conn| user_exists(conn, user_id)).await
    }

    async fn register_user(
        &self,
        user: NewUser,
        first_reading: NewReading,
    ) -> Result<(UserRecord, ReadingRecord), RepositoryError> {
        debug!("Registering user {} in database", user.user_id);
        self.with_connection(move |conn| {
            let tx = conn.transaction()?;
            let result = (|| {
                if user_exists(&tx, user.user_id)? {
                    return Err(RepositoryError::Conflict(format!(
                        "user {} is already registered",
                        user.user_id
                    )));
                }

                let now = Utc::now();
                let stamp = format_timestamp(&now);
                tx.execute(
                    "INSERT INTO users (user_id, name, age, gender, language, problem, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                    params![
                        user.user_id,
                        user.name,
                        user.age,
                        user.gender.as_str(),
                        user.language,
                        user.problem,
                        stamp
                    ],
                )?;

                let record = tx.query_row(SELECT_USER, params![user.user_id], row_to_user)?;
                let reading = append_reading(&tx, user.user_id, first_reading)?;
                Ok((record, reading))
            })();
            finish(tx, result)
        })
        .await
    }
}

#[async_trait]
impl ReadingRepositoryTrait for SqliteRepository {
    async fn insert_reading(
        &self,
        user_id: i64,
        reading: NewReading,
    ) -> Result<ReadingRecord, RepositoryError> {
        debug!("Storing blood pressure reading for user {}", user_id);
        self.with_connection(move |conn| {
            let tx = conn.transaction()?;
            let result = if user_exists(&tx, user_id)? {
                append_reading(&tx, user_id, reading)
            } else {
                Err(RepositoryError::NotFound(format!("user {}", user_id)))
            };
            finish(tx, result)
        })
        .await
    }

    async fn list_readings(&self, user_id: i64) -> Result<Vec<ReadingRecord>, RepositoryError> {
        debug!("Listing readings for user {}", user_id);
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, systolic, diastolic, recorded_at
                 FROM bp_readings WHERE user_id = ?1
                 ORDER BY recorded_at ASC, id ASC",
            )?;
            let rows = stmt.query_map(params![user_id], row_to_reading)?;
            let mut readings = Vec::new();
            for row in rows {
                readings.push(row?);
            }
            Ok(readings)
        })
        .await
    }

    async fn record_visit(&self, visit: VisitUpdate) -> Result<ReadingRecord, RepositoryError> {
        debug!("Recording visit for user {}", visit.user_id);
        self.with_connection(move |conn| {
            let tx = conn.transaction()?;
            let result = (|| {
                let updated = tx.execute(
                    "UPDATE users
                     SET language = COALESCE(?2, language),
                         problem = COALESCE(?3, problem),
                         updated_at = ?4
                     WHERE user_id = ?1",
                    params![
                        visit.user_id,
                        visit.language,
                        visit.problem,
                        format_timestamp(&Utc::now())
                    ],
                )?;
                if updated == 0 {
                    return Err(RepositoryError::NotFound(format!("user {}", visit.user_id)));
                }
                append_reading(&tx, visit.user_id, visit.reading)
            })();
            finish(tx, result)
        })
        .await
    }
}

#[async_trait]
impl ReadingStore for SqliteRepository {
    async fn status(&self) -> Result<String, RepositoryError> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            pool.ping()?;
            Ok::<_, RepositoryError>(pool.connection_info())
        })
        .await
        .map_err(|e| RepositoryError::Task(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repository() -> SqliteRepository {
        SqliteRepository::new(DatabasePool::in_memory().unwrap())
    }

    fn new_user(user_id: i64) -> NewUser {
        NewUser {
            user_id,
            name: "Test User".to_string(),
            age: 45,
            gender: StoredGender::Female,
            language: "English".to_string(),
            problem: "none".to_string(),
        }
    }

    fn reading(systolic: u16, diastolic: u16) -> NewReading {
        NewReading { systolic, diastolic }
    }

    #[tokio::test]
    async fn test_register_user_round_trip() {
        let repo = repository();
        let (user, first) = repo.register_user(new_user(1234), reading(120, 80)).await.unwrap();

        assert_eq!(user.gender, StoredGender::Female);
        assert_eq!(first.systolic, 120);

        let loaded = repo.get_user(1234).await.unwrap().unwrap();
        assert_eq!(loaded, user);
        assert!(repo.get_user(4321).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_registration_rolls_back() {
        let repo = repository();
        repo.register_user(new_user(1234), reading(120, 80)).await.unwrap();

        let err = repo.register_user(new_user(1234), reading(140, 90)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let history = repo.list_readings(1234).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].systolic, 120);
    }

    #[tokio::test]
    async fn test_history_is_ascending() {
        let repo = repository();
        repo.register_user(new_user(1234), reading(120, 80)).await.unwrap();
        repo.insert_reading(1234, reading(130, 85)).await.unwrap();
        repo.insert_reading(1234, reading(140, 90)).await.unwrap();

        let history = repo.list_readings(1234).await.unwrap();
        let systolic: Vec<u16> = history.iter().map(|r| r.systolic).collect();
        assert_eq!(systolic, vec![120, 130, 140]);
        assert!(history.windows(2).all(|w| w[0].recorded_at < w[1].recorded_at));
    }

    #[tokio::test]
    async fn test_record_visit_is_atomic() {
        let repo = repository();

        let missing = VisitUpdate {
            user_id: 9999,
            language: Some("French".to_string()),
            problem: None,
            reading: reading(120, 80),
        };
        let err = repo.record_visit(missing).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
        assert!(repo.list_readings(9999).await.unwrap().is_empty());

        repo.register_user(new_user(1234), reading(120, 80)).await.unwrap();
        let visit = VisitUpdate {
            user_id: 1234,
            language: Some("French".to_string()),
            problem: None,
            reading: reading(150, 95),
        };
        repo.record_visit(visit).await.unwrap();

        let user = repo.get_user(1234).await.unwrap().unwrap();
        assert_eq!(user.language, "French");
        assert_eq!(user.problem, "none");
        assert_eq!(repo.list_readings(1234).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_deleting_user_cascades_to_readings() {
        let repo = repository();
        repo.register_user(new_user(1234), reading(120, 80)).await.unwrap();

        repo.with_connection(|conn| {
            conn.execute("DELETE FROM users WHERE user_id = 1234", [])?;
            Ok(())
        })
        .await
        .unwrap();

        assert!(repo.list_readings(1234).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_status_reports_location() {
        let repo = repository();
        let status = repo.status().await.unwrap();
        assert!(status.contains("in-memory"));
    }
}
