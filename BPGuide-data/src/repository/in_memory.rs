use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::models::blood_pressure::{NewReading, ReadingRecord, VisitUpdate};
use crate::models::user::{NewUser, UserRecord};
use super::blood_pressure::{next_recorded_at, ReadingRepositoryTrait};
use super::errors::RepositoryError;
use super::user::UserRepositoryTrait;
use super::ReadingStore;

#[derive(Debug, Default)]
struct InMemoryState {
    users: HashMap<i64, UserRecord>,
    readings: HashMap<i64, Vec<ReadingRecord>>,
    next_reading_id: i64,
}

impl InMemoryState {
    /// Append a reading; the caller holds the lock for the whole operation
    fn append(&mut self, user_id: i64, reading: NewReading) -> ReadingRecord {
        self.next_reading_id += 1;
        let history = self.readings.entry(user_id).or_default();
        let recorded_at = next_recorded_at(history.last().map(|r| r.recorded_at), Utc::now());

        let record = ReadingRecord {
            id: self.next_reading_id,
            user_id,
            systolic: reading.systolic,
            diastolic: reading.diastolic,
            recorded_at,
        };
        history.push(record.clone());
        record
    }
}

/// In-memory store used by tests and when the database cannot be opened
///
/// Clones share the same underlying state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryRepository {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepositoryTrait for InMemoryRepository {
    async fn get_user(&self, user_id: i64) -> Result<Option<UserRecord>, RepositoryError> {
        let state = self.state.lock()?;
        Ok(state.users.get(&user_id).cloned())
    }

    async fn user_exists(&self, user_id: i64) -> Result<bool, RepositoryError> {
        let state = self.state.lock()?;
        Ok(state.users.contains_key(&user_id))
    }

    async fn register_user(
        &self,
        user: NewUser,
        first_reading: NewReading,
    ) -> Result<(UserRecord, ReadingRecord), RepositoryError> {
        let mut state = self.state.lock()?;
        if state.users.contains_key(&user.user_id) {
            return Err(RepositoryError::Conflict(format!(
                "user {} is already registered",
                user.user_id
            )));
        }

        let now = Utc::now();
        let record = UserRecord {
            user_id: user.user_id,
            name: user.name,
            age: user.age,
            gender: user.gender,
            language: user.language,
            problem: user.problem,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(record.user_id, record.clone());
        let reading = state.append(record.user_id, first_reading);

        debug!("Registered user {} in memory", record.user_id);
        Ok((record, reading))
    }
}

#[async_trait]
impl ReadingRepositoryTrait for InMemoryRepository {
    async fn insert_reading(
        &self,
        user_id: i64,
        reading: NewReading,
    ) -> Result<ReadingRecord, RepositoryError> {
        let mut state = self.state.lock()?;
        if !state.users.contains_key(&user_id) {
            return Err(RepositoryError::NotFound(format!("user {}", user_id)));
        }
        Ok(state.append(user_id, reading))
    }

    async fn list_readings(&self, user_id: i64) -> Result<Vec<ReadingRecord>, RepositoryError> {
        let state = self.state.lock()?;
        Ok(state.readings.get(&user_id).cloned().unwrap_or_default())
    }

    async fn record_visit(&self, visit: VisitUpdate) -> Result<ReadingRecord, RepositoryError> {
        let mut state = self.state.lock()?;
        let user = state
            .users
            .get_mut(&visit.user_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("user {}", visit.user_id)))?;

        if let Some(language) = visit.language {
            user.language = language;
        }
        if let Some(problem) = visit.problem {
            user.problem = problem;
        }
        user.updated_at = Utc::now();

        Ok(state.append(visit.user_id, visit.reading))
    }
}

#[async_trait]
impl ReadingStore for InMemoryRepository {
    async fn status(&self) -> Result<String, RepositoryError> {
        let state = self.state.lock()?;
        Ok(format!("In-memory store ({} users)", state.users.len()))
    }
}
