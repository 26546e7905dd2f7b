use async_trait::async_trait;

use crate::models::blood_pressure::{NewReading, ReadingRecord};
use crate::models::user::{NewUser, UserRecord};
use super::errors::RepositoryError;

/// Repository trait for user profiles
#[async_trait]
pub trait UserRepositoryTrait: Send + Sync {
    /// Look up a user by identifier
    async fn get_user(&self, user_id: i64) -> Result<Option<UserRecord>, RepositoryError>;

    /// Whether the identifier is already registered
    async fn user_exists(&self, user_id: i64) -> Result<bool, RepositoryError>;

    /// Create the user and store their first reading in one transaction
    ///
    /// Fails with [`RepositoryError::Conflict`] when the identifier is taken.
    async fn register_user(
        &self,
        user: NewUser,
        first_reading: NewReading,
    ) -> Result<(UserRecord, ReadingRecord), RepositoryError>;
}
