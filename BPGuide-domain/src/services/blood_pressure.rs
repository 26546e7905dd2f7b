use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use validator::Validate;

use bp_guide_data::models::blood_pressure::VisitUpdate;
use bp_guide_data::repository::{ReadingStore, RepositoryError};

use crate::entities::blood_pressure::{BloodPressureInsights, BloodPressureReading, PressureValues};
use crate::entities::conversions;
use crate::entities::user::{RegisterUserRequest, User, VisitRequest};
use crate::services::describe_validation_errors;
use crate::services::insights::calculate_insights;

/// Errors raised by user and reading operations
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// No user with this id
    #[error("User {0} not found")]
    UserNotFound(i64),

    /// Registration for an id that is already taken
    #[error("User ID {0} is already registered")]
    UserExists(i64),

    /// Storage failure
    #[error("Repository error: {0}")]
    Repository(String),
}

impl ServiceError {
    fn from_repository(err: RepositoryError, user_id: i64) -> Self {
        match err {
            RepositoryError::NotFound(_) => ServiceError::UserNotFound(user_id),
            RepositoryError::Conflict(_) => ServiceError::UserExists(user_id),
            other => ServiceError::Repository(other.to_string()),
        }
    }
}

/// Result of a returning user's visit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitSummary {
    /// The reading stored by this visit
    pub reading: BloodPressureReading,

    /// Full ascending history, including the new reading
    pub history: Vec<BloodPressureReading>,

    /// Statistics over the history
    pub insights: BloodPressureInsights,
}

/// User registration, visits and history
#[async_trait]
pub trait BloodPressureServiceTrait: Send + Sync {
    /// True when no user holds this id yet
    async fn is_user_id_available(&self, user_id: i64) -> Result<bool, ServiceError>;

    /// Look up an existing user
    async fn verify_user(&self, user_id: i64) -> Result<User, ServiceError>;

    /// Create a user together with their first reading
    async fn register_user(
        &self,
        request: RegisterUserRequest,
        values: PressureValues,
    ) -> Result<(User, BloodPressureReading), ServiceError>;

    /// Update a returning user's profile and append a reading
    async fn record_visit(
        &self,
        visit: VisitRequest,
        values: PressureValues,
    ) -> Result<VisitSummary, ServiceError>;

    /// Ascending reading history of an existing user
    async fn get_history(&self, user_id: i64) -> Result<Vec<BloodPressureReading>, ServiceError>;
}

/// Service backed by a [`ReadingStore`]
pub struct BloodPressureService {
    store: Arc<dyn ReadingStore>,
}

impl BloodPressureService {
    /// Create a new service over the given store
    pub fn new(store: Arc<dyn ReadingStore>) -> Self {
        Self { store }
    }
}

fn validate<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input
        .validate()
        .map_err(|errors| ServiceError::Validation(describe_validation_errors(&errors)))
}

#[async_trait]
impl BloodPressureServiceTrait for BloodPressureService {
    async fn is_user_id_available(&self, user_id: i64) -> Result<bool, ServiceError> {
        let exists = self
            .store
            .user_exists(user_id)
            .await
            .map_err(|e| ServiceError::from_repository(e, user_id))?;
        Ok(!exists)
    }

    async fn verify_user(&self, user_id: i64) -> Result<User, ServiceError> {
        let record = self
            .store
            .get_user(user_id)
            .await
            .map_err(|e| ServiceError::from_repository(e, user_id))?
            .ok_or(ServiceError::UserNotFound(user_id))?;

        Ok(conversions::convert_to_domain_user(record))
    }

    async fn register_user(
        &self,
        request: RegisterUserRequest,
        values: PressureValues,
    ) -> Result<(User, BloodPressureReading), ServiceError> {
        validate(&request)?;
        validate(&values)?;

        let user_id = request.user_id;
        let (user, reading) = self
            .store
            .register_user(
                conversions::convert_to_data_new_user(&request),
                conversions::convert_to_data_new_reading(values),
            )
            .await
            .map_err(|e| ServiceError::from_repository(e, user_id))?;

        info!("Registered user {}", user_id);
        Ok((
            conversions::convert_to_domain_user(user),
            conversions::convert_to_domain_reading(reading),
        ))
    }

    async fn record_visit(
        &self,
        visit: VisitRequest,
        values: PressureValues,
    ) -> Result<VisitSummary, ServiceError> {
        validate(&visit)?;
        validate(&values)?;

        let user_id = visit.user_id;
        let update = VisitUpdate {
            user_id,
            language: visit
                .language
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty()),
            problem: visit.problem.map(|p| p.trim().to_string()),
            reading: conversions::convert_to_data_new_reading(values),
        };

        let reading = self
            .store
            .record_visit(update)
            .await
            .map_err(|e| ServiceError::from_repository(e, user_id))?;
        debug!("Stored reading {} for user {}", reading.id, user_id);

        let history = self.get_history(user_id).await?;
        let reading = conversions::convert_to_domain_reading(reading);
        // The history holds at least the reading we just stored
        let insights = calculate_insights(&history).ok_or_else(|| {
            ServiceError::Repository(format!("history of user {} is empty after insert", user_id))
        })?;

        Ok(VisitSummary {
            reading,
            history,
            insights,
        })
    }

    async fn get_history(&self, user_id: i64) -> Result<Vec<BloodPressureReading>, ServiceError> {
        let exists = self
            .store
            .user_exists(user_id)
            .await
            .map_err(|e| ServiceError::from_repository(e, user_id))?;
        if !exists {
            return Err(ServiceError::UserNotFound(user_id));
        }

        let readings = self
            .store
            .list_readings(user_id)
            .await
            .map_err(|e| ServiceError::from_repository(e, user_id))?;

        Ok(readings
            .into_iter()
            .map(conversions::convert_to_domain_reading)
            .collect())
    }
}

/// Create the default service over a store
pub fn create_default_blood_pressure_service(
    store: Arc<dyn ReadingStore>,
) -> Arc<dyn BloodPressureServiceTrait> {
    Arc::new(BloodPressureService::new(store))
}
