use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use bp_guide_domain::entities::user::{Gender as DomainGender, User as DomainUser};

use super::blood_pressure::PublicReading;
use super::common::deserialize_user_id;

/// Gender as accepted by the registration form
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl From<Gender> for DomainGender {
    fn from(gender: Gender) -> Self {
        match gender {
            Gender::Male => DomainGender::Male,
            Gender::Female => DomainGender::Female,
            Gender::Other => DomainGender::Other,
        }
    }
}

impl From<DomainGender> for Gender {
    fn from(gender: DomainGender) -> Self {
        match gender {
            DomainGender::Male => Gender::Male,
            DomainGender::Female => Gender::Female,
            DomainGender::Other => Gender::Other,
        }
    }
}

/// Public representation of a user profile
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    /// Four digit user id
    pub user_id: i64,
    pub name: String,
    pub age: u16,
    pub gender: Gender,
    /// Preferred language for advice
    pub language: String,
    /// Health problem note, empty when none
    pub problem: String,
    pub created_at: DateTime<Utc>,
}

impl From<DomainUser> for PublicUser {
    fn from(user: DomainUser) -> Self {
        Self {
            user_id: user.user_id,
            name: user.name,
            age: user.age,
            gender: user.gender.into(),
            language: user.language,
            problem: user.problem,
            created_at: user.created_at,
        }
    }
}

/// Response of `GET /api/verify-userid/{userId}`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserIdAvailability {
    /// True when the id is free for registration
    pub available: bool,
}

/// Body of `POST /api/verify-existing-user`
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyExistingUserRequest {
    #[serde(deserialize_with = "deserialize_user_id")]
    #[validate(range(min = 1000, max = 9999, message = "User ID must be a 4-digit number"))]
    pub user_id: i64,
}

/// A successful verification
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyExistingUserResponse {
    pub verified: bool,
    pub user: PublicUser,
}

/// Body of `POST /api/register`: the profile plus the first reading
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub user_id: i64,
    pub name: String,
    pub age: u16,
    pub gender: Gender,
    pub language: String,
    #[serde(default)]
    pub problem: String,
    pub systolic: u16,
    pub diastolic: u16,
}

/// The created user and their first reading
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub user: PublicUser,
    pub reading: PublicReading,
}
