use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Gender as persisted in the `users.gender` column
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StoredGender {
    Male,
    Female,
    Other,
}

impl StoredGender {
    /// Column representation
    pub fn as_str(self) -> &'static str {
        match self {
            StoredGender::Male => "Male",
            StoredGender::Female => "Female",
            StoredGender::Other => "Other",
        }
    }

    /// Parse the column representation
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Male" => Some(StoredGender::Male),
            "Female" => Some(StoredGender::Female),
            "Other" => Some(StoredGender::Other),
            _ => None,
        }
    }
}

/// Storage model for a registered user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    /// Caller-assigned identifier, immutable
    pub user_id: i64,

    /// Display name
    pub name: String,

    /// Age in years
    pub age: u16,

    /// Gender
    pub gender: StoredGender,

    /// Preferred language for advice
    pub language: String,

    /// Free-text health problem note
    pub problem: String,

    /// When the user registered
    pub created_at: DateTime<Utc>,

    /// When language/problem last changed
    pub updated_at: DateTime<Utc>,
}

/// Input data for registering a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub user_id: i64,
    pub name: String,
    pub age: u16,
    pub gender: StoredGender,
    pub language: String,
    pub problem: String,
}
