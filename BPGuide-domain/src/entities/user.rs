use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use validator::Validate;

/// Patient gender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Gender::Male => write!(f, "Male"),
            Gender::Female => write!(f, "Female"),
            Gender::Other => write!(f, "Other"),
        }
    }
}

/// Domain model for a registered user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Caller-assigned identifier
    pub user_id: i64,

    /// Display name
    pub name: String,

    /// Age in years
    pub age: u16,

    /// Gender
    pub gender: Gender,

    /// Preferred language for advice
    pub language: String,

    /// Free-text health problem note, empty when none
    pub problem: String,

    /// Registration time
    pub created_at: DateTime<Utc>,
}

/// Registration input for a new user
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterUserRequest {
    /// Four digit identifier chosen by the user
    #[validate(range(min = 1000, max = 9999, message = "User ID must be a 4-digit number"))]
    pub user_id: i64,

    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,

    #[validate(range(min = 1, max = 130, message = "Age must be between 1 and 130"))]
    pub age: u16,

    pub gender: Gender,

    #[validate(length(min = 1, max = 50, message = "Language is required"))]
    pub language: String,

    #[validate(length(max = 1000, message = "Problem description cannot exceed 1000 characters"))]
    pub problem: String,
}

/// Context of a returning user's visit
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VisitRequest {
    #[validate(range(min = 1000, max = 9999, message = "User ID must be a 4-digit number"))]
    pub user_id: i64,

    /// New preferred language, kept unchanged when absent
    #[validate(length(min = 1, max = 50, message = "Language cannot be empty"))]
    pub language: Option<String>,

    /// New problem note, kept unchanged when absent
    #[validate(length(max = 1000, message = "Problem description cannot exceed 1000 characters"))]
    pub problem: Option<String>,
}
