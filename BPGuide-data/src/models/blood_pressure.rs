use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Storage model for a blood pressure reading
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadingRecord {
    /// Row identifier, assigned by the store
    pub id: i64,

    /// Owning user
    pub user_id: i64,

    /// Systolic blood pressure (the higher number)
    pub systolic: u16,

    /// Diastolic blood pressure (the lower number)
    pub diastolic: u16,

    /// Set at insertion, strictly increasing per user
    pub recorded_at: DateTime<Utc>,
}

/// Pressure values for a reading about to be inserted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewReading {
    pub systolic: u16,
    pub diastolic: u16,
}

/// A returning user's visit: profile changes plus the new reading
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitUpdate {
    pub user_id: i64,

    /// Replaces the stored language when present
    pub language: Option<String>,

    /// Replaces the stored problem note when present
    pub problem: Option<String>,

    pub reading: NewReading,
}
