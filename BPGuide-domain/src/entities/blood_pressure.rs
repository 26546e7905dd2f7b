use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use validator::Validate;

/// Domain model for a blood pressure reading
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BloodPressureReading {
    /// Store-assigned identifier
    pub id: i64,

    /// Owning user
    pub user_id: i64,

    /// Systolic blood pressure (the higher number)
    pub systolic: u16,

    /// Diastolic blood pressure (the lower number)
    pub diastolic: u16,

    /// When the reading was recorded
    pub recorded_at: DateTime<Utc>,
}

/// Pressure values submitted by a user
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate, PartialEq, Eq)]
pub struct PressureValues {
    /// Systolic blood pressure (the higher number)
    #[validate(range(min = 60, max = 250, message = "Systolic must be between 60 and 250"))]
    pub systolic: u16,

    /// Diastolic blood pressure (the lower number)
    #[validate(range(min = 40, max = 150, message = "Diastolic must be between 40 and 150"))]
    pub diastolic: u16,
}

/// Blood pressure category based on measurements
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BloodPressureCategory {
    /// Normal blood pressure (systolic < 120 and diastolic < 80)
    Normal,

    /// Elevated blood pressure (systolic 120-129 and diastolic < 80)
    Elevated,

    /// Stage 1 Hypertension (systolic 130-139 or diastolic 80-89)
    Hypertension1,

    /// Stage 2 Hypertension (systolic ≥ 140 or diastolic ≥ 90)
    Hypertension2,

    /// Hypertensive crisis (systolic ≥ 180 or diastolic ≥ 120)
    HypertensiveCrisis,
}

impl BloodPressureCategory {
    /// Label used in advice and reports
    pub fn label(self) -> &'static str {
        match self {
            BloodPressureCategory::Normal => "Normal",
            BloodPressureCategory::Elevated => "Elevated",
            BloodPressureCategory::Hypertension1 => "Hypertension Stage 1",
            BloodPressureCategory::Hypertension2 => "Hypertension Stage 2",
            BloodPressureCategory::HypertensiveCrisis => "Hypertensive Crisis",
        }
    }
}

/// Direction of a user's readings over their history
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Trend {
    Rising,
    Falling,
    Stable,
    /// Fewer than two readings
    Insufficient,
}

/// Summary statistics over a user's history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BloodPressureInsights {
    /// Average systolic reading
    pub avg_systolic: f64,

    /// Average diastolic reading
    pub avg_diastolic: f64,

    /// Highest recorded systolic reading
    pub max_systolic: u16,

    /// Highest recorded diastolic reading
    pub max_diastolic: u16,

    /// Lowest recorded systolic reading
    pub min_systolic: u16,

    /// Lowest recorded diastolic reading
    pub min_diastolic: u16,

    /// Category of the most recent reading
    pub latest_category: BloodPressureCategory,

    /// Category of the averages
    pub average_category: BloodPressureCategory,

    /// Comparison of the older and newer halves of the history
    pub trend: Trend,

    /// Number of readings analyzed
    pub reading_count: usize,

    /// Timestamp of the analysis
    pub generated_at: DateTime<Utc>,
}
