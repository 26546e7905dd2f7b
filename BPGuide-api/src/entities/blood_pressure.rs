use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use bp_guide_domain::entities::blood_pressure::{
    BloodPressureCategory, BloodPressureInsights, BloodPressureReading, Trend,
};
use bp_guide_domain::services::insights::categorize_blood_pressure;

/// Public representation of a blood pressure reading
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicReading {
    pub id: i64,
    pub user_id: i64,

    /// Systolic blood pressure (the higher number)
    pub systolic: u16,

    /// Diastolic blood pressure (the lower number)
    pub diastolic: u16,

    /// Category label, e.g. "Hypertension Stage 1"
    pub category: String,

    /// When the reading was recorded; the history chart reads this snake_case key
    #[serde(rename = "recorded_at")]
    pub recorded_at: DateTime<Utc>,
}

impl From<BloodPressureReading> for PublicReading {
    fn from(reading: BloodPressureReading) -> Self {
        Self {
            id: reading.id,
            user_id: reading.user_id,
            systolic: reading.systolic,
            diastolic: reading.diastolic,
            category: categorize_blood_pressure(reading.systolic, reading.diastolic)
                .label()
                .to_string(),
            recorded_at: reading.recorded_at,
        }
    }
}

/// Summary statistics over a user's history
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicInsights {
    pub reading_count: usize,
    pub avg_systolic: f64,
    pub avg_diastolic: f64,
    pub max_systolic: u16,
    pub max_diastolic: u16,
    pub min_systolic: u16,
    pub min_diastolic: u16,
    /// Category of the most recent reading
    pub latest_category: String,
    /// Category of the averages
    pub average_category: String,
    /// "rising", "falling", "stable" or "insufficient"
    pub trend: String,
    pub generated_at: DateTime<Utc>,
}

fn category_label(category: BloodPressureCategory) -> String {
    category.label().to_string()
}

fn trend_label(trend: Trend) -> String {
    match trend {
        Trend::Rising => "rising",
        Trend::Falling => "falling",
        Trend::Stable => "stable",
        Trend::Insufficient => "insufficient",
    }
    .to_string()
}

impl From<BloodPressureInsights> for PublicInsights {
    fn from(insights: BloodPressureInsights) -> Self {
        Self {
            reading_count: insights.reading_count,
            avg_systolic: (insights.avg_systolic * 10.0).round() / 10.0,
            avg_diastolic: (insights.avg_diastolic * 10.0).round() / 10.0,
            max_systolic: insights.max_systolic,
            max_diastolic: insights.max_diastolic,
            min_systolic: insights.min_systolic,
            min_diastolic: insights.min_diastolic,
            latest_category: category_label(insights.latest_category),
            average_category: category_label(insights.average_category),
            trend: trend_label(insights.trend),
            generated_at: insights.generated_at,
        }
    }
}

/// Body of `POST /api/update-bp` for a returning user
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBloodPressureRequest {
    pub user_id: i64,
    /// Replaces the stored language when present
    pub language: Option<String>,
    /// Replaces the stored problem note when present
    pub problem: Option<String>,
    pub systolic: u16,
    pub diastolic: u16,
}

/// The stored reading with the user's updated history
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateBloodPressureResponse {
    pub reading: PublicReading,
    pub history: Vec<PublicReading>,
    pub insights: PublicInsights,
}

/// Response of `GET /api/users/{userId}/readings`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub user_id: i64,
    /// Ascending by recorded_at
    pub readings: Vec<PublicReading>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insights: Option<PublicInsights>,
}
