use async_trait::async_trait;
use chrono::{DateTime, Duration, SubsecRound, Utc};

use crate::models::blood_pressure::{NewReading, ReadingRecord, VisitUpdate};
use super::errors::RepositoryError;

/// Repository trait for blood pressure readings
///
/// Readings are append-only: there is no update or delete.
#[async_trait]
pub trait ReadingRepositoryTrait: Send + Sync {
    /// Append a reading for an existing user
    async fn insert_reading(
        &self,
        user_id: i64,
        reading: NewReading,
    ) -> Result<ReadingRecord, RepositoryError>;

    /// All readings of a user, ascending by `recorded_at`
    async fn list_readings(&self, user_id: i64) -> Result<Vec<ReadingRecord>, RepositoryError>;

    /// Apply profile changes and append the visit's reading atomically
    async fn record_visit(&self, visit: VisitUpdate) -> Result<ReadingRecord, RepositoryError>;
}

/// Timestamp for the next reading of a user
///
/// Stored timestamps have microsecond precision; when the clock has not moved
/// past the user's latest reading the new one is placed one microsecond after it.
pub fn next_recorded_at(latest: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    let now = now.trunc_subsecs(6);
    match latest {
        Some(latest) if now <= latest => latest + Duration::microseconds(1),
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_next_recorded_at_uses_clock_when_ahead() {
        let latest = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        assert_eq!(next_recorded_at(Some(latest), now), now);
        assert_eq!(next_recorded_at(None, now), now);
    }

    #[test]
    fn test_next_recorded_at_is_strictly_increasing() {
        let latest = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        // Clock went backwards
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 8, 59, 0).unwrap();
        let next = next_recorded_at(Some(latest), now);
        assert!(next > latest);
        assert_eq!(next - latest, Duration::microseconds(1));
    }

    #[test]
    fn test_next_recorded_at_truncates_to_micros() {
        let now = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let next = next_recorded_at(None, now);
        assert_eq!(next.timestamp_subsec_nanos(), 123_456_000);
    }
}
