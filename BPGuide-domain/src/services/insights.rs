use chrono::Utc;

use crate::entities::blood_pressure::{
    BloodPressureCategory, BloodPressureInsights, BloodPressureReading, Trend,
};

/// Average change in mmHg between history halves that counts as a trend
const TREND_THRESHOLD: f64 = 5.0;

/// Categorize blood pressure based on measurements
pub fn categorize_blood_pressure(systolic: u16, diastolic: u16) -> BloodPressureCategory {
    if systolic >= 180 || diastolic >= 120 {
        BloodPressureCategory::HypertensiveCrisis
    } else if systolic >= 140 || diastolic >= 90 {
        BloodPressureCategory::Hypertension2
    } else if systolic >= 130 || diastolic >= 80 {
        BloodPressureCategory::Hypertension1
    } else if systolic >= 120 && diastolic < 80 {
        BloodPressureCategory::Elevated
    } else {
        BloodPressureCategory::Normal
    }
}

/// Summarize a history given in ascending `recorded_at` order
///
/// Returns `None` for an empty history.
pub fn calculate_insights(readings: &[BloodPressureReading]) -> Option<BloodPressureInsights> {
    let latest = readings.last()?;

    let count = readings.len() as f64;
    let avg_systolic = readings.iter().map(|r| r.systolic as f64).sum::<f64>() / count;
    let avg_diastolic = readings.iter().map(|r| r.diastolic as f64).sum::<f64>() / count;

    // Non-empty, so the min/max iterators always yield
    let max_systolic = readings.iter().map(|r| r.systolic).max().unwrap_or(latest.systolic);
    let max_diastolic = readings.iter().map(|r| r.diastolic).max().unwrap_or(latest.diastolic);
    let min_systolic = readings.iter().map(|r| r.systolic).min().unwrap_or(latest.systolic);
    let min_diastolic = readings.iter().map(|r| r.diastolic).min().unwrap_or(latest.diastolic);

    Some(BloodPressureInsights {
        avg_systolic,
        avg_diastolic,
        max_systolic,
        max_diastolic,
        min_systolic,
        min_diastolic,
        latest_category: categorize_blood_pressure(latest.systolic, latest.diastolic),
        average_category: categorize_blood_pressure(
            avg_systolic.round() as u16,
            avg_diastolic.round() as u16,
        ),
        trend: calculate_trend(readings),
        reading_count: readings.len(),
        generated_at: Utc::now(),
    })
}

/// Compare the mean systolic of the older half with the newer half
///
/// With an odd count the middle reading belongs to the newer half.
pub fn calculate_trend(readings: &[BloodPressureReading]) -> Trend {
    if readings.len() < 2 {
        return Trend::Insufficient;
    }

    let (older, newer) = readings.split_at(readings.len() / 2);
    let mean = |half: &[BloodPressureReading]| {
        half.iter().map(|r| r.systolic as f64).sum::<f64>() / half.len() as f64
    };

    let delta = mean(newer) - mean(older);
    if delta >= TREND_THRESHOLD {
        Trend::Rising
    } else if delta <= -TREND_THRESHOLD {
        Trend::Falling
    } else {
        Trend::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn history(values: &[(u16, u16)]) -> Vec<BloodPressureReading> {
        let start = Utc::now();
        values
            .iter()
            .enumerate()
            .map(|(i, &(systolic, diastolic))| BloodPressureReading {
                id: i as i64 + 1,
                user_id: 1234,
                systolic,
                diastolic,
                recorded_at: start + Duration::minutes(i as i64),
            })
            .collect()
    }

    #[test]
    fn test_bp_category_normal() {
        let category = categorize_blood_pressure(110, 75);
        assert_eq!(category, BloodPressureCategory::Normal);
    }

    #[test]
    fn test_bp_category_elevated() {
        let category = categorize_blood_pressure(125, 75);
        assert_eq!(category, BloodPressureCategory::Elevated);
    }

    #[test]
    fn test_bp_category_hypertension1() {
        assert_eq!(categorize_blood_pressure(135, 75), BloodPressureCategory::Hypertension1);
        assert_eq!(categorize_blood_pressure(120, 85), BloodPressureCategory::Hypertension1);
    }

    #[test]
    fn test_bp_category_hypertension2() {
        assert_eq!(categorize_blood_pressure(145, 75), BloodPressureCategory::Hypertension2);
        assert_eq!(categorize_blood_pressure(120, 95), BloodPressureCategory::Hypertension2);
    }

    #[test]
    fn test_bp_category_crisis() {
        assert_eq!(categorize_blood_pressure(180, 110), BloodPressureCategory::HypertensiveCrisis);
        assert_eq!(categorize_blood_pressure(120, 125), BloodPressureCategory::HypertensiveCrisis);
    }

    #[test]
    fn test_insights_empty_history() {
        assert!(calculate_insights(&[]).is_none());
    }

    #[test]
    fn test_insights_statistics() {
        let readings = history(&[(120, 80), (140, 90), (130, 70)]);
        let insights = calculate_insights(&readings).unwrap();

        assert_eq!(insights.reading_count, 3);
        assert!((insights.avg_systolic - 130.0).abs() < f64::EPSILON);
        assert!((insights.avg_diastolic - 80.0).abs() < f64::EPSILON);
        assert_eq!(insights.max_systolic, 140);
        assert_eq!(insights.min_diastolic, 70);
        assert_eq!(insights.latest_category, BloodPressureCategory::Hypertension1);
        assert_eq!(insights.average_category, BloodPressureCategory::Hypertension1);
    }

    #[test]
    fn test_trend() {
        assert_eq!(calculate_trend(&history(&[(120, 80)])), Trend::Insufficient);
        assert_eq!(calculate_trend(&history(&[(120, 80), (150, 95)])), Trend::Rising);
        assert_eq!(calculate_trend(&history(&[(160, 100), (150, 95), (130, 85)])), Trend::Falling);
        assert_eq!(calculate_trend(&history(&[(120, 80), (122, 80), (121, 79)])), Trend::Stable);
    }
}
