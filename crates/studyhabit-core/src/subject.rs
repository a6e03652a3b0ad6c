//! Subjects and weekly study targets.

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A subject the profile studies, with a weekly hour target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub profile_id: String,
    pub name: String,
    /// HEX color for dashboards ("#aabbcc").
    pub color: String,
    pub target_hours_per_week: f64,
    pub created_at: DateTime<Utc>,
}

impl Subject {
    pub fn new(
        profile_id: impl Into<String>,
        name: impl Into<String>,
        color: impl Into<String>,
        target_hours_per_week: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: format!("subject-{}", uuid::Uuid::new_v4()),
            profile_id: profile_id.into(),
            name: name.into(),
            color: color.into(),
            target_hours_per_week,
            created_at: now,
        }
    }
}

/// Study hours logged this week against the subject's target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyProgress {
    pub subject_id: String,
    pub subject_name: String,
    pub hours_this_week: f64,
    pub target_hours_per_week: f64,
}

impl WeeklyProgress {
    /// 0.0 .. 1.0 toward the weekly target (capped at 1.0).
    pub fn ratio(&self) -> f64 {
        if self.target_hours_per_week <= 0.0 {
            return 0.0;
        }
        (self.hours_this_week / self.target_hours_per_week).min(1.0)
    }
}

/// Start of the current week (Monday 00:00 UTC), used by the
/// hours-this-week query.
pub fn start_of_week(now: DateTime<Utc>) -> DateTime<Utc> {
    let days_from_monday = now.weekday().num_days_from_monday() as i64;
    let date = (now - Duration::days(days_from_monday)).date_naive();
    date.and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn start_of_week_is_monday_midnight() {
        // 2025-03-06 is a Thursday
        let now = Utc.with_ymd_and_hms(2025, 3, 6, 15, 30, 0).unwrap();
        let start = start_of_week(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 3, 3, 0, 0, 0).unwrap());
    }

    #[test]
    fn start_of_week_on_monday_is_same_day() {
        let now = Utc.with_ymd_and_hms(2025, 3, 3, 0, 0, 1).unwrap();
        assert_eq!(
            start_of_week(now),
            Utc.with_ymd_and_hms(2025, 3, 3, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn progress_ratio_caps_at_one() {
        let p = WeeklyProgress {
            subject_id: "s".into(),
            subject_name: "Math".into(),
            hours_this_week: 9.0,
            target_hours_per_week: 5.0,
        };
        assert_eq!(p.ratio(), 1.0);

        let none = WeeklyProgress {
            target_hours_per_week: 0.0,
            ..p
        };
        assert_eq!(none.ratio(), 0.0);
    }
}
