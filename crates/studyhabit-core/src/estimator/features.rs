//! Feature extraction and label encoding for the duration estimator.
//!
//! Every feature is a pure function of fields already known at task
//! creation. The encoded vector has a fixed layout; the label encoders
//! are fitted jointly with the model and stored in the snapshot so
//! prediction reuses exactly the training encoding.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::todo::{Category, Priority};

/// Number of entries in an encoded feature vector.
pub const FEATURE_COUNT: usize = 7;

/// Fallback when the profile has no session history yet.
pub const DEFAULT_AVG_SESSION_MINUTES: f64 = 60.0;

/// Neutral mood when the profile has no emotion entries yet.
pub const DEFAULT_MOOD_SCORE: f64 = 5.0;

/// Time-of-day bucket at task creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    /// Morning [6,12), afternoon [12,18), evening otherwise.
    pub fn from_timestamp(at: DateTime<Utc>) -> Self {
        match at.hour() {
            6..=11 => TimeOfDay::Morning,
            12..=17 => TimeOfDay::Afternoon,
            _ => TimeOfDay::Evening,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
        }
    }
}

/// Everything the estimator looks at for one task.
#[derive(Debug, Clone)]
pub struct EstimateInput {
    pub category: Category,
    pub priority: Priority,
    pub description_len: usize,
    pub has_deadline: bool,
    pub created_at: DateTime<Utc>,
    /// Profile's historical average session duration, if any.
    pub avg_session_minutes: Option<f64>,
    /// Profile's most recent mood score, if any.
    pub mood_score: Option<f64>,
}

/// A completed task offered as training data.
#[derive(Debug, Clone)]
pub struct TrainingExample {
    pub input: EstimateInput,
    pub actual_minutes: u32,
}

/// Maps category strings to dense indices.
///
/// Unseen values at prediction time encode to the default 0 rather than
/// erroring; the regression degrades gracefully.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit from observed values. Classes are sorted so the encoding is
    /// deterministic regardless of sample order.
    pub fn fit(values: impl IntoIterator<Item = String>) -> Self {
        let mut classes: Vec<String> = values.into_iter().collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    /// Encoded index, or `None` for an unseen class.
    pub fn encode(&self, value: &str) -> Option<usize> {
        self.classes.iter().position(|c| c == value)
    }

    /// Encoded index with the unknown-category fallback applied.
    pub fn encode_or_default(&self, value: &str) -> f64 {
        self.encode(value).unwrap_or(0) as f64
    }
}

/// Fitted encoders stored alongside the model weights.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureEncoders {
    pub category: LabelEncoder,
    pub time_of_day: LabelEncoder,
}

impl FeatureEncoders {
    /// Fit both encoders from the training inputs.
    pub fn fit(inputs: &[&EstimateInput]) -> Self {
        Self {
            category: LabelEncoder::fit(inputs.iter().map(|i| i.category.as_str().to_string())),
            time_of_day: LabelEncoder::fit(
                inputs
                    .iter()
                    .map(|i| TimeOfDay::from_timestamp(i.created_at).as_str().to_string()),
            ),
        }
    }

    /// Encode one input into the fixed feature layout:
    /// `[category, priority, desc_len, has_deadline, time_of_day,
    ///   avg_session_minutes, mood_score]`.
    pub fn encode(&self, input: &EstimateInput) -> [f64; FEATURE_COUNT] {
        let tod = TimeOfDay::from_timestamp(input.created_at);
        [
            self.category.encode_or_default(input.category.as_str()),
            input.priority.ordinal() as f64,
            input.description_len as f64,
            if input.has_deadline { 1.0 } else { 0.0 },
            self.time_of_day.encode_or_default(tod.as_str()),
            input.avg_session_minutes.unwrap_or(DEFAULT_AVG_SESSION_MINUTES),
            input.mood_score.unwrap_or(DEFAULT_MOOD_SCORE),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn time_of_day_buckets() {
        assert_eq!(TimeOfDay::from_timestamp(at(6)), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_timestamp(at(11)), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_timestamp(at(12)), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_timestamp(at(17)), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_timestamp(at(18)), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_timestamp(at(3)), TimeOfDay::Evening);
    }

    #[test]
    fn label_encoder_is_order_independent() {
        let a = LabelEncoder::fit(["project".to_string(), "study".to_string()]);
        let b = LabelEncoder::fit(["study".to_string(), "project".to_string()]);
        assert_eq!(a.encode("study"), b.encode("study"));
        assert_eq!(a.encode("nonsense"), None);
        assert_eq!(a.encode_or_default("nonsense"), 0.0);
    }

    #[test]
    fn encode_uses_defaults_for_missing_history() {
        let input = EstimateInput {
            category: Category::Study,
            priority: Priority::High,
            description_len: 42,
            has_deadline: true,
            created_at: at(9),
            avg_session_minutes: None,
            mood_score: None,
        };
        let encoders = FeatureEncoders::fit(&[&input]);
        let v = encoders.encode(&input);
        assert_eq!(v[1], 3.0);
        assert_eq!(v[2], 42.0);
        assert_eq!(v[3], 1.0);
        assert_eq!(v[5], DEFAULT_AVG_SESSION_MINUTES);
        assert_eq!(v[6], DEFAULT_MOOD_SCORE);
    }
}
