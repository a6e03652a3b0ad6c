//! Best-effort task-duration prediction.
//!
//! A linear regression over seven cheap features, trained opportunistically
//! from completed tasks. The contract is deliberately loose: `estimate()`
//! is a total function returning minutes in [15,480] when a model exists
//! and the fixed per-priority default otherwise. Every internal failure
//! (no model, unseen category, degenerate fit output) degrades to the
//! default; prediction never surfaces an error.
//!
//! The trained model travels as an explicitly passed [`ModelSnapshot`]
//! rather than ambient filesystem state, so callers decide where it lives
//! (the database kv table, see [`crate::storage::Database::load_model`])
//! and tests can substitute deterministic ones.

mod features;
mod regression;

pub use features::{
    EstimateInput, FeatureEncoders, LabelEncoder, TimeOfDay, TrainingExample,
    DEFAULT_AVG_SESSION_MINUTES, DEFAULT_MOOD_SCORE, FEATURE_COUNT,
};
pub use regression::LinearModel;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hard bounds on a model-backed estimate, in minutes.
pub const MIN_ESTIMATE_MINUTES: u32 = 15;
pub const MAX_ESTIMATE_MINUTES: u32 = 480;

/// Plausible range for a recorded actual duration; training samples
/// outside it are treated as bad data and dropped.
pub const MIN_PLAUSIBLE_ACTUAL: u32 = 5;
pub const MAX_PLAUSIBLE_ACTUAL: u32 = 480;

/// Default fewest completed tasks worth even attempting a fit; callers
/// may pass a configured value instead (`EstimatorConfig`).
pub const MIN_TRAINING_TASKS: usize = 5;

/// Fewest samples surviving the plausibility filter for a fit to proceed.
pub const MIN_USABLE_SAMPLES: usize = 3;

/// Serializable trained state: model weights plus the encoders fitted
/// with them. Versioned so a future layout change can refuse to load
/// stale snapshots instead of mispredicting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub version: u32,
    pub trained_at: DateTime<Utc>,
    pub sample_count: usize,
    pub model: LinearModel,
    pub encoders: FeatureEncoders,
}

impl ModelSnapshot {
    pub const CURRENT_VERSION: u32 = 1;
}

/// The predictor. Holds at most one snapshot.
#[derive(Debug, Clone, Default)]
pub struct DurationEstimator {
    snapshot: Option<ModelSnapshot>,
}

impl DurationEstimator {
    /// Build from a previously persisted snapshot, if one exists.
    /// Snapshots from another layout version are ignored.
    pub fn new(snapshot: Option<ModelSnapshot>) -> Self {
        let snapshot = snapshot.filter(|s| s.version == ModelSnapshot::CURRENT_VERSION);
        Self { snapshot }
    }

    pub fn has_model(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn snapshot(&self) -> Option<&ModelSnapshot> {
        self.snapshot.as_ref()
    }

    /// Predicted duration in minutes. Total: never an error.
    ///
    /// With no model this is the per-priority default (30/60/90). With a
    /// model the encoded features run through the regression and the
    /// result is clamped to [15,480]; a non-finite prediction falls back
    /// to the default.
    pub fn estimate(&self, input: &EstimateInput) -> u32 {
        let Some(snapshot) = &self.snapshot else {
            return input.priority.default_estimate_minutes();
        };

        let x = snapshot.encoders.encode(input);
        let raw = snapshot.model.predict(&x);
        if !raw.is_finite() {
            return input.priority.default_estimate_minutes();
        }
        (raw.round() as i64)
            .clamp(MIN_ESTIMATE_MINUTES as i64, MAX_ESTIMATE_MINUTES as i64) as u32
    }

    /// Refit from completed tasks. `min_offered` is the fewest offered
    /// samples worth attempting a fit ([`MIN_TRAINING_TASKS`] unless
    /// configured otherwise). Returns `false` (and leaves any existing
    /// model untouched) when there is not enough qualifying data;
    /// callers retry later once more tasks are done.
    pub fn train(
        &mut self,
        samples: &[TrainingExample],
        min_offered: usize,
        now: DateTime<Utc>,
    ) -> bool {
        if samples.len() < min_offered {
            return false;
        }

        let usable: Vec<&TrainingExample> = samples
            .iter()
            .filter(|s| {
                (MIN_PLAUSIBLE_ACTUAL..=MAX_PLAUSIBLE_ACTUAL).contains(&s.actual_minutes)
            })
            .collect();
        if usable.len() < MIN_USABLE_SAMPLES {
            return false;
        }

        let inputs: Vec<&EstimateInput> = usable.iter().map(|s| &s.input).collect();
        let encoders = FeatureEncoders::fit(&inputs);

        let rows: Vec<Vec<f64>> = usable
            .iter()
            .map(|s| encoders.encode(&s.input).to_vec())
            .collect();
        let targets: Vec<f64> = usable.iter().map(|s| s.actual_minutes as f64).collect();

        let Some(model) = LinearModel::fit(&rows, &targets) else {
            return false;
        };

        self.snapshot = Some(ModelSnapshot {
            version: ModelSnapshot::CURRENT_VERSION,
            trained_at: now,
            sample_count: usable.len(),
            model,
            encoders,
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::todo::{Category, Priority};
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn input(priority: Priority, desc_len: usize) -> EstimateInput {
        EstimateInput {
            category: Category::Study,
            priority,
            description_len: desc_len,
            has_deadline: false,
            created_at: t0(),
            avg_session_minutes: Some(45.0),
            mood_score: Some(6.0),
        }
    }

    fn sample(priority: Priority, desc_len: usize, actual: u32) -> TrainingExample {
        TrainingExample {
            input: input(priority, desc_len),
            actual_minutes: actual,
        }
    }

    #[test]
    fn untrained_estimator_returns_priority_defaults() {
        let est = DurationEstimator::default();
        assert_eq!(est.estimate(&input(Priority::Low, 10)), 30);
        assert_eq!(est.estimate(&input(Priority::Medium, 10)), 60);
        assert_eq!(est.estimate(&input(Priority::High, 10)), 90);
    }

    #[test]
    fn train_declines_below_minimum_offered() {
        let mut est = DurationEstimator::default();
        let samples = vec![
            sample(Priority::Medium, 10, 60),
            sample(Priority::Medium, 20, 70),
        ];
        assert!(!est.train(&samples, MIN_TRAINING_TASKS, t0()));
        assert!(!est.has_model());
        assert_eq!(est.estimate(&input(Priority::Medium, 15)), 60);
    }

    #[test]
    fn train_honors_caller_supplied_minimum() {
        let samples = vec![
            sample(Priority::Low, 10, 30),
            sample(Priority::Medium, 60, 55),
            sample(Priority::High, 120, 110),
            sample(Priority::High, 200, 150),
        ];

        let mut est = DurationEstimator::default();
        assert!(!est.train(&samples, MIN_TRAINING_TASKS, t0()));
        assert!(!est.has_model());

        // The same four samples fit once the configured minimum drops to 3.
        assert!(est.train(&samples, 3, t0()));
        assert!(est.has_model());
    }

    #[test]
    fn train_declines_when_filter_leaves_too_few() {
        let mut est = DurationEstimator::default();
        // Five offered, but only two with a plausible actual duration.
        let samples = vec![
            sample(Priority::Low, 5, 2),
            sample(Priority::Low, 5, 900),
            sample(Priority::Low, 5, 1),
            sample(Priority::Medium, 10, 60),
            sample(Priority::High, 15, 120),
        ];
        assert!(!est.train(&samples, MIN_TRAINING_TASKS, t0()));
        assert!(!est.has_model());
    }

    #[test]
    fn train_fits_and_estimates_within_bounds() {
        let mut est = DurationEstimator::default();
        let samples = vec![
            sample(Priority::Low, 10, 30),
            sample(Priority::Low, 40, 45),
            sample(Priority::Medium, 80, 70),
            sample(Priority::High, 120, 110),
            sample(Priority::High, 200, 150),
        ];
        assert!(est.train(&samples, MIN_TRAINING_TASKS, t0()));
        assert!(est.has_model());

        let minutes = est.estimate(&input(Priority::Medium, 90));
        assert!((MIN_ESTIMATE_MINUTES..=MAX_ESTIMATE_MINUTES).contains(&minutes));
    }

    #[test]
    fn unseen_category_degrades_instead_of_erroring() {
        let mut est = DurationEstimator::default();
        let samples = vec![
            sample(Priority::Low, 10, 30),
            sample(Priority::Low, 40, 45),
            sample(Priority::Medium, 80, 70),
            sample(Priority::High, 120, 110),
            sample(Priority::High, 200, 150),
        ];
        assert!(est.train(&samples, MIN_TRAINING_TASKS, t0()));

        // Model was trained on Study only; a Project task still predicts.
        let mut other = input(Priority::Medium, 50);
        other.category = Category::Project;
        let minutes = est.estimate(&other);
        assert!((MIN_ESTIMATE_MINUTES..=MAX_ESTIMATE_MINUTES).contains(&minutes));
    }

    #[test]
    fn stale_snapshot_version_is_ignored() {
        let mut est = DurationEstimator::default();
        let samples = vec![
            sample(Priority::Low, 10, 30),
            sample(Priority::Low, 40, 45),
            sample(Priority::Medium, 80, 70),
            sample(Priority::High, 120, 110),
            sample(Priority::High, 200, 150),
        ];
        assert!(est.train(&samples, MIN_TRAINING_TASKS, t0()));
        let mut snapshot = est.snapshot().unwrap().clone();
        snapshot.version = 99;
        let reloaded = DurationEstimator::new(Some(snapshot));
        assert!(!reloaded.has_model());
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let mut est = DurationEstimator::default();
        let samples = vec![
            sample(Priority::Low, 10, 30),
            sample(Priority::Low, 40, 45),
            sample(Priority::Medium, 80, 70),
            sample(Priority::High, 120, 110),
            sample(Priority::High, 200, 150),
        ];
        assert!(est.train(&samples, MIN_TRAINING_TASKS, t0()));

        let json = serde_json::to_string(est.snapshot().unwrap()).unwrap();
        let restored: ModelSnapshot = serde_json::from_str(&json).unwrap();
        let reloaded = DurationEstimator::new(Some(restored));

        let query = input(Priority::Medium, 90);
        assert_eq!(est.estimate(&query), reloaded.estimate(&query));
    }

    proptest! {
        /// The testable contract: always an integer in [15,480] with a
        /// model, one of {30,60,90} without, and never a panic.
        #[test]
        fn estimate_is_total_and_bounded(
            desc_len in 0usize..10_000,
            prio in 0u8..3,
            hour in 0u32..24,
            avg in proptest::option::of(0.0f64..600.0),
            mood in proptest::option::of(0.0f64..10.0),
            actuals in prop::collection::vec(1u32..600, 5..20),
        ) {
            let priority = match prio {
                0 => Priority::Low,
                1 => Priority::Medium,
                _ => Priority::High,
            };
            let created = Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0).unwrap();
            let query = EstimateInput {
                category: Category::Homework,
                priority,
                description_len: desc_len,
                has_deadline: desc_len % 2 == 0,
                created_at: created,
                avg_session_minutes: avg,
                mood_score: mood,
            };

            let untrained = DurationEstimator::default();
            prop_assert!([30, 60, 90].contains(&untrained.estimate(&query)));

            let mut est = DurationEstimator::default();
            let samples: Vec<TrainingExample> = actuals
                .iter()
                .enumerate()
                .map(|(i, &a)| sample(priority, i * 13, a))
                .collect();
            if est.train(&samples, MIN_TRAINING_TASKS, created) {
                let minutes = est.estimate(&query);
                prop_assert!((MIN_ESTIMATE_MINUTES..=MAX_ESTIMATE_MINUTES).contains(&minutes));
            }
        }
    }
}
