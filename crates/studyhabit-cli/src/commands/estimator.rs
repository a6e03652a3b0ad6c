//! Duration estimator commands.

use chrono::Utc;
use clap::Subcommand;
use studyhabit_core::clock::SystemClock;
use studyhabit_core::storage::{Config, Database};
use studyhabit_core::{DurationEstimator, ToDoService};

use crate::common::resolve_profile;

#[derive(Subcommand)]
pub enum EstimatorAction {
    /// Retrain the model from completed to-do items
    Train {
        /// Profile ID or display name
        #[arg(long)]
        profile: String,
    },
    /// Show the trained model, if any
    Show,
}

pub fn run(action: EstimatorAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        EstimatorAction::Train { profile } => {
            let profile = resolve_profile(&db, &profile)?;
            let config = Config::load_or_default();
            let service = ToDoService::new(&db, SystemClock, config.reminders.window_hours);

            let samples = service.training_samples(&profile.id)?;
            let mut estimator = DurationEstimator::new(db.load_model()?);
            if estimator.train(&samples, config.estimator.min_training_samples, Utc::now()) {
                if let Some(snapshot) = estimator.snapshot() {
                    db.save_model(snapshot)?;
                    println!(
                        "Model trained on {} samples ({} offered)",
                        snapshot.sample_count,
                        samples.len()
                    );
                }
            } else {
                println!(
                    "Not enough completed tasks to train ({} offered); estimates use priority defaults",
                    samples.len()
                );
            }
        }
        EstimatorAction::Show => match db.load_model()? {
            Some(snapshot) => println!("{}", serde_json::to_string_pretty(&snapshot)?),
            None => println!("No trained model"),
        },
    }
    Ok(())
}
