mod config;
pub mod database;

pub use config::{Config, EstimatorConfig, RemindersConfig, RewardsConfig};
pub use database::{Database, StudyStats};

use std::path::PathBuf;

/// Returns `~/.config/studyhabit[-dev]/` based on STUDYHABIT_ENV.
///
/// Set STUDYHABIT_ENV=dev to use a development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("STUDYHABIT_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("studyhabit-dev")
    } else {
        base_dir.join("studyhabit")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
