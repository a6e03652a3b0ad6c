use chrono::Utc;
use clap::Subcommand;
use studyhabit_core::storage::Database;

use crate::common::resolve_profile;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Session totals, all-time and today
    Show {
        /// Profile ID or display name
        #[arg(long)]
        profile: String,
    },
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        StatsAction::Show { profile } => {
            let profile = resolve_profile(&db, &profile)?;
            let stats = db.stats_all(&profile.id, Utc::now())?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}
