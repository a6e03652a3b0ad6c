//! Achievement commands.

use chrono::Utc;
use clap::Subcommand;
use studyhabit_core::storage::Database;

use crate::common::resolve_profile;

#[derive(Subcommand)]
pub enum AchievementAction {
    /// List earned achievements
    List {
        /// Profile ID or display name
        #[arg(long)]
        profile: String,
    },
    /// Claim an achievement's coin reward
    Claim {
        /// Achievement ID
        id: String,
    },
}

pub fn run(action: AchievementAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        AchievementAction::List { profile } => {
            let profile = resolve_profile(&db, &profile)?;
            let achievements = db.list_achievements(&profile.id)?;
            println!("{}", serde_json::to_string_pretty(&achievements)?);
        }
        AchievementAction::Claim { id } => {
            let balance = db.claim_achievement(&id, Utc::now())?;
            println!("Claimed. Balance: {balance} coins");
        }
    }
    Ok(())
}
