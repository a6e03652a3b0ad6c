//! Profile management commands.

use chrono::Utc;
use clap::Subcommand;
use studyhabit_core::gamification::catalog;
use studyhabit_core::storage::Database;
use studyhabit_core::Profile;

use crate::common::resolve_profile;

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Create a new profile
    Create {
        /// Display name
        name: String,
        /// Timezone label (display only)
        #[arg(long, default_value = "UTC")]
        timezone: String,
    },
    /// Show a profile
    Show {
        /// Profile ID or display name
        profile: String,
    },
    /// Show the coin ledger
    Ledger {
        /// Profile ID or display name
        profile: String,
    },
    /// Toggle deadline reminder messages
    Reminders {
        /// Profile ID or display name
        profile: String,
        /// Enable or disable ("true" / "false")
        #[arg(long, action = clap::ArgAction::Set)]
        enabled: bool,
    },
}

pub fn run(action: ProfileAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        ProfileAction::Create { name, timezone } => {
            let now = Utc::now();
            let mut profile = Profile::new(name, now);
            profile.timezone = timezone;
            db.insert_profile(&profile)?;

            // Seed the shop and hand over the free starter companion.
            for character in catalog::builtin_characters() {
                db.upsert_character(&character)?;
            }
            db.grant_character(&profile.id, "bunny", now, true)?;

            println!("Profile created: {}", profile.id);
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        ProfileAction::Show { profile } => {
            let profile = resolve_profile(&db, &profile)?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        ProfileAction::Ledger { profile } => {
            let profile = resolve_profile(&db, &profile)?;
            let ledger = db.list_transactions(&profile.id)?;
            println!("{}", serde_json::to_string_pretty(&ledger)?);
        }
        ProfileAction::Reminders { profile, enabled } => {
            let mut profile = resolve_profile(&db, &profile)?;
            profile.email_reminder = enabled;
            db.update_profile(&profile)?;
            println!("Reminders {}", if enabled { "enabled" } else { "disabled" });
        }
    }
    Ok(())
}
