//! Study session commands.

use chrono::Utc;
use clap::Subcommand;
use studyhabit_core::clock::SystemClock;
use studyhabit_core::gamification::milestone_achievements;
use studyhabit_core::storage::{Config, Database};
use studyhabit_core::SessionService;

use crate::common::resolve_profile;

#[derive(Subcommand)]
pub enum SessionAction {
    /// Start a session
    Start {
        /// Profile ID or display name
        #[arg(long)]
        profile: String,
        /// Subject ID
        #[arg(long)]
        subject: String,
    },
    /// Pause the session
    Pause {
        /// Session ID
        id: String,
    },
    /// Resume a paused session
    Resume {
        /// Session ID
        id: String,
    },
    /// Stop the session and collect the coin reward
    Stop {
        /// Session ID
        id: String,
    },
    /// Show the open session, if any
    Status {
        /// Profile ID or display name
        #[arg(long)]
        profile: String,
    },
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let config = Config::load_or_default();
    let service = SessionService::new(&db, SystemClock, config.rewards.coins_per_hour);

    match action {
        SessionAction::Start { profile, subject } => {
            let profile = resolve_profile(&db, &profile)?;
            let session = service.start(&profile.id, &subject)?;
            println!("Session started: {}", session.id);
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
        SessionAction::Pause { id } => {
            let session = service.pause(&id)?;
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
        SessionAction::Resume { id } => {
            let session = service.resume(&id)?;
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
        SessionAction::Stop { id } => {
            let summary = service.stop(&id)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);

            let now = Utc::now();
            let profile_id = &summary.session.profile_id;
            let stats = db.stats_all(profile_id, now)?;
            let existing = db.list_achievements(profile_id)?;
            for achievement in milestone_achievements(profile_id, &stats, &existing, now) {
                db.insert_achievement(&achievement)?;
                println!(
                    "Achievement earned: {} ({} coins, claim with `studyhabit achievement claim {}`)",
                    achievement.title, achievement.reward_coins, achievement.id
                );
            }
        }
        SessionAction::Status { profile } => {
            let profile = resolve_profile(&db, &profile)?;
            match service.open_session(&profile.id)? {
                Some(session) => println!("{}", serde_json::to_string_pretty(&session)?),
                None => println!("No open session"),
            }
        }
    }
    Ok(())
}
