//! Emotion log commands.

use chrono::Utc;
use clap::Subcommand;
use studyhabit_core::emotion::{self, Emotion, EmotionEntry};
use studyhabit_core::storage::Database;

use crate::common::resolve_profile;

#[derive(Subcommand)]
pub enum EmotionAction {
    /// Log how a session felt
    Log {
        /// Profile ID or display name
        #[arg(long)]
        profile: String,
        /// Session ID the emotion belongs to
        #[arg(long)]
        session: String,
        /// Emotion: happy, sad, tired, calm, stressed or excited
        emotion: String,
        /// Free-form notes
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Latest emotion per day over the last seven days
    History {
        /// Profile ID or display name
        #[arg(long)]
        profile: String,
    },
    /// Totals, most frequent emotion and the logging streak
    Stats {
        /// Profile ID or display name
        #[arg(long)]
        profile: String,
    },
}

pub fn run(action: EmotionAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        EmotionAction::Log {
            profile,
            session,
            emotion,
            notes,
        } => {
            let profile = resolve_profile(&db, &profile)?;
            let emotion = Emotion::parse(&emotion)
                .ok_or_else(|| format!("unknown emotion: {emotion}"))?;
            if db.get_session(&session)?.is_none() {
                return Err(format!("Session not found: {session}").into());
            }
            let entry = EmotionEntry::new(&profile.id, &session, emotion, notes, Utc::now());
            db.insert_emotion(&entry)?;
            println!("{}", serde_json::to_string_pretty(&entry)?);
        }
        EmotionAction::History { profile } => {
            let profile = resolve_profile(&db, &profile)?;
            let entries = db.list_emotions(&profile.id)?;
            let history = emotion::weekly_history(&entries, Utc::now());
            println!("{}", serde_json::to_string_pretty(&history)?);
        }
        EmotionAction::Stats { profile } => {
            let profile = resolve_profile(&db, &profile)?;
            let entries = db.list_emotions(&profile.id)?;
            let stats = emotion::compute_stats(&entries, Utc::now());
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}
