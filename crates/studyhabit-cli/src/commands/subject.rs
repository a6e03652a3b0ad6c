//! Subject management commands.

use chrono::Utc;
use clap::Subcommand;
use studyhabit_core::storage::Database;
use studyhabit_core::Subject;

use crate::common::resolve_profile;

#[derive(Subcommand)]
pub enum SubjectAction {
    /// Create a subject
    Create {
        /// Profile ID or display name
        #[arg(long)]
        profile: String,
        /// Subject name
        name: String,
        /// HEX display color
        #[arg(long, default_value = "#4a90d9")]
        color: String,
        /// Weekly study target in hours
        #[arg(long, default_value = "5.0")]
        target_hours: f64,
    },
    /// List subjects
    List {
        /// Profile ID or display name
        #[arg(long)]
        profile: String,
    },
    /// Hours studied this week against each subject's target
    Progress {
        /// Profile ID or display name
        #[arg(long)]
        profile: String,
    },
}

pub fn run(action: SubjectAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        SubjectAction::Create {
            profile,
            name,
            color,
            target_hours,
        } => {
            let profile = resolve_profile(&db, &profile)?;
            let subject = Subject::new(&profile.id, name, color, target_hours, Utc::now());
            db.insert_subject(&subject)?;
            println!("Subject created: {}", subject.id);
            println!("{}", serde_json::to_string_pretty(&subject)?);
        }
        SubjectAction::List { profile } => {
            let profile = resolve_profile(&db, &profile)?;
            let subjects = db.list_subjects(&profile.id)?;
            println!("{}", serde_json::to_string_pretty(&subjects)?);
        }
        SubjectAction::Progress { profile } => {
            let profile = resolve_profile(&db, &profile)?;
            let progress = db.weekly_progress(&profile.id, Utc::now())?;
            println!("{}", serde_json::to_string_pretty(&progress)?);
        }
    }
    Ok(())
}
