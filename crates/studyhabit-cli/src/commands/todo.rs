//! To-do commands: creation with duration prediction, completion with
//! coin rewards, and the deadline reminder scan.

use clap::Subcommand;
use studyhabit_core::clock::SystemClock;
use studyhabit_core::storage::{Config, Database};
use studyhabit_core::todo::{Category, Priority, ToDoDraft};
use studyhabit_core::{DurationEstimator, ToDoService};

use crate::common::{parse_timestamp, resolve_profile};

#[derive(Subcommand)]
pub enum TodoAction {
    /// Create a to-do item
    Create {
        /// Profile ID or display name
        #[arg(long)]
        profile: String,
        /// Item title
        title: String,
        /// Item description
        #[arg(long, default_value = "")]
        description: String,
        /// Category: study, homework, project, review or other
        #[arg(long, default_value = "study")]
        category: String,
        /// Priority: low, medium or high
        #[arg(long, default_value = "medium")]
        priority: String,
        /// Deadline as RFC 3339 (e.g. "2026-09-01T18:00:00Z")
        #[arg(long)]
        deadline: Option<String>,
        /// Explicit coin reward (default: from priority)
        #[arg(long)]
        reward: Option<i64>,
    },
    /// List to-do items
    List {
        /// Profile ID or display name
        #[arg(long)]
        profile: String,
        /// Show completed items instead of open ones
        #[arg(long)]
        completed: bool,
        /// Only items already past their deadline
        #[arg(long, conflicts_with = "completed")]
        overdue: bool,
    },
    /// Complete an item and collect its reward
    Complete {
        /// To-do ID
        id: String,
    },
    /// Change an item's priority (the reward stays as assigned)
    SetPriority {
        /// To-do ID
        id: String,
        /// New priority: low, medium or high
        priority: String,
    },
    /// Scan for due deadline reminders
    Reminders {
        /// Profile ID or display name
        #[arg(long)]
        profile: String,
    },
}

pub fn run(action: TodoAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let config = Config::load_or_default();
    let service = ToDoService::new(&db, SystemClock, config.reminders.window_hours);

    match action {
        TodoAction::Create {
            profile,
            title,
            description,
            category,
            priority,
            deadline,
            reward,
        } => {
            let profile = resolve_profile(&db, &profile)?;
            let draft = ToDoDraft {
                title,
                description,
                category: Some(parse_category(&category)?),
                priority: Some(parse_priority(&priority)?),
                deadline: deadline.as_deref().map(parse_timestamp).transpose()?,
                reward_coins: reward,
            };
            let estimator = DurationEstimator::new(db.load_model()?);
            let item = service.create(&profile.id, draft, &estimator)?;
            println!("Todo created: {}", item.id);
            println!("{}", serde_json::to_string_pretty(&item)?);
        }
        TodoAction::List {
            profile,
            completed,
            overdue,
        } => {
            let profile = resolve_profile(&db, &profile)?;
            let mut items = db.list_todos(&profile.id, completed)?;
            if overdue {
                let now = chrono::Utc::now();
                items.retain(|item| item.is_overdue(now));
            }
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        TodoAction::Complete { id } => {
            let summary = service.complete(&id)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        TodoAction::SetPriority { id, priority } => {
            let item = service.set_priority(&id, parse_priority(&priority)?)?;
            println!("{}", serde_json::to_string_pretty(&item)?);
        }
        TodoAction::Reminders { profile } => {
            let profile = resolve_profile(&db, &profile)?;
            let pending = service.scan_reminders(&profile.id)?;
            println!("{}", serde_json::to_string_pretty(&pending)?);
        }
    }
    Ok(())
}

fn parse_priority(s: &str) -> Result<Priority, Box<dyn std::error::Error>> {
    Priority::parse(s).ok_or_else(|| format!("unknown priority: {s}").into())
}

fn parse_category(s: &str) -> Result<Category, Box<dyn std::error::Error>> {
    Category::parse(s).ok_or_else(|| format!("unknown category: {s}").into())
}
