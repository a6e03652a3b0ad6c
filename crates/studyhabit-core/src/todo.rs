//! To-do items: coin rewards, deadline reminders, duration prediction.
//!
//! `reward_coins` and `predicted_duration` are compute-if-absent fields:
//! both are assigned once when the item is created and never recomputed,
//! so editing the priority later does not change the reward.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::{CoreError, Result};
use crate::estimator::{DurationEstimator, EstimateInput};
use crate::profile::Profile;
use crate::session::RewardReceipt;
use crate::storage::Database;

/// Priority of a to-do item. Drives the fixed coin reward and the
/// fallback duration estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Fixed coin reward, assigned once at creation.
    pub fn reward_coins(self) -> i64 {
        match self {
            Priority::Low => 10,
            Priority::Medium => 25,
            Priority::High => 50,
        }
    }

    /// Ordinal score used as a regression feature.
    pub fn ordinal(self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }

    /// Fallback estimate in minutes when no trained model exists.
    pub fn default_estimate_minutes(self) -> u32 {
        match self {
            Priority::Low => 30,
            Priority::Medium => 60,
            Priority::High => 90,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

/// Kind of work the item represents. Label-encoded regression feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Study,
    Homework,
    Project,
    Review,
    Other,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Study => "study",
            Category::Homework => "homework",
            Category::Project => "project",
            Category::Review => "review",
            Category::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "study" => Some(Category::Study),
            "homework" => Some(Category::Homework),
            "project" => Some(Category::Project),
            "review" => Some(Category::Review),
            "other" => Some(Category::Other),
            _ => None,
        }
    }
}

/// A to-do item with its reward and prediction facet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToDoItem {
    pub id: String,
    pub profile_id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub priority: Priority,
    pub deadline: Option<DateTime<Utc>>,
    pub is_completed: bool,
    /// Set once a reminder message has been produced for this item.
    pub reminder_sent: bool,
    /// Assigned exactly once, at creation.
    pub reward_coins: i64,
    /// Minutes, predicted exactly once, at creation.
    pub predicted_duration: Option<u32>,
    /// Minutes, recorded at completion. Later used as training data.
    pub actual_duration: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields the caller supplies when creating an item.
#[derive(Debug, Clone, Default)]
pub struct ToDoDraft {
    pub title: String,
    pub description: String,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub deadline: Option<DateTime<Utc>>,
    /// Explicit reward override; when absent the priority mapping applies.
    pub reward_coins: Option<i64>,
}

/// Result of a successful completion: the terminal item plus the credit.
#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    pub item: ToDoItem,
    pub receipt: RewardReceipt,
}

/// Human-facing remaining time until the deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TimeLeft {
    NoDeadline,
    Overdue,
    Remaining { hours: i64, minutes: i64 },
}

impl std::fmt::Display for TimeLeft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeLeft::NoDeadline => write!(f, "No deadline"),
            TimeLeft::Overdue => write!(f, "Overdue"),
            TimeLeft::Remaining { hours, minutes } => write!(f, "{hours}h {minutes}m left"),
        }
    }
}

impl ToDoItem {
    /// Build an item from a draft, applying the compute-if-absent rules
    /// for the reward. The duration prediction is filled in by
    /// [`ToDoService::create`], which has access to the estimator.
    pub fn from_draft(profile_id: impl Into<String>, draft: ToDoDraft, now: DateTime<Utc>) -> Self {
        let priority = draft.priority.unwrap_or(Priority::Medium);
        let reward_coins = draft
            .reward_coins
            .filter(|c| *c > 0)
            .unwrap_or_else(|| priority.reward_coins());
        Self {
            id: format!("todo-{}", uuid::Uuid::new_v4()),
            profile_id: profile_id.into(),
            title: draft.title,
            description: draft.description,
            category: draft.category.unwrap_or(Category::Study),
            priority,
            deadline: draft.deadline,
            is_completed: false,
            reminder_sent: false,
            reward_coins,
            predicted_duration: None,
            actual_duration: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Fill in the prediction if it has never been set.
    pub fn ensure_prediction(&mut self, minutes: u32) {
        if self.predicted_duration.is_none() {
            self.predicted_duration = Some(minutes);
        }
    }

    /// Change the priority. The reward was fixed at creation and is
    /// deliberately left alone.
    pub fn set_priority(&mut self, priority: Priority, now: DateTime<Utc>) {
        self.priority = priority;
        self.updated_at = now;
    }

    /// Mark the item complete, recording the actual duration in minutes
    /// and producing the coin credit. Completing a completed item is
    /// rejected so the reward cannot be credited twice.
    pub fn complete(&self, now: DateTime<Utc>) -> Result<CompletionOutcome> {
        if self.is_completed {
            return Err(CoreError::Custom(format!(
                "to-do '{}' is already completed",
                self.id
            )));
        }
        let minutes = (now - self.created_at).num_minutes().max(0) as u32;
        let mut next = self.clone();
        next.is_completed = true;
        next.actual_duration = Some(minutes);
        next.updated_at = now;
        let receipt = RewardReceipt {
            profile_id: next.profile_id.clone(),
            coins: next.reward_coins,
        };
        Ok(CompletionOutcome {
            item: next,
            receipt,
        })
    }

    pub fn time_left(&self, now: DateTime<Utc>) -> TimeLeft {
        let Some(deadline) = self.deadline else {
            return TimeLeft::NoDeadline;
        };
        let delta = deadline - now;
        if delta < Duration::zero() {
            return TimeLeft::Overdue;
        }
        let total_minutes = delta.num_minutes();
        TimeLeft::Remaining {
            hours: total_minutes / 60,
            minutes: total_minutes % 60,
        }
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        match self.deadline {
            Some(deadline) => now > deadline && !self.is_completed,
            None => false,
        }
    }

    /// Whether a reminder should be produced now: incomplete, not yet
    /// reminded, and the deadline falls inside the window ahead of us.
    pub fn should_send_reminder(&self, now: DateTime<Utc>, window: Duration) -> bool {
        match self.deadline {
            Some(deadline) => {
                !self.is_completed
                    && !self.reminder_sent
                    && deadline > now
                    && deadline - now <= window
            }
            None => false,
        }
    }

    /// Reminder body for the outbox. Transport is someone else's job.
    pub fn reminder_message(&self, profile: &Profile) -> String {
        let deadline = self
            .deadline
            .map(|d| d.format("%H:%M %d/%m/%Y").to_string())
            .unwrap_or_else(|| "soon".to_string());
        let duration = match self.predicted_duration {
            Some(m) if m >= 60 => format!("{}h {}m", m / 60, m % 60),
            Some(m) => format!("{m}m"),
            None => "not predicted".to_string(),
        };
        format!(
            "Hello {},\n\nYour task \"{}\" is due on {}.\nEstimated duration: {}\nReward: {} coins\n\nComplete it soon to earn your reward!",
            profile.display_name, self.title, deadline, duration, self.reward_coins
        )
    }
}

/// Audit row for produced reminders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderLog {
    pub id: i64,
    pub todo_id: String,
    pub sent_at: DateTime<Utc>,
    pub status: String,
}

/// A reminder ready to hand to an external transport.
#[derive(Debug, Clone, Serialize)]
pub struct PendingReminder {
    pub todo_id: String,
    pub title: String,
    pub deadline: DateTime<Utc>,
    pub message: String,
}

/// What `complete()` reports back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionSummary {
    pub item: ToDoItem,
    pub reward_coins: i64,
    pub new_balance: i64,
}

/// Storage-backed to-do operations.
pub struct ToDoService<'a, C: Clock> {
    db: &'a Database,
    clock: C,
    /// Hours ahead of a deadline inside which a reminder fires.
    reminder_window_hours: u32,
}

impl<'a, C: Clock> ToDoService<'a, C> {
    pub fn new(db: &'a Database, clock: C, reminder_window_hours: u32) -> Self {
        Self {
            db,
            clock,
            reminder_window_hours,
        }
    }

    /// Create an item. The reward and the duration prediction are both
    /// assigned here, once; the prediction goes through the estimator and
    /// therefore never fails.
    pub fn create(
        &self,
        profile_id: &str,
        draft: ToDoDraft,
        estimator: &DurationEstimator,
    ) -> Result<ToDoItem> {
        if self.db.get_profile(profile_id)?.is_none() {
            return Err(CoreError::NotFound {
                kind: "profile",
                id: profile_id.to_string(),
            });
        }
        let now = self.clock.now();
        let mut item = ToDoItem::from_draft(profile_id, draft, now);

        let input = EstimateInput {
            category: item.category,
            priority: item.priority,
            description_len: item.description.chars().count(),
            has_deadline: item.deadline.is_some(),
            created_at: item.created_at,
            avg_session_minutes: self.db.avg_session_minutes(profile_id)?,
            mood_score: self.db.latest_mood_score(profile_id)?,
        };
        item.ensure_prediction(estimator.estimate(&input));

        self.db.insert_todo(&item)?;
        Ok(item)
    }

    /// Complete an item, crediting its reward exactly once.
    pub fn complete(&self, todo_id: &str) -> Result<CompletionSummary> {
        let item = self.load(todo_id)?;
        let outcome = item.complete(self.clock.now())?;
        let new_balance = self.db.finalize_todo(&outcome)?;
        Ok(CompletionSummary {
            reward_coins: outcome.item.reward_coins,
            item: outcome.item,
            new_balance,
        })
    }

    /// Edit the priority. The reward stays as assigned at creation.
    pub fn set_priority(&self, todo_id: &str, priority: Priority) -> Result<ToDoItem> {
        let mut item = self.load(todo_id)?;
        item.set_priority(priority, self.clock.now());
        self.db.update_todo(&item)?;
        Ok(item)
    }

    /// Collect due reminders for a profile, marking each item reminded
    /// and logging it. Returns the messages for an external transport.
    pub fn scan_reminders(&self, profile_id: &str) -> Result<Vec<PendingReminder>> {
        let profile = self
            .db
            .get_profile(profile_id)?
            .ok_or_else(|| CoreError::NotFound {
                kind: "profile",
                id: profile_id.to_string(),
            })?;
        if !profile.email_reminder {
            return Ok(Vec::new());
        }

        let now = self.clock.now();
        let window = Duration::hours(self.reminder_window_hours as i64);
        let mut pending = Vec::new();
        for item in self.db.list_todos(profile_id, false)? {
            if !item.should_send_reminder(now, window) {
                continue;
            }
            let Some(deadline) = item.deadline else {
                continue;
            };
            let mut reminded = item.clone();
            reminded.reminder_sent = true;
            reminded.updated_at = now;
            self.db.update_todo(&reminded)?;
            self.db.log_reminder(&item.id, now, "queued")?;
            pending.push(PendingReminder {
                todo_id: item.id.clone(),
                title: item.title.clone(),
                deadline,
                message: item.reminder_message(&profile),
            });
        }
        Ok(pending)
    }

    /// Completed items with a recorded actual duration, as estimator
    /// training input.
    pub fn training_samples(&self, profile_id: &str) -> Result<Vec<crate::estimator::TrainingExample>> {
        let avg = self.db.avg_session_minutes(profile_id)?;
        let mood = self.db.latest_mood_score(profile_id)?;
        let mut samples = Vec::new();
        for item in self.db.list_todos(profile_id, true)? {
            let Some(actual) = item.actual_duration else {
                continue;
            };
            samples.push(crate::estimator::TrainingExample {
                input: EstimateInput {
                    category: item.category,
                    priority: item.priority,
                    description_len: item.description.chars().count(),
                    has_deadline: item.deadline.is_some(),
                    created_at: item.created_at,
                    avg_session_minutes: avg,
                    mood_score: mood,
                },
                actual_minutes: actual,
            });
        }
        Ok(samples)
    }

    fn load(&self, todo_id: &str) -> Result<ToDoItem> {
        self.db
            .get_todo(todo_id)?
            .ok_or_else(|| CoreError::NotFound {
                kind: "todo",
                id: todo_id.to_string(),
            })
    }
}
