//! Post-session emotion log and mood statistics.
//!
//! Each stopped session can get one emotion entry. The numeric mood score
//! feeds the duration estimator; the weekly history and streak feed the
//! dashboard.

use chrono::{DateTime, Duration, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How the session felt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Sad,
    Tired,
    Calm,
    Stressed,
    Excited,
}

impl Emotion {
    /// Mood on a 1-10 scale; 5 is the neutral default used when a
    /// profile has no entries at all.
    pub fn score(self) -> u8 {
        match self {
            Emotion::Excited => 10,
            Emotion::Happy => 9,
            Emotion::Calm => 7,
            Emotion::Tired => 4,
            Emotion::Stressed => 3,
            Emotion::Sad => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Tired => "tired",
            Emotion::Calm => "calm",
            Emotion::Stressed => "stressed",
            Emotion::Excited => "excited",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "happy" => Some(Emotion::Happy),
            "sad" => Some(Emotion::Sad),
            "tired" => Some(Emotion::Tired),
            "calm" => Some(Emotion::Calm),
            "stressed" => Some(Emotion::Stressed),
            "excited" => Some(Emotion::Excited),
            _ => None,
        }
    }
}

/// One logged emotion, tied to the session it followed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionEntry {
    pub id: String,
    pub profile_id: String,
    pub session_id: String,
    pub emotion: Emotion,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl EmotionEntry {
    pub fn new(
        profile_id: impl Into<String>,
        session_id: impl Into<String>,
        emotion: Emotion,
        notes: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: format!("emotion-{}", uuid::Uuid::new_v4()),
            profile_id: profile_id.into(),
            session_id: session_id.into(),
            emotion,
            notes: notes.into(),
            created_at: now,
        }
    }
}

/// One slot in the seven-day history, oldest first.
#[derive(Debug, Clone, Serialize)]
pub struct DaySlot {
    pub date: NaiveDate,
    pub weekday: Weekday,
    /// Latest emotion logged that day, if any.
    pub emotion: Option<Emotion>,
}

/// Aggregate view over a profile's entries.
#[derive(Debug, Clone, Serialize)]
pub struct EmotionStats {
    pub total_entries: usize,
    pub most_frequent: Option<Emotion>,
    pub most_frequent_count: usize,
    /// Consecutive days ending today with at least one entry.
    pub current_streak: u32,
}

/// Latest emotion per day over the last seven days (today inclusive).
pub fn weekly_history(entries: &[EmotionEntry], now: DateTime<Utc>) -> Vec<DaySlot> {
    let today = now.date_naive();
    (0..7)
        .rev()
        .map(|back| {
            let date = today - Duration::days(back);
            let emotion = entries
                .iter()
                .filter(|e| e.created_at.date_naive() == date)
                .max_by_key(|e| e.created_at)
                .map(|e| e.emotion);
            DaySlot {
                date,
                weekday: chrono::Datelike::weekday(&date),
                emotion,
            }
        })
        .collect()
}

/// Totals, most frequent emotion and the logging streak.
pub fn compute_stats(entries: &[EmotionEntry], now: DateTime<Utc>) -> EmotionStats {
    let mut counts: HashMap<Emotion, usize> = HashMap::new();
    for e in entries {
        *counts.entry(e.emotion).or_default() += 1;
    }
    let most = counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| a.0.as_str().cmp(b.0.as_str())))
        .map(|(emotion, count)| (*emotion, *count));

    let mut streak = 0u32;
    let mut day = now.date_naive();
    loop {
        let logged = entries.iter().any(|e| e.created_at.date_naive() == day);
        if !logged {
            break;
        }
        streak += 1;
        day -= Duration::days(1);
    }

    EmotionStats {
        total_entries: entries.len(),
        most_frequent: most.map(|(e, _)| e),
        most_frequent_count: most.map(|(_, c)| c).unwrap_or(0),
        current_streak: streak,
    }
}
