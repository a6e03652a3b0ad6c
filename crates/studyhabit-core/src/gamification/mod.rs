//! Cosmetic characters, inventory and achievements.
//!
//! Characters are bought with coins and exactly one can be the active
//! companion at a time. Achievements carry a claim-once coin reward. The
//! purchase/activate/claim writes are transactional in the storage layer;
//! the types and rules live here.

pub mod catalog;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::WalletError;
use crate::session::RewardReceipt;
use crate::storage::StudyStats;

/// How rare a character is in the shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
}

impl Rarity {
    pub fn as_str(self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "common" => Some(Rarity::Common),
            "rare" => Some(Rarity::Rare),
            "epic" => Some(Rarity::Epic),
            _ => None,
        }
    }
}

/// A purchasable study companion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub name: String,
    /// Price in coins.
    pub price: i64,
    pub rarity: Rarity,
    pub emoji: String,
    pub description: String,
    /// Lines the companion says on the study screen.
    pub motivation_quotes: Vec<String>,
}

impl Character {
    /// A random motivation quote, with a stock line when the list is empty.
    pub fn random_quote(&self) -> &str {
        self.motivation_quotes
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or("Keep going, you can do it!")
    }
}

/// A character owned by a profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub profile_id: String,
    pub character_id: String,
    pub purchased_at: DateTime<Utc>,
    /// At most one entry per profile is active.
    pub is_active: bool,
}

/// A claim-once study milestone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub profile_id: String,
    pub title: String,
    pub description: String,
    pub reward_coins: i64,
    pub earned_at: DateTime<Utc>,
    pub is_claimed: bool,
}

impl Achievement {
    pub fn new(
        profile_id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        reward_coins: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: format!("achievement-{}", uuid::Uuid::new_v4()),
            profile_id: profile_id.into(),
            title: title.into(),
            description: description.into(),
            reward_coins,
            earned_at: now,
            is_claimed: false,
        }
    }

    /// Claim the reward. Claim-once: a second call is rejected instead of
    /// crediting again.
    pub fn claim(&self) -> Result<(Achievement, RewardReceipt), WalletError> {
        if self.is_claimed {
            return Err(WalletError::AlreadyClaimed(self.id.clone()));
        }
        let mut next = self.clone();
        next.is_claimed = true;
        let receipt = RewardReceipt {
            profile_id: next.profile_id.clone(),
            coins: next.reward_coins,
        };
        Ok((next, receipt))
    }
}

/// Milestones checked after every session stop. Returns the achievements
/// newly earned given the profile's totals, skipping any already held.
pub fn milestone_achievements(
    profile_id: &str,
    stats: &StudyStats,
    existing: &[Achievement],
    now: DateTime<Utc>,
) -> Vec<Achievement> {
    let milestones: [(&str, &str, i64, bool); 3] = [
        (
            "First session",
            "Complete your first study session",
            20,
            stats.total_sessions >= 1,
        ),
        (
            "Ten sessions",
            "Complete ten study sessions",
            50,
            stats.total_sessions >= 10,
        ),
        (
            "Ten hours",
            "Study for ten hours in total",
            100,
            stats.total_seconds >= 36_000,
        ),
    ];

    milestones
        .into_iter()
        .filter(|(title, _, _, reached)| {
            *reached && !existing.iter().any(|a| a.title == *title)
        })
        .map(|(title, description, coins, _)| {
            Achievement::new(profile_id, title, description, coins, now)
        })
        .collect()
}
