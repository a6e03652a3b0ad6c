//! Profiles and the coin ledger.
//!
//! A profile owns the coin balance that session rewards, to-do rewards and
//! achievement claims credit, and that character purchases debit. All
//! balance mutations go through [`crate::storage::Database`] inside a
//! transaction together with whatever caused them; this module only holds
//! the data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The owning user's account, holding the coin balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub display_name: String,
    /// Coins earned from study time and completed tasks.
    pub coins: i64,
    /// IANA-style timezone label for display purposes.
    pub timezone: String,
    /// Whether deadline reminder messages should be produced.
    pub email_reminder: bool,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(display_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: format!("profile-{}", uuid::Uuid::new_v4()),
            display_name: display_name.into(),
            coins: 0,
            timezone: "UTC".to_string(),
            email_reminder: true,
            created_at: now,
        }
    }

    pub fn can_afford(&self, price: i64) -> bool {
        self.coins >= price
    }
}

/// Direction of a coin ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Earn,
    Spend,
}

/// One row in the coin ledger.
///
/// `amount` is always positive; `kind` carries the direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinTransaction {
    pub id: i64,
    pub profile_id: String,
    pub kind: TransactionKind,
    pub amount: i64,
    /// What the coins were for ("study session reward", "character: Luna", ...).
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_profile_starts_empty() {
        let p = Profile::new("alice", Utc::now());
        assert_eq!(p.coins, 0);
        assert!(p.email_reminder);
        assert!(p.can_afford(0));
        assert!(!p.can_afford(1));
    }
}
