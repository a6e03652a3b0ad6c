//! Character shop and inventory commands.

use chrono::Utc;
use clap::Subcommand;
use studyhabit_core::gamification::catalog;
use studyhabit_core::storage::Database;

use crate::common::resolve_profile;

#[derive(Subcommand)]
pub enum ShopAction {
    /// List characters for sale
    List,
    /// Buy a character
    Buy {
        /// Profile ID or display name
        #[arg(long)]
        profile: String,
        /// Character ID
        character: String,
    },
    /// Make an owned character the active companion
    Activate {
        /// Profile ID or display name
        #[arg(long)]
        profile: String,
        /// Character ID
        character: String,
    },
    /// List owned characters
    Inventory {
        /// Profile ID or display name
        #[arg(long)]
        profile: String,
    },
    /// A motivation quote from the active companion
    Quote {
        /// Profile ID or display name
        #[arg(long)]
        profile: String,
    },
}

pub fn run(action: ShopAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        ShopAction::List => {
            let mut characters = db.list_characters()?;
            if characters.is_empty() {
                for character in catalog::builtin_characters() {
                    db.upsert_character(&character)?;
                }
                characters = db.list_characters()?;
            }
            println!("{}", serde_json::to_string_pretty(&characters)?);
        }
        ShopAction::Buy { profile, character } => {
            let profile = resolve_profile(&db, &profile)?;
            // A built-in not yet in the shop table is seeded on demand.
            if db.get_character(&character)?.is_none() {
                if let Some(builtin) = catalog::find_character(&character) {
                    db.upsert_character(&builtin)?;
                }
            }
            let balance = db.purchase_character(&profile.id, &character, Utc::now())?;
            println!("Purchased {character}. Balance: {balance} coins");
        }
        ShopAction::Activate { profile, character } => {
            let profile = resolve_profile(&db, &profile)?;
            db.activate_character(&profile.id, &character)?;
            println!("Active companion: {character}");
        }
        ShopAction::Inventory { profile } => {
            let profile = resolve_profile(&db, &profile)?;
            let inventory = db.list_inventory(&profile.id)?;
            println!("{}", serde_json::to_string_pretty(&inventory)?);
        }
        ShopAction::Quote { profile } => {
            let profile = resolve_profile(&db, &profile)?;
            let active = db
                .list_inventory(&profile.id)?
                .into_iter()
                .find(|entry| entry.is_active)
                .ok_or("No active companion")?;
            let character = db
                .get_character(&active.character_id)?
                .ok_or_else(|| format!("Character not found: {}", active.character_id))?;
            println!("{} {}", character.emoji, character.random_quote());
        }
    }
    Ok(())
}
