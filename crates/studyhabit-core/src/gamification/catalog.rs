//! Built-in character catalog seeded into a fresh database.

use super::{Character, Rarity};

/// Returns all built-in characters, cheapest first.
pub fn builtin_characters() -> Vec<Character> {
    vec![
        bunny(),
        turtle(),
        owl(),
        fox(),
        dragon(),
    ]
}

/// Find a built-in character by ID.
pub fn find_character(id: &str) -> Option<Character> {
    builtin_characters().into_iter().find(|c| c.id == id)
}

fn bunny() -> Character {
    Character {
        id: "bunny".to_string(),
        name: "Bunny".to_string(),
        price: 0,
        rarity: Rarity::Common,
        emoji: "🐰".to_string(),
        description: indoc::indoc! {"
            The starter companion, unlocked with every new account.
            Cheerful and easily excited about small wins.
        "}
        .trim()
        .to_string(),
        motivation_quotes: vec![
            "One page at a time!".to_string(),
            "You showed up. That's the hard part.".to_string(),
            "Small hops still move forward.".to_string(),
        ],
    }
}

fn turtle() -> Character {
    Character {
        id: "turtle".to_string(),
        name: "Turtle".to_string(),
        price: 100,
        rarity: Rarity::Common,
        emoji: "🐢".to_string(),
        description: indoc::indoc! {"
            Slow, steady, impossible to discourage. A good match for
            long reading sessions.
        "}
        .trim()
        .to_string(),
        motivation_quotes: vec![
            "Steady beats fast.".to_string(),
            "Keep your pace. The finish line is patient.".to_string(),
        ],
    }
}

fn owl() -> Character {
    Character {
        id: "owl".to_string(),
        name: "Owl".to_string(),
        price: 250,
        rarity: Rarity::Rare,
        emoji: "🦉".to_string(),
        description: indoc::indoc! {"
            Keeps you company through evening sessions and gently
            suggests you also sleep at some point.
        "}
        .trim()
        .to_string(),
        motivation_quotes: vec![
            "Focus now, rest later.".to_string(),
            "A sharp mind needs both study and sleep.".to_string(),
            "One more chapter, then a break.".to_string(),
        ],
    }
}

fn fox() -> Character {
    Character {
        id: "fox".to_string(),
        name: "Fox".to_string(),
        price: 400,
        rarity: Rarity::Rare,
        emoji: "🦊".to_string(),
        description: indoc::indoc! {"
            Clever and a little smug. Shows up when your streak does.
        "}
        .trim()
        .to_string(),
        motivation_quotes: vec![
            "Outsmart the exam: start early.".to_string(),
            "A streak this good deserves another day.".to_string(),
        ],
    }
}

fn dragon() -> Character {
    Character {
        id: "dragon".to_string(),
        name: "Dragon".to_string(),
        price: 1000,
        rarity: Rarity::Epic,
        emoji: "🐉".to_string(),
        description: indoc::indoc! {"
            The trophy companion. Earned, never given. Hoards knowledge
            the way other dragons hoard gold.
        "}
        .trim()
        .to_string(),
        motivation_quotes: vec![
            "Guard your focus like treasure.".to_string(),
            "Great hoards are built one coin at a time.".to_string(),
            "Burn through that reading list.".to_string(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_sorted_by_price_with_unique_ids() {
        let chars = builtin_characters();
        assert!(chars.windows(2).all(|w| w[0].price <= w[1].price));
        let mut ids: Vec<_> = chars.iter().map(|c| c.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), chars.len());
    }

    #[test]
    fn starter_is_free_and_findable() {
        let starter = find_character("bunny").unwrap();
        assert_eq!(starter.price, 0);
        assert!(find_character("unicorn").is_none());
    }
}
