//! SQLite-based storage for profiles, sessions, to-dos and the rest.
//!
//! One connection, one schema. Everything that must be atomic with a coin
//! credit or debit (session finalization, to-do completion, achievement
//! claims, character purchases) runs inside a transaction here, guarded
//! by the row's own terminal flag so replays affect zero rows and are
//! reported as conflicts instead of re-crediting.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::emotion::{Emotion, EmotionEntry};
use crate::error::{CoreError, Result, SessionError, WalletError};
use crate::estimator::ModelSnapshot;
use crate::gamification::{Achievement, Character, InventoryEntry, Rarity};
use crate::profile::{CoinTransaction, Profile, TransactionKind};
use crate::session::{StopOutcome, StudySession};
use crate::subject::{start_of_week, Subject, WeeklyProgress};
use crate::todo::{Category, CompletionOutcome, Priority, ReminderLog, ToDoItem};

/// kv key under which the trained estimator snapshot is persisted.
const MODEL_KEY: &str = "duration_model";

/// Study totals for the dashboard.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct StudyStats {
    pub total_sessions: u64,
    pub total_seconds: u64,
    pub total_points: i64,
    pub today_sessions: u64,
    pub today_seconds: u64,
}

/// SQLite database holding all studyhabit state.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/studyhabit/studyhabit.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let path = super::data_dir()?.join("studyhabit.db");
        Self::open_at(&path)
    }

    /// Open (and migrate) the database at an explicit path.
    pub fn open_at(path: &std::path::Path) -> Result<Self, Box<dyn std::error::Error>> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, Box<dyn std::error::Error>> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS profiles (
                id             TEXT PRIMARY KEY,
                display_name   TEXT NOT NULL,
                coins          INTEGER NOT NULL DEFAULT 0,
                timezone       TEXT NOT NULL DEFAULT 'UTC',
                email_reminder INTEGER NOT NULL DEFAULT 1,
                created_at     TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS subjects (
                id                    TEXT PRIMARY KEY,
                profile_id            TEXT NOT NULL REFERENCES profiles(id),
                name                  TEXT NOT NULL,
                color                 TEXT NOT NULL,
                target_hours_per_week REAL NOT NULL DEFAULT 5.0,
                created_at            TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sessions (
                id                  TEXT PRIMARY KEY,
                profile_id          TEXT NOT NULL REFERENCES profiles(id),
                subject_id          TEXT NOT NULL REFERENCES subjects(id),
                start_time          TEXT NOT NULL,
                pause_time          TEXT,
                total_pause_seconds INTEGER NOT NULL DEFAULT 0,
                end_time            TEXT,
                duration_seconds    INTEGER NOT NULL DEFAULT 0,
                points_awarded      INTEGER NOT NULL DEFAULT 0,
                is_active           INTEGER NOT NULL DEFAULT 1
            );

            CREATE TABLE IF NOT EXISTS todos (
                id                 TEXT PRIMARY KEY,
                profile_id         TEXT NOT NULL REFERENCES profiles(id),
                title              TEXT NOT NULL,
                description        TEXT NOT NULL DEFAULT '',
                category           TEXT NOT NULL,
                priority           TEXT NOT NULL,
                deadline           TEXT,
                is_completed       INTEGER NOT NULL DEFAULT 0,
                reminder_sent      INTEGER NOT NULL DEFAULT 0,
                reward_coins       INTEGER NOT NULL,
                predicted_duration INTEGER,
                actual_duration    INTEGER,
                created_at         TEXT NOT NULL,
                updated_at         TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS reminder_log (
                id      INTEGER PRIMARY KEY AUTOINCREMENT,
                todo_id TEXT NOT NULL REFERENCES todos(id),
                sent_at TEXT NOT NULL,
                status  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS emotions (
                id         TEXT PRIMARY KEY,
                profile_id TEXT NOT NULL REFERENCES profiles(id),
                session_id TEXT NOT NULL REFERENCES sessions(id),
                emotion    TEXT NOT NULL,
                notes      TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS characters (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                price       INTEGER NOT NULL,
                rarity      TEXT NOT NULL,
                emoji       TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                quotes      TEXT NOT NULL DEFAULT '[]'
            );

            CREATE TABLE IF NOT EXISTS inventory (
                profile_id   TEXT NOT NULL REFERENCES profiles(id),
                character_id TEXT NOT NULL REFERENCES characters(id),
                purchased_at TEXT NOT NULL,
                is_active    INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (profile_id, character_id)
            );

            CREATE TABLE IF NOT EXISTS achievements (
                id           TEXT PRIMARY KEY,
                profile_id   TEXT NOT NULL REFERENCES profiles(id),
                title        TEXT NOT NULL,
                description  TEXT NOT NULL DEFAULT '',
                reward_coins INTEGER NOT NULL,
                earned_at    TEXT NOT NULL,
                is_claimed   INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS coin_ledger (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                profile_id TEXT NOT NULL REFERENCES profiles(id),
                kind       TEXT NOT NULL,
                amount     INTEGER NOT NULL,
                reason     TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_profile_open
                ON sessions(profile_id) WHERE end_time IS NULL;
            CREATE INDEX IF NOT EXISTS idx_sessions_subject_start
                ON sessions(subject_id, start_time);
            CREATE INDEX IF NOT EXISTS idx_todos_profile_completed
                ON todos(profile_id, is_completed);
            CREATE INDEX IF NOT EXISTS idx_emotions_profile_created
                ON emotions(profile_id, created_at);",
        )?;
        Ok(())
    }

    // ── Profiles & ledger ───────────────────────────────────────────

    pub fn insert_profile(&self, profile: &Profile) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO profiles (id, display_name, coins, timezone, email_reminder, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                profile.id,
                profile.display_name,
                profile.coins,
                profile.timezone,
                profile.email_reminder as i64,
                profile.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_profile(&self, id: &str) -> Result<Option<Profile>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT id, display_name, coins, timezone, email_reminder, created_at
                 FROM profiles WHERE id = ?1",
                params![id],
                row_to_profile,
            )
            .optional()
    }

    /// Non-balance profile edits. Coins only move through the
    /// transactional credit/debit paths.
    pub fn update_profile(&self, profile: &Profile) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "UPDATE profiles SET display_name = ?2, timezone = ?3, email_reminder = ?4
             WHERE id = ?1",
            params![
                profile.id,
                profile.display_name,
                profile.timezone,
                profile.email_reminder as i64,
            ],
        )?;
        Ok(())
    }

    /// Look a profile up by id or, failing that, by display name.
    pub fn find_profile(&self, id_or_name: &str) -> Result<Option<Profile>, rusqlite::Error> {
        if let Some(profile) = self.get_profile(id_or_name)? {
            return Ok(Some(profile));
        }
        self.conn
            .query_row(
                "SELECT id, display_name, coins, timezone, email_reminder, created_at
                 FROM profiles WHERE display_name = ?1 ORDER BY created_at LIMIT 1",
                params![id_or_name],
                row_to_profile,
            )
            .optional()
    }

    pub fn list_transactions(
        &self,
        profile_id: &str,
    ) -> Result<Vec<CoinTransaction>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, profile_id, kind, amount, reason, created_at
             FROM coin_ledger WHERE profile_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![profile_id], |row| {
            Ok(CoinTransaction {
                id: row.get(0)?,
                profile_id: row.get(1)?,
                kind: match row.get::<_, String>(2)?.as_str() {
                    "spend" => TransactionKind::Spend,
                    _ => TransactionKind::Earn,
                },
                amount: row.get(3)?,
                reason: row.get(4)?,
                created_at: parse_ts(row.get(5)?)?,
            })
        })?;
        rows.collect()
    }

    // ── Subjects ────────────────────────────────────────────────────

    pub fn insert_subject(&self, subject: &Subject) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO subjects (id, profile_id, name, color, target_hours_per_week, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                subject.id,
                subject.profile_id,
                subject.name,
                subject.color,
                subject.target_hours_per_week,
                subject.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_subject(&self, id: &str) -> Result<Option<Subject>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT id, profile_id, name, color, target_hours_per_week, created_at
                 FROM subjects WHERE id = ?1",
                params![id],
                row_to_subject,
            )
            .optional()
    }

    pub fn list_subjects(&self, profile_id: &str) -> Result<Vec<Subject>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, profile_id, name, color, target_hours_per_week, created_at
             FROM subjects WHERE profile_id = ?1 ORDER BY created_at",
        )?;
        let rows = stmt.query_map(params![profile_id], row_to_subject)?;
        rows.collect()
    }

    /// Hours studied per subject since Monday, against the weekly target.
    pub fn weekly_progress(
        &self,
        profile_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<WeeklyProgress>, rusqlite::Error> {
        let week_start = start_of_week(now).to_rfc3339();
        let mut stmt = self.conn.prepare(
            "SELECT s.id, s.name, s.target_hours_per_week,
                    COALESCE(SUM(x.duration_seconds), 0)
             FROM subjects s
             LEFT JOIN sessions x
                ON x.subject_id = s.id
               AND x.end_time IS NOT NULL
               AND x.start_time >= ?2
             WHERE s.profile_id = ?1
             GROUP BY s.id
             ORDER BY s.created_at",
        )?;
        let rows = stmt.query_map(params![profile_id, week_start], |row| {
            let seconds: i64 = row.get(3)?;
            Ok(WeeklyProgress {
                subject_id: row.get(0)?,
                subject_name: row.get(1)?,
                target_hours_per_week: row.get(2)?,
                hours_this_week: seconds as f64 / 3600.0,
            })
        })?;
        rows.collect()
    }

    // ── Sessions ────────────────────────────────────────────────────

    pub fn insert_session(&self, session: &StudySession) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO sessions (id, profile_id, subject_id, start_time, pause_time,
                                   total_pause_seconds, end_time, duration_seconds,
                                   points_awarded, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                session.id,
                session.profile_id,
                session.subject_id,
                session.start_time.to_rfc3339(),
                session.pause_time.map(|t| t.to_rfc3339()),
                session.total_pause_seconds,
                session.end_time.map(|t| t.to_rfc3339()),
                session.duration_seconds,
                session.points_awarded,
                session.is_active as i64,
            ],
        )?;
        Ok(())
    }

    pub fn get_session(&self, id: &str) -> Result<Option<StudySession>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT id, profile_id, subject_id, start_time, pause_time,
                        total_pause_seconds, end_time, duration_seconds,
                        points_awarded, is_active
                 FROM sessions WHERE id = ?1",
                params![id],
                row_to_session,
            )
            .optional()
    }

    /// The profile's open session (no end time), if any. The service
    /// layer turns a hit into a start conflict.
    pub fn open_session_for(
        &self,
        profile_id: &str,
    ) -> Result<Option<StudySession>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT id, profile_id, subject_id, start_time, pause_time,
                        total_pause_seconds, end_time, duration_seconds,
                        points_awarded, is_active
                 FROM sessions WHERE profile_id = ?1 AND end_time IS NULL
                 ORDER BY start_time DESC LIMIT 1",
                params![profile_id],
                row_to_session,
            )
            .optional()
    }

    /// Persist a pause/resume snapshot. Only the timing fields move.
    pub fn update_session_timing(&self, session: &StudySession) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "UPDATE sessions
             SET pause_time = ?2, total_pause_seconds = ?3, is_active = ?4
             WHERE id = ?1 AND end_time IS NULL",
            params![
                session.id,
                session.pause_time.map(|t| t.to_rfc3339()),
                session.total_pause_seconds,
                session.is_active as i64,
            ],
        )?;
        Ok(())
    }

    /// Apply a stop: terminal session write plus coin credit, one
    /// transaction. The `end_time IS NULL` guard is the compare-and-swap
    /// that makes a second stop a conflict instead of a double credit.
    ///
    /// Returns the profile's balance after the credit.
    pub fn finalize_session(&self, outcome: &StopOutcome) -> Result<i64> {
        let session = &outcome.session;
        let end_time = session
            .end_time
            .ok_or_else(|| CoreError::Custom("finalize called on an open session".into()))?;

        let tx = self.conn.unchecked_transaction().map_err(CoreError::from)?;
        let updated = tx.execute(
            "UPDATE sessions
             SET pause_time = NULL, total_pause_seconds = ?2, end_time = ?3,
                 duration_seconds = ?4, points_awarded = ?5, is_active = 0
             WHERE id = ?1 AND end_time IS NULL",
            params![
                session.id,
                session.total_pause_seconds,
                end_time.to_rfc3339(),
                session.duration_seconds,
                session.points_awarded,
            ],
        )?;
        if updated == 0 {
            return Err(SessionError::AlreadyStopped(session.id.clone()).into());
        }

        let balance = credit(
            &tx,
            &outcome.receipt.profile_id,
            outcome.receipt.coins,
            "study session reward",
            end_time,
        )?;
        tx.commit().map_err(CoreError::from)?;
        Ok(balance)
    }

    /// Average net duration of the profile's stopped sessions, in minutes.
    pub fn avg_session_minutes(&self, profile_id: &str) -> Result<Option<f64>, rusqlite::Error> {
        self.conn.query_row(
            "SELECT AVG(duration_seconds) / 60.0 FROM sessions
             WHERE profile_id = ?1 AND end_time IS NOT NULL",
            params![profile_id],
            |row| row.get::<_, Option<f64>>(0),
        )
    }

    /// All-time and today totals for the dashboard.
    pub fn stats_all(&self, profile_id: &str, now: DateTime<Utc>) -> Result<StudyStats, rusqlite::Error> {
        let mut stats = StudyStats::default();
        let row = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(duration_seconds), 0), COALESCE(SUM(points_awarded), 0)
             FROM sessions WHERE profile_id = ?1 AND end_time IS NOT NULL",
            params![profile_id],
            |row| {
                Ok((
                    row.get::<_, u64>(0)?,
                    row.get::<_, u64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            },
        )?;
        stats.total_sessions = row.0;
        stats.total_seconds = row.1;
        stats.total_points = row.2;

        let today = format!("{}T00:00:00+00:00", now.format("%Y-%m-%d"));
        let row = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(duration_seconds), 0)
             FROM sessions
             WHERE profile_id = ?1 AND end_time IS NOT NULL AND end_time >= ?2",
            params![profile_id, today],
            |row| Ok((row.get::<_, u64>(0)?, row.get::<_, u64>(1)?)),
        )?;
        stats.today_sessions = row.0;
        stats.today_seconds = row.1;
        Ok(stats)
    }

    // ── To-dos ──────────────────────────────────────────────────────

    pub fn insert_todo(&self, item: &ToDoItem) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO todos (id, profile_id, title, description, category, priority,
                                deadline, is_completed, reminder_sent, reward_coins,
                                predicted_duration, actual_duration, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                item.id,
                item.profile_id,
                item.title,
                item.description,
                item.category.as_str(),
                item.priority.as_str(),
                item.deadline.map(|t| t.to_rfc3339()),
                item.is_completed as i64,
                item.reminder_sent as i64,
                item.reward_coins,
                item.predicted_duration,
                item.actual_duration,
                item.created_at.to_rfc3339(),
                item.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_todo(&self, id: &str) -> Result<Option<ToDoItem>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT id, profile_id, title, description, category, priority, deadline,
                        is_completed, reminder_sent, reward_coins, predicted_duration,
                        actual_duration, created_at, updated_at
                 FROM todos WHERE id = ?1",
                params![id],
                row_to_todo,
            )
            .optional()
    }

    pub fn list_todos(
        &self,
        profile_id: &str,
        completed: bool,
    ) -> Result<Vec<ToDoItem>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, profile_id, title, description, category, priority, deadline,
                    is_completed, reminder_sent, reward_coins, predicted_duration,
                    actual_duration, created_at, updated_at
             FROM todos WHERE profile_id = ?1 AND is_completed = ?2
             ORDER BY created_at",
        )?;
        let rows = stmt.query_map(params![profile_id, completed as i64], row_to_todo)?;
        rows.collect()
    }

    /// Non-completion edits (priority, reminder flag). The reward column
    /// is deliberately not touched: it was assigned at creation.
    pub fn update_todo(&self, item: &ToDoItem) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "UPDATE todos
             SET priority = ?2, deadline = ?3, reminder_sent = ?4, updated_at = ?5
             WHERE id = ?1",
            params![
                item.id,
                item.priority.as_str(),
                item.deadline.map(|t| t.to_rfc3339()),
                item.reminder_sent as i64,
                item.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Apply a completion: terminal to-do write plus reward credit, one
    /// transaction, guarded by `is_completed = 0`.
    pub fn finalize_todo(&self, outcome: &CompletionOutcome) -> Result<i64> {
        let item = &outcome.item;
        let tx = self.conn.unchecked_transaction().map_err(CoreError::from)?;
        let updated = tx.execute(
            "UPDATE todos
             SET is_completed = 1, actual_duration = ?2, updated_at = ?3
             WHERE id = ?1 AND is_completed = 0",
            params![
                item.id,
                item.actual_duration,
                item.updated_at.to_rfc3339(),
            ],
        )?;
        if updated == 0 {
            return Err(CoreError::Custom(format!(
                "to-do '{}' is already completed",
                item.id
            )));
        }

        let balance = credit(
            &tx,
            &outcome.receipt.profile_id,
            outcome.receipt.coins,
            &format!("completed: {}", item.title),
            item.updated_at,
        )?;
        tx.commit().map_err(CoreError::from)?;
        Ok(balance)
    }

    pub fn log_reminder(
        &self,
        todo_id: &str,
        sent_at: DateTime<Utc>,
        status: &str,
    ) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO reminder_log (todo_id, sent_at, status) VALUES (?1, ?2, ?3)",
            params![todo_id, sent_at.to_rfc3339(), status],
        )?;
        Ok(())
    }

    pub fn list_reminder_log(&self, todo_id: &str) -> Result<Vec<ReminderLog>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, todo_id, sent_at, status FROM reminder_log
             WHERE todo_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![todo_id], |row| {
            Ok(ReminderLog {
                id: row.get(0)?,
                todo_id: row.get(1)?,
                sent_at: parse_ts(row.get(2)?)?,
                status: row.get(3)?,
            })
        })?;
        rows.collect()
    }

    // ── Emotions ────────────────────────────────────────────────────

    pub fn insert_emotion(&self, entry: &EmotionEntry) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO emotions (id, profile_id, session_id, emotion, notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.id,
                entry.profile_id,
                entry.session_id,
                entry.emotion.as_str(),
                entry.notes,
                entry.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn list_emotions(&self, profile_id: &str) -> Result<Vec<EmotionEntry>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, profile_id, session_id, emotion, notes, created_at
             FROM emotions WHERE profile_id = ?1 ORDER BY created_at",
        )?;
        let rows = stmt.query_map(params![profile_id], |row| {
            Ok(EmotionEntry {
                id: row.get(0)?,
                profile_id: row.get(1)?,
                session_id: row.get(2)?,
                emotion: parse_enum(row.get::<_, String>(3)?, Emotion::parse)?,
                notes: row.get(4)?,
                created_at: parse_ts(row.get(5)?)?,
            })
        })?;
        rows.collect()
    }

    /// Mood score of the most recent emotion entry, an estimator feature.
    pub fn latest_mood_score(&self, profile_id: &str) -> Result<Option<f64>, rusqlite::Error> {
        let emotion: Option<String> = self
            .conn
            .query_row(
                "SELECT emotion FROM emotions WHERE profile_id = ?1
                 ORDER BY created_at DESC LIMIT 1",
                params![profile_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(emotion
            .and_then(|s| Emotion::parse(&s))
            .map(|e| e.score() as f64))
    }

    // ── Characters, inventory, achievements ─────────────────────────

    pub fn upsert_character(&self, character: &Character) -> Result<(), rusqlite::Error> {
        let quotes = serde_json::to_string(&character.motivation_quotes)
            .unwrap_or_else(|_| "[]".to_string());
        self.conn.execute(
            "INSERT OR REPLACE INTO characters (id, name, price, rarity, emoji, description, quotes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                character.id,
                character.name,
                character.price,
                character.rarity.as_str(),
                character.emoji,
                character.description,
                quotes,
            ],
        )?;
        Ok(())
    }

    pub fn get_character(&self, id: &str) -> Result<Option<Character>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT id, name, price, rarity, emoji, description, quotes
                 FROM characters WHERE id = ?1",
                params![id],
                row_to_character,
            )
            .optional()
    }

    pub fn list_characters(&self) -> Result<Vec<Character>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, price, rarity, emoji, description, quotes
             FROM characters ORDER BY price",
        )?;
        let rows = stmt.query_map([], row_to_character)?;
        rows.collect()
    }

    /// Grant a character without payment (the starter, or seeding).
    pub fn grant_character(
        &self,
        profile_id: &str,
        character_id: &str,
        now: DateTime<Utc>,
        active: bool,
    ) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR IGNORE INTO inventory (profile_id, character_id, purchased_at, is_active)
             VALUES (?1, ?2, ?3, ?4)",
            params![profile_id, character_id, now.to_rfc3339(), active as i64],
        )?;
        Ok(())
    }

    /// Buy a character: ownership check, balance check, debit and
    /// inventory insert in one transaction. Returns the new balance.
    pub fn purchase_character(
        &self,
        profile_id: &str,
        character_id: &str,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        let character = self
            .get_character(character_id)?
            .ok_or_else(|| CoreError::NotFound {
                kind: "character",
                id: character_id.to_string(),
            })?;

        let tx = self.conn.unchecked_transaction().map_err(CoreError::from)?;

        let owned: i64 = tx.query_row(
            "SELECT COUNT(*) FROM inventory WHERE profile_id = ?1 AND character_id = ?2",
            params![profile_id, character_id],
            |row| row.get(0),
        )?;
        if owned > 0 {
            return Err(WalletError::AlreadyOwned(character_id.to_string()).into());
        }

        let profile = self
            .get_profile(profile_id)?
            .ok_or_else(|| CoreError::NotFound {
                kind: "profile",
                id: profile_id.to_string(),
            })?;
        if !profile.can_afford(character.price) {
            return Err(WalletError::InsufficientCoins {
                balance: profile.coins,
                required: character.price,
            }
            .into());
        }

        tx.execute(
            "UPDATE profiles SET coins = coins - ?2 WHERE id = ?1",
            params![profile_id, character.price],
        )?;
        tx.execute(
            "INSERT INTO coin_ledger (profile_id, kind, amount, reason, created_at)
             VALUES (?1, 'spend', ?2, ?3, ?4)",
            params![
                profile_id,
                character.price,
                format!("character: {}", character.name),
                now.to_rfc3339(),
            ],
        )?;
        tx.execute(
            "INSERT INTO inventory (profile_id, character_id, purchased_at, is_active)
             VALUES (?1, ?2, ?3, 0)",
            params![profile_id, character_id, now.to_rfc3339()],
        )?;
        tx.commit().map_err(CoreError::from)?;
        Ok(profile.coins - character.price)
    }

    /// Make one owned character the active companion, deactivating the
    /// rest of the profile's inventory.
    pub fn activate_character(&self, profile_id: &str, character_id: &str) -> Result<()> {
        let tx = self.conn.unchecked_transaction().map_err(CoreError::from)?;
        tx.execute(
            "UPDATE inventory SET is_active = 0 WHERE profile_id = ?1",
            params![profile_id],
        )?;
        let updated = tx.execute(
            "UPDATE inventory SET is_active = 1
             WHERE profile_id = ?1 AND character_id = ?2",
            params![profile_id, character_id],
        )?;
        if updated == 0 {
            return Err(CoreError::NotFound {
                kind: "inventory entry",
                id: character_id.to_string(),
            });
        }
        tx.commit().map_err(CoreError::from)?;
        Ok(())
    }

    pub fn list_inventory(&self, profile_id: &str) -> Result<Vec<InventoryEntry>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT profile_id, character_id, purchased_at, is_active
             FROM inventory WHERE profile_id = ?1 ORDER BY purchased_at",
        )?;
        let rows = stmt.query_map(params![profile_id], |row| {
            Ok(InventoryEntry {
                profile_id: row.get(0)?,
                character_id: row.get(1)?,
                purchased_at: parse_ts(row.get(2)?)?,
                is_active: row.get::<_, i64>(3)? != 0,
            })
        })?;
        rows.collect()
    }

    pub fn insert_achievement(&self, achievement: &Achievement) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO achievements (id, profile_id, title, description, reward_coins,
                                       earned_at, is_claimed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                achievement.id,
                achievement.profile_id,
                achievement.title,
                achievement.description,
                achievement.reward_coins,
                achievement.earned_at.to_rfc3339(),
                achievement.is_claimed as i64,
            ],
        )?;
        Ok(())
    }

    pub fn list_achievements(&self, profile_id: &str) -> Result<Vec<Achievement>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, profile_id, title, description, reward_coins, earned_at, is_claimed
             FROM achievements WHERE profile_id = ?1 ORDER BY earned_at DESC",
        )?;
        let rows = stmt.query_map(params![profile_id], row_to_achievement)?;
        rows.collect()
    }

    /// Claim an achievement reward: credit plus the claimed flag in one
    /// transaction, guarded by `is_claimed = 0`. Returns the new balance.
    pub fn claim_achievement(&self, achievement_id: &str, now: DateTime<Utc>) -> Result<i64> {
        let achievement = self
            .conn
            .query_row(
                "SELECT id, profile_id, title, description, reward_coins, earned_at, is_claimed
                 FROM achievements WHERE id = ?1",
                params![achievement_id],
                row_to_achievement,
            )
            .optional()?
            .ok_or_else(|| CoreError::NotFound {
                kind: "achievement",
                id: achievement_id.to_string(),
            })?;

        let (claimed, receipt) = achievement.claim().map_err(CoreError::from)?;

        let tx = self.conn.unchecked_transaction().map_err(CoreError::from)?;
        let updated = tx.execute(
            "UPDATE achievements SET is_claimed = 1 WHERE id = ?1 AND is_claimed = 0",
            params![claimed.id],
        )?;
        if updated == 0 {
            return Err(WalletError::AlreadyClaimed(claimed.id).into());
        }
        let balance = credit(
            &tx,
            &receipt.profile_id,
            receipt.coins,
            &format!("achievement: {}", claimed.title),
            now,
        )?;
        tx.commit().map_err(CoreError::from)?;
        Ok(balance)
    }

    // ── Model persistence & kv ──────────────────────────────────────

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// The persisted estimator snapshot. Absence or an unreadable value
    /// is the normal "no model yet" state, never an error.
    pub fn load_model(&self) -> Result<Option<ModelSnapshot>, rusqlite::Error> {
        Ok(self
            .kv_get(MODEL_KEY)?
            .and_then(|json| serde_json::from_str(&json).ok()))
    }

    pub fn save_model(&self, snapshot: &ModelSnapshot) -> Result<()> {
        let json = serde_json::to_string(snapshot)?;
        self.kv_set(MODEL_KEY, &json)?;
        Ok(())
    }
}

/// Credit coins to a profile inside an open transaction, writing the
/// ledger row alongside. Returns the new balance.
fn credit(
    tx: &rusqlite::Transaction<'_>,
    profile_id: &str,
    coins: i64,
    reason: &str,
    at: DateTime<Utc>,
) -> Result<i64> {
    tx.execute(
        "UPDATE profiles SET coins = coins + ?2 WHERE id = ?1",
        params![profile_id, coins],
    )?;
    tx.execute(
        "INSERT INTO coin_ledger (profile_id, kind, amount, reason, created_at)
         VALUES (?1, 'earn', ?2, ?3, ?4)",
        params![profile_id, coins, reason, at.to_rfc3339()],
    )?;
    let balance: i64 = tx.query_row(
        "SELECT coins FROM profiles WHERE id = ?1",
        params![profile_id],
        |row| row.get(0),
    )?;
    Ok(balance)
}

// ── Row mapping ─────────────────────────────────────────────────────

fn parse_ts(s: String) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_opt_ts(s: Option<String>) -> Result<Option<DateTime<Utc>>, rusqlite::Error> {
    s.map(parse_ts).transpose()
}

fn parse_enum<T>(
    s: String,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, rusqlite::Error> {
    parse(&s).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("unknown enum value '{s}'").into(),
        )
    })
}

fn row_to_profile(row: &rusqlite::Row<'_>) -> Result<Profile, rusqlite::Error> {
    Ok(Profile {
        id: row.get(0)?,
        display_name: row.get(1)?,
        coins: row.get(2)?,
        timezone: row.get(3)?,
        email_reminder: row.get::<_, i64>(4)? != 0,
        created_at: parse_ts(row.get(5)?)?,
    })
}

fn row_to_subject(row: &rusqlite::Row<'_>) -> Result<Subject, rusqlite::Error> {
    Ok(Subject {
        id: row.get(0)?,
        profile_id: row.get(1)?,
        name: row.get(2)?,
        color: row.get(3)?,
        target_hours_per_week: row.get(4)?,
        created_at: parse_ts(row.get(5)?)?,
    })
}

fn row_to_session(row: &rusqlite::Row<'_>) -> Result<StudySession, rusqlite::Error> {
    Ok(StudySession {
        id: row.get(0)?,
        profile_id: row.get(1)?,
        subject_id: row.get(2)?,
        start_time: parse_ts(row.get(3)?)?,
        pause_time: parse_opt_ts(row.get(4)?)?,
        total_pause_seconds: row.get(5)?,
        end_time: parse_opt_ts(row.get(6)?)?,
        duration_seconds: row.get(7)?,
        points_awarded: row.get(8)?,
        is_active: row.get::<_, i64>(9)? != 0,
    })
}

fn row_to_todo(row: &rusqlite::Row<'_>) -> Result<ToDoItem, rusqlite::Error> {
    Ok(ToDoItem {
        id: row.get(0)?,
        profile_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        category: parse_enum(row.get::<_, String>(4)?, Category::parse)?,
        priority: parse_enum(row.get::<_, String>(5)?, Priority::parse)?,
        deadline: parse_opt_ts(row.get(6)?)?,
        is_completed: row.get::<_, i64>(7)? != 0,
        reminder_sent: row.get::<_, i64>(8)? != 0,
        reward_coins: row.get(9)?,
        predicted_duration: row.get(10)?,
        actual_duration: row.get(11)?,
        created_at: parse_ts(row.get(12)?)?,
        updated_at: parse_ts(row.get(13)?)?,
    })
}

fn row_to_character(row: &rusqlite::Row<'_>) -> Result<Character, rusqlite::Error> {
    let quotes: String = row.get(6)?;
    Ok(Character {
        id: row.get(0)?,
        name: row.get(1)?,
        price: row.get(2)?,
        rarity: parse_enum(row.get::<_, String>(3)?, Rarity::parse)?,
        emoji: row.get(4)?,
        description: row.get(5)?,
        motivation_quotes: serde_json::from_str(&quotes).unwrap_or_default(),
    })
}

fn row_to_achievement(row: &rusqlite::Row<'_>) -> Result<Achievement, rusqlite::Error> {
    Ok(Achievement {
        id: row.get(0)?,
        profile_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        reward_coins: row.get(4)?,
        earned_at: parse_ts(row.get(5)?)?,
        is_claimed: row.get::<_, i64>(6)? != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamification::catalog;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap()
    }

    fn db_with_profile() -> (Database, Profile) {
        let db = Database::open_memory().unwrap();
        let profile = Profile::new("alice", t0());
        db.insert_profile(&profile).unwrap();
        (db, profile)
    }

    #[test]
    fn profile_round_trip() {
        let (db, profile) = db_with_profile();
        let loaded = db.get_profile(&profile.id).unwrap().unwrap();
        assert_eq!(loaded.display_name, "alice");
        assert_eq!(loaded.coins, 0);
        assert!(db.find_profile("alice").unwrap().is_some());
        assert!(db.find_profile("bob").unwrap().is_none());
    }

    #[test]
    fn session_round_trip_preserves_timing() {
        let (db, profile) = db_with_profile();
        let subject = Subject::new(&profile.id, "Math", "#fff", 5.0, t0());
        db.insert_subject(&subject).unwrap();

        let session = StudySession::begin(&profile.id, &subject.id, t0());
        db.insert_session(&session).unwrap();

        let paused = session.pause(t0() + chrono::Duration::minutes(10)).unwrap();
        db.update_session_timing(&paused).unwrap();

        let loaded = db.get_session(&session.id).unwrap().unwrap();
        assert_eq!(loaded.pause_time, paused.pause_time);
        assert!(!loaded.is_active);
        assert!(db.open_session_for(&profile.id).unwrap().is_some());
    }

    #[test]
    fn finalize_session_rejects_replay() {
        let (db, profile) = db_with_profile();
        let subject = Subject::new(&profile.id, "Math", "#fff", 5.0, t0());
        db.insert_subject(&subject).unwrap();
        let session = StudySession::begin(&profile.id, &subject.id, t0());
        db.insert_session(&session).unwrap();

        let outcome = session
            .stop(t0() + chrono::Duration::minutes(40), 30)
            .unwrap();
        let balance = db.finalize_session(&outcome).unwrap();
        assert_eq!(balance, outcome.session.points_awarded);

        let err = db.finalize_session(&outcome).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Session(SessionError::AlreadyStopped(_))
        ));
        assert_eq!(
            db.get_profile(&profile.id).unwrap().unwrap().coins,
            outcome.session.points_awarded
        );
        assert_eq!(db.list_transactions(&profile.id).unwrap().len(), 1);
    }

    #[test]
    fn weekly_progress_only_counts_this_week() {
        let (db, profile) = db_with_profile();
        let subject = Subject::new(&profile.id, "Math", "#fff", 2.0, t0());
        db.insert_subject(&subject).unwrap();

        // One hour this week.
        let recent = StudySession::begin(&profile.id, &subject.id, t0());
        db.insert_session(&recent).unwrap();
        db.finalize_session(&recent.stop(t0() + chrono::Duration::hours(1), 30).unwrap())
            .unwrap();

        // Two hours last week.
        let old_start = t0() - chrono::Duration::days(10);
        let old = StudySession::begin(&profile.id, &subject.id, old_start);
        db.insert_session(&old).unwrap();
        db.finalize_session(&old.stop(old_start + chrono::Duration::hours(2), 30).unwrap())
            .unwrap();

        let now = t0() + chrono::Duration::hours(3);
        let progress = db.weekly_progress(&profile.id, now).unwrap();
        assert_eq!(progress.len(), 1);
        assert!((progress[0].hours_this_week - 1.0).abs() < 1e-9);
        assert_eq!(progress[0].ratio(), 0.5);
    }

    #[test]
    fn avg_session_minutes_ignores_open_sessions() {
        let (db, profile) = db_with_profile();
        let subject = Subject::new(&profile.id, "Math", "#fff", 5.0, t0());
        db.insert_subject(&subject).unwrap();

        assert!(db.avg_session_minutes(&profile.id).unwrap().is_none());

        let s = StudySession::begin(&profile.id, &subject.id, t0());
        db.insert_session(&s).unwrap();
        db.finalize_session(&s.stop(t0() + chrono::Duration::minutes(30), 30).unwrap())
            .unwrap();

        let open = StudySession::begin(&profile.id, &subject.id, t0() + chrono::Duration::hours(2));
        db.insert_session(&open).unwrap();

        let avg = db.avg_session_minutes(&profile.id).unwrap().unwrap();
        assert!((avg - 30.0).abs() < 1e-9);
    }

    #[test]
    fn finalize_todo_credits_once() {
        let (db, profile) = db_with_profile();
        let item = ToDoItem::from_draft(
            &profile.id,
            crate::todo::ToDoDraft {
                title: "essay".into(),
                priority: Some(Priority::High),
                ..Default::default()
            },
            t0(),
        );
        db.insert_todo(&item).unwrap();

        let outcome = item.complete(t0() + chrono::Duration::minutes(45)).unwrap();
        let balance = db.finalize_todo(&outcome).unwrap();
        assert_eq!(balance, 50);
        assert!(db.finalize_todo(&outcome).is_err());
        assert_eq!(db.get_profile(&profile.id).unwrap().unwrap().coins, 50);

        let completed = db.list_todos(&profile.id, true).unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].actual_duration, Some(45));
    }

    #[test]
    fn character_purchase_checks_balance_and_ownership() {
        let (db, profile) = db_with_profile();
        for c in catalog::builtin_characters() {
            db.upsert_character(&c).unwrap();
        }

        let err = db.purchase_character(&profile.id, "turtle", t0()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Wallet(WalletError::InsufficientCoins { required: 100, .. })
        ));

        // Fund the profile through a session reward.
        let subject = Subject::new(&profile.id, "Math", "#fff", 5.0, t0());
        db.insert_subject(&subject).unwrap();
        let s = StudySession::begin(&profile.id, &subject.id, t0());
        db.insert_session(&s).unwrap();
        db.finalize_session(&s.stop(t0() + chrono::Duration::hours(5), 30).unwrap())
            .unwrap();

        let balance = db.purchase_character(&profile.id, "turtle", t0()).unwrap();
        assert_eq!(balance, 50);

        let err = db.purchase_character(&profile.id, "turtle", t0()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Wallet(WalletError::AlreadyOwned(_))
        ));
    }

    #[test]
    fn activation_is_exclusive() {
        let (db, profile) = db_with_profile();
        for c in catalog::builtin_characters() {
            db.upsert_character(&c).unwrap();
        }
        db.grant_character(&profile.id, "bunny", t0(), true).unwrap();
        db.grant_character(&profile.id, "owl", t0(), false).unwrap();

        db.activate_character(&profile.id, "owl").unwrap();
        let inventory = db.list_inventory(&profile.id).unwrap();
        let active: Vec<_> = inventory.iter().filter(|e| e.is_active).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].character_id, "owl");

        assert!(db.activate_character(&profile.id, "dragon").is_err());
    }

    #[test]
    fn achievement_claim_is_once() {
        let (db, profile) = db_with_profile();
        let achievement = Achievement::new(&profile.id, "First hour", "", 20, t0());
        db.insert_achievement(&achievement).unwrap();

        let balance = db.claim_achievement(&achievement.id, t0()).unwrap();
        assert_eq!(balance, 20);

        let err = db.claim_achievement(&achievement.id, t0()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Wallet(WalletError::AlreadyClaimed(_))
        ));
        assert_eq!(db.get_profile(&profile.id).unwrap().unwrap().coins, 20);
    }

    #[test]
    fn latest_mood_score_tracks_most_recent_entry() {
        let (db, profile) = db_with_profile();
        assert!(db.latest_mood_score(&profile.id).unwrap().is_none());

        let subject = Subject::new(&profile.id, "Math", "#fff", 5.0, t0());
        db.insert_subject(&subject).unwrap();
        let s = StudySession::begin(&profile.id, &subject.id, t0());
        db.insert_session(&s).unwrap();

        db.insert_emotion(&EmotionEntry::new(&profile.id, &s.id, Emotion::Sad, "", t0()))
            .unwrap();
        db.insert_emotion(&EmotionEntry::new(
            &profile.id,
            &s.id,
            Emotion::Happy,
            "",
            t0() + chrono::Duration::hours(1),
        ))
        .unwrap();

        assert_eq!(db.latest_mood_score(&profile.id).unwrap(), Some(9.0));
    }

    #[test]
    fn model_snapshot_persists_via_kv() {
        let (db, _profile) = db_with_profile();
        assert!(db.load_model().unwrap().is_none());

        let snapshot = ModelSnapshot {
            version: ModelSnapshot::CURRENT_VERSION,
            trained_at: t0(),
            sample_count: 6,
            model: crate::estimator::LinearModel {
                weights: vec![1.0; crate::estimator::FEATURE_COUNT],
                intercept: 12.0,
            },
            encoders: Default::default(),
        };
        db.save_model(&snapshot).unwrap();

        let loaded = db.load_model().unwrap().unwrap();
        assert_eq!(loaded.sample_count, 6);
        assert_eq!(loaded.model.intercept, 12.0);
    }

    #[test]
    fn stats_split_today_from_all_time() {
        let (db, profile) = db_with_profile();
        let subject = Subject::new(&profile.id, "Math", "#fff", 5.0, t0());
        db.insert_subject(&subject).unwrap();

        let old_start = t0() - chrono::Duration::days(3);
        let old = StudySession::begin(&profile.id, &subject.id, old_start);
        db.insert_session(&old).unwrap();
        db.finalize_session(&old.stop(old_start + chrono::Duration::hours(1), 30).unwrap())
            .unwrap();

        let recent = StudySession::begin(&profile.id, &subject.id, t0());
        db.insert_session(&recent).unwrap();
        db.finalize_session(&recent.stop(t0() + chrono::Duration::minutes(30), 30).unwrap())
            .unwrap();

        let now = t0() + chrono::Duration::hours(1);
        let all = db.stats_all(&profile.id, now).unwrap();
        assert_eq!(all.total_sessions, 2);
        assert_eq!(all.total_seconds, 5400);
        assert_eq!(all.total_points, 45);
        assert_eq!(all.today_sessions, 1);
        assert_eq!(all.today_seconds, 1800);
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
    }
}
