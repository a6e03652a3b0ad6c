//! # Studyhabit Core Library
//!
//! Core business logic for the studyhabit study tracker. All operations
//! are available through the standalone CLI binary; any GUI would be a
//! thin layer over this same library.
//!
//! ## Architecture
//!
//! - **Sessions**: A wall-clock state machine (running/paused/stopped)
//!   whose net active duration earns coins at a configurable hourly rate
//! - **Estimator**: A linear-regression duration predictor trained from
//!   completed to-do items, with per-priority fallbacks
//! - **Storage**: SQLite persistence and TOML configuration
//! - **Gamification**: Coin wallet, character shop and achievements
//!
//! ## Key Components
//!
//! - [`StudySession`]: Session state machine
//! - [`SessionService`] / [`ToDoService`]: Storage-backed operations
//! - [`DurationEstimator`]: Task duration prediction
//! - [`Database`]: Persistence for everything above
//! - [`Config`]: Application configuration management

pub mod clock;
pub mod emotion;
pub mod error;
pub mod estimator;
pub mod gamification;
pub mod profile;
pub mod session;
pub mod storage;
pub mod subject;
pub mod todo;

pub use clock::{Clock, ManualClock, SystemClock};
pub use emotion::{Emotion, EmotionEntry, EmotionStats};
pub use error::{ConfigError, CoreError, DatabaseError, SessionError, WalletError};
pub use estimator::{DurationEstimator, EstimateInput, ModelSnapshot, TrainingExample};
pub use gamification::{Achievement, Character, InventoryEntry, Rarity};
pub use profile::{CoinTransaction, Profile, TransactionKind};
pub use session::{RewardReceipt, SessionService, SessionState, StopSummary, StudySession};
pub use storage::{Config, Database, StudyStats};
pub use subject::{Subject, WeeklyProgress};
pub use todo::{Category, Priority, ToDoDraft, ToDoItem, ToDoService};
