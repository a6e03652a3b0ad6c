//! Core error types for studyhabit-core.
//!
//! Session-state conflicts get their own enum so callers can tell
//! "you already have an active session" apart from a generic failure.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for studyhabit-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Session lifecycle conflicts
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Wallet/coin balance errors
    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    /// Referenced record does not exist
    #[error("Not found: {kind} '{id}'")]
    NotFound { kind: &'static str, id: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Session state-machine conflicts.
///
/// Every variant is a rejected transition, never a silent correction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The account already has a session with no end time.
    #[error("Profile '{profile_id}' already has an open session ({session_id})")]
    AlreadyOpen {
        profile_id: String,
        session_id: String,
    },

    /// stop() called on a terminal session. The reward must not be
    /// credited a second time, so this is rejected rather than replayed.
    #[error("Session '{0}' is already stopped")]
    AlreadyStopped(String),

    /// resume() called while the session was not paused.
    #[error("Session '{0}' is not paused")]
    NotPaused(String),

    /// pause()/stop() called on a session that never ran or is terminal.
    #[error("Session '{session_id}' cannot {action} from its current state")]
    InvalidTransition {
        session_id: String,
        action: &'static str,
    },
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
}

/// Coin balance errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// Purchase attempted with a balance below the price.
    #[error("Insufficient coins: have {balance}, need {required}")]
    InsufficientCoins { balance: i64, required: i64 },

    /// Reward already claimed (achievements are claim-once).
    #[error("Achievement '{0}' has already been claimed")]
    AlreadyClaimed(String),

    /// Character already owned (one copy per profile).
    #[error("Character '{0}' is already owned")]
    AlreadyOwned(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
