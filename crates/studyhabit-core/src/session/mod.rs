//! Study-session lifecycle state machine.
//!
//! A session is a wall-clock interval spent on one subject. It moves
//! through three states:
//!
//! ```text
//! Running <-> Paused
//!    |          |
//!    +--> Stopped <--+   (terminal)
//! ```
//!
//! Transitions are explicit functions that take the current snapshot and
//! a timestamp and return a new snapshot. `stop()` additionally returns a
//! [`RewardReceipt`] so the caller can apply the coin credit together with
//! the terminal write in one transaction. Nothing here touches storage or
//! the system clock.
//!
//! Timing model: `start_time` is fixed at creation, `total_pause_seconds`
//! accumulates across pause/resume cycles, and the net active duration is
//! derived once at stop as `(end - start) - total_pause`, floored at zero.

mod service;

pub use service::{SessionService, StopSummary};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Lifecycle state derived from the session's fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Running,
    Paused,
    /// Terminal. No transition leaves this state.
    Stopped,
}

/// One timed study interval for a subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudySession {
    /// Unique identifier
    pub id: String,
    /// Owning profile
    pub profile_id: String,
    /// Studied subject
    pub subject_id: String,
    /// Set once at creation
    pub start_time: DateTime<Utc>,
    /// Non-null only while paused
    pub pause_time: Option<DateTime<Utc>>,
    /// Accumulated paused time. Monotonic, never decreases.
    pub total_pause_seconds: u64,
    /// Set once, by stop()
    pub end_time: Option<DateTime<Utc>>,
    /// Net active duration, computed at stop
    pub duration_seconds: u64,
    /// Coin reward, computed at stop
    pub points_awarded: i64,
    /// True only while running
    pub is_active: bool,
}

/// Coin credit owed to the owning profile after a stop.
///
/// The storage layer applies this together with the terminal session
/// write in a single transaction, so the credit happens exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardReceipt {
    pub profile_id: String,
    pub coins: i64,
}

/// Result of a successful `stop()`: the terminal snapshot plus the credit.
#[derive(Debug, Clone)]
pub struct StopOutcome {
    pub session: StudySession,
    pub receipt: RewardReceipt,
}

impl StudySession {
    /// Create a session in the `Running` state.
    ///
    /// The one-open-session-per-profile invariant is enforced by
    /// [`SessionService::start`], which checks storage before calling this.
    pub fn begin(
        profile_id: impl Into<String>,
        subject_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: format!("session-{}", uuid::Uuid::new_v4()),
            profile_id: profile_id.into(),
            subject_id: subject_id.into(),
            start_time: now,
            pause_time: None,
            total_pause_seconds: 0,
            end_time: None,
            duration_seconds: 0,
            points_awarded: 0,
            is_active: true,
        }
    }

    pub fn state(&self) -> SessionState {
        if self.end_time.is_some() {
            SessionState::Stopped
        } else if self.pause_time.is_some() {
            SessionState::Paused
        } else {
            SessionState::Running
        }
    }

    /// A session is open until stop() has run.
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Pause the session at `now`.
    ///
    /// Pausing an already-paused session is an idempotent no-op: the
    /// original pause timestamp stands, so the interval is counted once.
    pub fn pause(&self, now: DateTime<Utc>) -> Result<StudySession, SessionError> {
        match self.state() {
            SessionState::Running => {
                let mut next = self.clone();
                next.pause_time = Some(now);
                next.is_active = false;
                Ok(next)
            }
            SessionState::Paused => Ok(self.clone()),
            SessionState::Stopped => Err(SessionError::InvalidTransition {
                session_id: self.id.clone(),
                action: "pause",
            }),
        }
    }

    /// Resume a paused session at `now`, folding the pause interval into
    /// `total_pause_seconds`.
    pub fn resume(&self, now: DateTime<Utc>) -> Result<StudySession, SessionError> {
        match self.state() {
            SessionState::Paused => {
                let paused_at = self
                    .pause_time
                    .ok_or_else(|| SessionError::NotPaused(self.id.clone()))?;
                let paused_for = (now - paused_at).num_seconds().max(0) as u64;
                let mut next = self.clone();
                next.total_pause_seconds += paused_for;
                next.pause_time = None;
                next.is_active = true;
                Ok(next)
            }
            SessionState::Running | SessionState::Stopped => {
                Err(SessionError::NotPaused(self.id.clone()))
            }
        }
    }

    /// Stop the session at `now`, deriving the net active duration and
    /// the coin reward.
    ///
    /// Valid from `Running` or `Paused`. A stop while paused folds the
    /// final pause interval in first, so time spent paused never earns
    /// coins. Stopping a stopped session is rejected; re-running the
    /// computation would risk crediting the reward twice.
    pub fn stop(
        &self,
        now: DateTime<Utc>,
        coins_per_hour: u32,
    ) -> Result<StopOutcome, SessionError> {
        let settled = match self.state() {
            SessionState::Stopped => return Err(SessionError::AlreadyStopped(self.id.clone())),
            SessionState::Paused => self.resume(now)?,
            SessionState::Running => self.clone(),
        };

        let total_elapsed = (now - settled.start_time).num_seconds();
        let net = (total_elapsed - settled.total_pause_seconds as i64).max(0) as u64;

        let mut next = settled;
        next.end_time = Some(now);
        next.is_active = false;
        next.duration_seconds = net;
        next.points_awarded = points_for(net, coins_per_hour);

        let receipt = RewardReceipt {
            profile_id: next.profile_id.clone(),
            coins: next.points_awarded,
        };
        Ok(StopOutcome {
            session: next,
            receipt,
        })
    }
}

/// floor(duration_hours * rate), in integer arithmetic.
fn points_for(duration_seconds: u64, coins_per_hour: u32) -> i64 {
    (duration_seconds as i64) * (coins_per_hour as i64) / 3600
}
