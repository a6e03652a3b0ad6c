//! Storage-backed session operations.
//!
//! [`SessionService`] wires the pure state machine to the database and the
//! injected clock. It owns the two invariants that need storage to check:
//! at most one open session per profile, and reward credit applied exactly
//! once (the finalize write and the coin credit share one transaction).

use crate::clock::Clock;
use crate::error::{CoreError, Result, SessionError};
use crate::storage::Database;

use super::StudySession;

/// What `stop()` reports back to the caller.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StopSummary {
    pub session: StudySession,
    pub duration_seconds: u64,
    pub points_awarded: i64,
    /// Profile coin balance after the credit.
    pub new_balance: i64,
}

pub struct SessionService<'a, C: Clock> {
    db: &'a Database,
    clock: C,
    coins_per_hour: u32,
}

impl<'a, C: Clock> SessionService<'a, C> {
    pub fn new(db: &'a Database, clock: C, coins_per_hour: u32) -> Self {
        Self {
            db,
            clock,
            coins_per_hour,
        }
    }

    /// Start a session for `profile_id` on `subject_id`.
    ///
    /// Rejected with [`SessionError::AlreadyOpen`] if the profile still has
    /// an open session, stopped or not yet stopped elsewhere.
    pub fn start(&self, profile_id: &str, subject_id: &str) -> Result<StudySession> {
        if self.db.get_profile(profile_id)?.is_none() {
            return Err(CoreError::NotFound {
                kind: "profile",
                id: profile_id.to_string(),
            });
        }
        if self.db.get_subject(subject_id)?.is_none() {
            return Err(CoreError::NotFound {
                kind: "subject",
                id: subject_id.to_string(),
            });
        }
        if let Some(open) = self.db.open_session_for(profile_id)? {
            return Err(SessionError::AlreadyOpen {
                profile_id: profile_id.to_string(),
                session_id: open.id,
            }
            .into());
        }

        let session = StudySession::begin(profile_id, subject_id, self.clock.now());
        self.db.insert_session(&session)?;
        Ok(session)
    }

    pub fn pause(&self, session_id: &str) -> Result<StudySession> {
        let session = self.load(session_id)?;
        let next = session.pause(self.clock.now())?;
        self.db.update_session_timing(&next)?;
        Ok(next)
    }

    pub fn resume(&self, session_id: &str) -> Result<StudySession> {
        let session = self.load(session_id)?;
        let next = session.resume(self.clock.now())?;
        self.db.update_session_timing(&next)?;
        Ok(next)
    }

    /// Stop the session and credit the reward.
    ///
    /// The terminal session write and the coin credit are applied in one
    /// transaction, guarded by `end_time IS NULL` so a concurrent or
    /// repeated stop cannot double-credit.
    pub fn stop(&self, session_id: &str) -> Result<StopSummary> {
        let session = self.load(session_id)?;
        let outcome = session.stop(self.clock.now(), self.coins_per_hour)?;
        let new_balance = self.db.finalize_session(&outcome)?;
        Ok(StopSummary {
            duration_seconds: outcome.session.duration_seconds,
            points_awarded: outcome.session.points_awarded,
            session: outcome.session,
            new_balance,
        })
    }

    /// The profile's open session, if any.
    pub fn open_session(&self, profile_id: &str) -> Result<Option<StudySession>> {
        Ok(self.db.open_session_for(profile_id)?)
    }

    fn load(&self, session_id: &str) -> Result<StudySession> {
        self.db
            .get_session(session_id)?
            .ok_or_else(|| CoreError::NotFound {
                kind: "session",
                id: session_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::profile::Profile;
    use crate::subject::Subject;
    use chrono::TimeZone;

    fn setup() -> (Database, ManualClock, String, String) {
        let db = Database::open_memory().unwrap();
        let t0 = chrono::Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let clock = ManualClock::new(t0);
        let profile = Profile::new("alice", t0);
        db.insert_profile(&profile).unwrap();
        let subject = Subject::new(&profile.id, "Math", "#ff0000", 5.0, t0);
        db.insert_subject(&subject).unwrap();
        (db, clock, profile.id, subject.id)
    }

    #[test]
    fn start_rejects_second_open_session() {
        let (db, clock, profile, subject) = setup();
        let service = SessionService::new(&db, clock, 30);

        let first = service.start(&profile, &subject).unwrap();
        let err = service.start(&profile, &subject).unwrap_err();
        match err {
            CoreError::Session(SessionError::AlreadyOpen { session_id, .. }) => {
                assert_eq!(session_id, first.id);
            }
            other => panic!("expected AlreadyOpen, got {other:?}"),
        }
    }

    #[test]
    fn start_allowed_again_after_stop() {
        let (db, clock, profile, subject) = setup();
        let service = SessionService::new(&db, clock.clone(), 30);

        let s = service.start(&profile, &subject).unwrap();
        clock.advance_minutes(30);
        service.stop(&s.id).unwrap();
        assert!(service.open_session(&profile).unwrap().is_none());
        service.start(&profile, &subject).unwrap();
    }

    #[test]
    fn stop_credits_balance_once() {
        let (db, clock, profile, subject) = setup();
        let service = SessionService::new(&db, clock.clone(), 30);

        let s = service.start(&profile, &subject).unwrap();
        clock.advance_minutes(60);
        let summary = service.stop(&s.id).unwrap();
        assert_eq!(summary.points_awarded, 30);
        assert_eq!(summary.new_balance, 30);

        // Second stop is a conflict and the balance is untouched.
        let err = service.stop(&s.id).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Session(SessionError::AlreadyStopped(_))
        ));
        assert_eq!(db.get_profile(&profile).unwrap().unwrap().coins, 30);
    }

    #[test]
    fn pause_resume_round_trip_persists() {
        let (db, clock, profile, subject) = setup();
        let service = SessionService::new(&db, clock.clone(), 30);

        let s = service.start(&profile, &subject).unwrap();
        clock.advance_minutes(10);
        service.pause(&s.id).unwrap();
        clock.advance_minutes(5);
        service.resume(&s.id).unwrap();
        clock.advance_minutes(10);
        let summary = service.stop(&s.id).unwrap();

        assert_eq!(summary.session.total_pause_seconds, 300);
        assert_eq!(summary.duration_seconds, 1200);
        assert_eq!(summary.points_awarded, 10);
    }

    #[test]
    fn stop_writes_ledger_entry() {
        let (db, clock, profile, subject) = setup();
        let service = SessionService::new(&db, clock.clone(), 30);

        let s = service.start(&profile, &subject).unwrap();
        clock.advance_minutes(120);
        service.stop(&s.id).unwrap();

        let ledger = db.list_transactions(&profile).unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].amount, 60);
    }
}
