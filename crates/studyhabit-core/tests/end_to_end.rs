//! Full flow against an on-disk database: profile, sessions, rewards,
//! to-dos, estimator training and the shop.

use chrono::{Duration, TimeZone, Utc};
use studyhabit_core::clock::{Clock, ManualClock};
use studyhabit_core::estimator::{
    DurationEstimator, MAX_ESTIMATE_MINUTES, MIN_ESTIMATE_MINUTES, MIN_TRAINING_TASKS,
};
use studyhabit_core::storage::Database;
use studyhabit_core::todo::{Priority, ToDoDraft};
use studyhabit_core::{Profile, SessionService, Subject, ToDoService};

#[test]
fn study_week_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_at(&dir.path().join("studyhabit.db")).unwrap();

    let t0 = Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap();
    let clock = ManualClock::new(t0);

    let profile = Profile::new("alice", t0);
    db.insert_profile(&profile).unwrap();
    let subject = Subject::new(&profile.id, "Math", "#4a90d9", 5.0, t0);
    db.insert_subject(&subject).unwrap();

    // One session with a pause: 60 min wall clock, 15 paused, rate 30/hr.
    let sessions = SessionService::new(&db, clock.clone(), 30);
    let s = sessions.start(&profile.id, &subject.id).unwrap();
    clock.advance_minutes(20);
    sessions.pause(&s.id).unwrap();
    clock.advance_minutes(15);
    sessions.resume(&s.id).unwrap();
    clock.advance_minutes(25);
    let summary = sessions.stop(&s.id).unwrap();
    assert_eq!(summary.duration_seconds, 2700);
    assert_eq!(summary.points_awarded, 22);
    assert_eq!(summary.new_balance, 22);

    // Net active time flows into the weekly progress query.
    let progress = db.weekly_progress(&profile.id, clock.now()).unwrap();
    assert_eq!(progress.len(), 1);
    assert!((progress[0].hours_this_week - 0.75).abs() < 1e-9);

    // Six tasks created and completed across a few days; each completion
    // credits its reward and leaves a training sample behind.
    let todos = ToDoService::new(&db, clock.clone(), 24);
    let estimator = DurationEstimator::new(db.load_model().unwrap());
    for (i, minutes) in [35u32, 50, 65, 80, 95, 110].iter().enumerate() {
        let draft = ToDoDraft {
            title: format!("task {i}"),
            description: "x".repeat(20 * (i + 1)),
            priority: Some(Priority::Medium),
            ..Default::default()
        };
        let item = todos.create(&profile.id, draft, &estimator).unwrap();
        assert_eq!(item.predicted_duration, Some(60));
        clock.advance_minutes(*minutes as i64);
        todos.complete(&item.id).unwrap();
    }
    let balance = db.get_profile(&profile.id).unwrap().unwrap().coins;
    assert_eq!(balance, 22 + 6 * 25);

    // Enough history now to train; the model persists through the kv store.
    let samples = todos.training_samples(&profile.id).unwrap();
    assert_eq!(samples.len(), 6);
    let mut trained = DurationEstimator::new(db.load_model().unwrap());
    assert!(trained.train(&samples, MIN_TRAINING_TASKS, clock.now()));
    db.save_model(trained.snapshot().unwrap()).unwrap();

    // New items predict with the trained model within the hard bounds.
    let reloaded = DurationEstimator::new(db.load_model().unwrap());
    assert!(reloaded.has_model());
    let item = todos
        .create(
            &profile.id,
            ToDoDraft {
                title: "next task".into(),
                description: "x".repeat(60),
                priority: Some(Priority::Medium),
                ..Default::default()
            },
            &reloaded,
        )
        .unwrap();
    let predicted = item.predicted_duration.unwrap();
    assert!((MIN_ESTIMATE_MINUTES..=MAX_ESTIMATE_MINUTES).contains(&predicted));

    // Spend the earnings in the shop.
    for character in studyhabit_core::gamification::catalog::builtin_characters() {
        db.upsert_character(&character).unwrap();
    }
    let after = db
        .purchase_character(&profile.id, "turtle", clock.now())
        .unwrap();
    assert_eq!(after, balance - 100);
    db.activate_character(&profile.id, "turtle").unwrap();

    // Everything above survives reopening the same file.
    drop(db);
    let db = Database::open_at(&dir.path().join("studyhabit.db")).unwrap();
    assert_eq!(
        db.get_profile(&profile.id).unwrap().unwrap().coins,
        after
    );
    assert!(db.load_model().unwrap().is_some());
    assert_eq!(db.list_todos(&profile.id, true).unwrap().len(), 6);
}

#[test]
fn reminder_scan_marks_and_logs() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_at(&dir.path().join("studyhabit.db")).unwrap();

    let t0 = Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap();
    let clock = ManualClock::new(t0);
    let profile = Profile::new("bob", t0);
    db.insert_profile(&profile).unwrap();

    let todos = ToDoService::new(&db, clock.clone(), 24);
    let estimator = DurationEstimator::default();

    let soon = todos
        .create(
            &profile.id,
            ToDoDraft {
                title: "due soon".into(),
                deadline: Some(t0 + Duration::hours(10)),
                ..Default::default()
            },
            &estimator,
        )
        .unwrap();
    todos
        .create(
            &profile.id,
            ToDoDraft {
                title: "due later".into(),
                deadline: Some(t0 + Duration::hours(72)),
                ..Default::default()
            },
            &estimator,
        )
        .unwrap();

    let pending = todos.scan_reminders(&profile.id).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].todo_id, soon.id);
    assert!(pending[0].message.contains("bob"));

    // Marked as sent: a second scan is empty, and the log has the row.
    assert!(todos.scan_reminders(&profile.id).unwrap().is_empty());
    let log = db.list_reminder_log(&soon.id).unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].status, "queued");

    // Disabling reminders on the profile silences the scan entirely.
    let mut muted = db.get_profile(&profile.id).unwrap().unwrap();
    muted.email_reminder = false;
    db.update_profile(&muted).unwrap();
    todos
        .create(
            &profile.id,
            ToDoDraft {
                title: "also due soon".into(),
                deadline: Some(t0 + Duration::hours(5)),
                ..Default::default()
            },
            &estimator,
        )
        .unwrap();
    assert!(todos.scan_reminders(&profile.id).unwrap().is_empty());
}
