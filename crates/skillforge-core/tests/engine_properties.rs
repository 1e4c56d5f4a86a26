//! Property checks for the timer engine's crediting and time accounting.

use chrono::{Duration, Utc};
use proptest::prelude::*;
use skillforge_core::{
    Config, Database, Engine, EngineState, Event, ManualClock, Session, SessionKind, SessionStore,
    SessionTarget, TimerStatus,
};

fn engine_with_skill() -> (Engine<Database>, ManualClock, String) {
    let db = Database::open_memory().unwrap();
    let skill_id = db.create_skill("Violin", None).unwrap().id;
    let clock = ManualClock::new(Utc::now());
    let engine = Engine::new(db, Config::default()).with_clock(clock.clone());
    (engine, clock, skill_id)
}

#[derive(Debug, Clone)]
enum Op {
    Start,
    Pause,
    Resume,
    Stop,
    Dismiss,
    Wait(i64),
    Tick,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Start),
        Just(Op::Pause),
        Just(Op::Resume),
        Just(Op::Stop),
        Just(Op::Dismiss),
        (1i64..900).prop_map(Op::Wait),
        Just(Op::Tick),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn early_stop_credits_floor_of_elapsed_minutes(elapsed in 0i64..1500) {
        let (mut engine, clock, skill) = engine_with_skill();
        engine.start(SessionKind::Work, SessionTarget::skill(&skill)).unwrap();
        let id = engine.state().active_session.as_ref().unwrap().id.clone();

        clock.advance(Duration::seconds(elapsed));
        let t = engine.stop().unwrap();

        let expected = (elapsed / 60) as u64;
        prop_assert_eq!(engine.status(), TimerStatus::Idle);
        prop_assert_eq!(
            engine.store().get_skill(&skill).unwrap().unwrap().accumulated_minutes,
            expected
        );
        if expected == 0 {
            let discarded = matches!(t.events[0], Event::SessionDiscarded { .. });
            prop_assert!(discarded);
            prop_assert!(engine.store().get_session(&id).unwrap().is_none());
            prop_assert!(engine.store().daily_activities().unwrap().is_empty());
        } else {
            let stored = engine.store().get_session(&id).unwrap().unwrap();
            prop_assert_eq!(stored.credited_minutes.map(u64::from), Some(expected));
        }
    }

    #[test]
    fn restore_counts_offline_time(remaining in 1i64..=1500, offline in 0i64..3000) {
        let db = Database::open_memory().unwrap();
        let skill = db.create_skill("Violin", None).unwrap().id;
        let now = Utc::now();
        let anchor = now - Duration::seconds(offline);
        let session = Session::new(
            SessionKind::Work,
            SessionTarget::skill(&skill),
            25,
            anchor - Duration::seconds(1500 - remaining),
        );
        db.insert_session(&session).unwrap();
        db.persist_engine_state(&EngineState {
            status: TimerStatus::Running,
            active_session: Some(session),
            remaining_seconds: remaining,
            last_resume_at: Some(anchor),
            ..EngineState::idle(1500)
        })
        .unwrap();

        let mut engine = Engine::new(db, Config::default()).with_clock(ManualClock::new(now));
        engine.restore();

        let minutes = engine.store().get_skill(&skill).unwrap().unwrap().accumulated_minutes;
        if offline < remaining {
            prop_assert_eq!(engine.status(), TimerStatus::Running);
            prop_assert_eq!(engine.state().remaining_seconds, remaining - offline);
            prop_assert_eq!(minutes, 0);
        } else {
            prop_assert_eq!(engine.status(), TimerStatus::Completed);
            prop_assert_eq!(minutes, 25);
        }
    }

    #[test]
    fn pause_then_resume_keeps_remaining(elapsed in 0i64..1499) {
        let (mut engine, clock, skill) = engine_with_skill();
        engine.start(SessionKind::Work, SessionTarget::skill(&skill)).unwrap();
        clock.advance(Duration::seconds(elapsed));

        engine.pause().unwrap();
        let paused = engine.state().remaining_seconds;
        engine.resume().unwrap();
        engine.tick();

        prop_assert_eq!(paused, 1500 - elapsed);
        prop_assert_eq!(engine.state().remaining_seconds, paused);
    }

    #[test]
    fn aggregates_match_sessions_after_any_sequence(ops in prop::collection::vec(op(), 1..40)) {
        let (mut engine, clock, skill) = engine_with_skill();
        for op in ops {
            match op {
                Op::Start => {
                    let _ = engine.start(SessionKind::Work, SessionTarget::skill(&skill));
                }
                Op::Pause => {
                    let _ = engine.pause();
                }
                Op::Resume => {
                    let _ = engine.resume();
                }
                Op::Stop => {
                    let _ = engine.stop();
                }
                Op::Dismiss => {
                    let _ = engine.dismiss();
                }
                Op::Wait(secs) => clock.advance(Duration::seconds(secs)),
                Op::Tick => {
                    engine.tick();
                }
            }
        }

        let db = engine.store();
        let credited: u64 = db
            .list_sessions(1000)
            .unwrap()
            .iter()
            .filter_map(|s| s.credited_minutes)
            .map(u64::from)
            .sum();
        let accumulated = db.get_skill(&skill).unwrap().unwrap().accumulated_minutes;
        let bucketed: u64 = db.daily_activities().unwrap().iter().map(|d| d.total_minutes).sum();
        prop_assert_eq!(credited, accumulated);
        prop_assert_eq!(credited, bucketed);
        prop_assert!(engine.state().pending_credits.is_empty());
    }
}
