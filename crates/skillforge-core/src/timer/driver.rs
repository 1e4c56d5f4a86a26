//! Fixed-period pulse for the engine.

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use super::engine::{Engine, Transition};
use crate::storage::SessionStore;

const DEFAULT_PERIOD: Duration = Duration::from_secs(1);

/// Calls [`Engine::tick`] once per period on the current task.
///
/// Missed pulses are skipped rather than replayed; the engine catches up on
/// wall-clock time by itself.
#[derive(Debug, Clone, Copy)]
pub struct TickDriver {
    period: Duration,
}

impl Default for TickDriver {
    fn default() -> Self {
        Self::new(DEFAULT_PERIOD)
    }
}

impl TickDriver {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    /// Tick until `shutdown` resolves or `on_tick` breaks.
    ///
    /// `on_tick` sees the engine and what the tick changed (often nothing).
    /// The state is persisted once more on the way out. Returns the number of
    /// ticks delivered.
    pub async fn run<S, F, C>(&self, engine: &mut Engine<S>, shutdown: F, mut on_tick: C) -> u64
    where
        S: SessionStore,
        F: Future<Output = ()>,
        C: FnMut(&Engine<S>, &Transition) -> ControlFlow<()>,
    {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        ticker.tick().await;

        tokio::pin!(shutdown);
        let mut ticks = 0u64;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    ticks += 1;
                    let transition = engine.tick();
                    if on_tick(engine, &transition).is_break() {
                        tracing::debug!(ticks, "tick driver stopped by caller");
                        break;
                    }
                }
                _ = &mut shutdown => {
                    tracing::info!(ticks, "tick driver shutting down");
                    break;
                }
            }
        }
        engine.persist();
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use crate::events::Event;
    use crate::model::{SessionKind, SessionTarget};
    use crate::storage::{Config, Database};
    use crate::timer::TimerStatus;
    use chrono::{DateTime, Utc};

    /// Wall clock that follows tokio's (possibly paused) time.
    struct TokioClock {
        origin: DateTime<Utc>,
        started: tokio::time::Instant,
    }

    impl Clock for TokioClock {
        fn now(&self) -> DateTime<Utc> {
            let elapsed = chrono::Duration::from_std(self.started.elapsed())
                .unwrap_or_else(|_| chrono::Duration::zero());
            self.origin + elapsed
        }
    }

    fn engine(work_minutes: u32) -> Engine<Database> {
        let mut cfg = Config::default();
        cfg.schedule.work_minutes = work_minutes;
        Engine::new(Database::open_memory().unwrap(), cfg).with_clock(TokioClock {
            origin: Utc::now(),
            started: tokio::time::Instant::now(),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn drives_a_session_to_completion() {
        let mut engine = engine(1);
        engine.start(SessionKind::Work, SessionTarget::default()).unwrap();

        let mut completed = false;
        let ticks = TickDriver::default()
            .run(&mut engine, std::future::pending(), |_, t| {
                if t.events.iter().any(|e| matches!(e, Event::SessionCompleted { .. })) {
                    completed = true;
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .await;

        assert!(completed);
        assert_eq!(ticks, 60);
        assert_eq!(engine.status(), TimerStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_future_stops_the_loop() {
        let mut engine = engine(25);
        engine.start(SessionKind::Work, SessionTarget::default()).unwrap();

        let ticks = TickDriver::default()
            .run(
                &mut engine,
                tokio::time::sleep(Duration::from_millis(10_500)),
                |_, _| ControlFlow::Continue(()),
            )
            .await;

        assert_eq!(ticks, 10);
        assert_eq!(engine.state().remaining_seconds, 1490);
        assert_eq!(engine.status(), TimerStatus::Running);
    }
}
