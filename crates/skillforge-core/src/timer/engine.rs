//! Session timer engine.
//!
//! The engine is a wall-clock-based state machine. It does not use internal
//! threads - the caller is responsible for calling `tick()` about once a second
//! (see [`TickDriver`](super::TickDriver)).
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused -> (Completed | Idle)
//! Completed -> (Running via auto-chain | Idle)
//! ```
//!
//! `remaining_seconds` is only ever counted down against the wall clock: a tick
//! counts one second once a second has passed since the counting anchor, and a
//! larger gap (sleep, suspend, a closed process) is caught up in one step by
//! [`Engine::reconcile`].
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = Engine::new(Database::open()?, Config::load_or_default());
//! engine.restore();
//! engine.start(SessionKind::Work, SessionTarget::skill(skill_id))?;
//! // In a loop:
//! engine.tick();
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;

use super::schedule;
use super::state::{EngineState, PendingContinuation, PendingCredit, TimerStatus};
use crate::achievements::AchievementEvaluator;
use crate::aggregation::{Aggregator, CreditReceipt, CreditStatus};
use crate::clock::{Clock, SystemClock};
use crate::error::{DatabaseError, TransitionError};
use crate::events::Event;
use crate::model::{Outcome, Session, SessionKind, SessionTarget};
use crate::notify::{NotificationSink, TracingSink};
use crate::settings::{default_duration_minutes, SettingsProvider, DEFAULT_RECOVERY_INTERVAL};
use crate::storage::SessionStore;

/// A tick further than this behind the wall clock hands over to the reconciler.
pub const DRIFT_TOLERANCE_SECS: i64 = 2;

/// Pause between a completion and its auto-chained successor.
pub const DEFAULT_SETTLE_DELAY_SECS: i64 = 2;

/// Minimum spacing of pending-credit retries driven by ticks.
const CREDIT_RETRY_INTERVAL_SECS: i64 = 30;

/// Everything a single call changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Transition {
    pub events: Vec<Event>,
    pub credits: Vec<CreditReceipt>,
}

impl Transition {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.credits.is_empty()
    }

    pub fn merge(&mut self, other: Transition) {
        self.events.extend(other.events);
        self.credits.extend(other.credits);
    }

    fn push(&mut self, event: Event) {
        self.events.push(event);
    }
}

/// Owns the single [`EngineState`] and applies every transition to it.
pub struct Engine<S: SessionStore> {
    store: S,
    settings: Box<dyn SettingsProvider + Send>,
    clock: Arc<dyn Clock>,
    aggregator: Aggregator,
    sink: Box<dyn NotificationSink + Send>,
    settle_delay: Duration,
    state: EngineState,
    next_credit_retry: Option<DateTime<Utc>>,
}

impl<S: SessionStore> Engine<S> {
    /// Create an idle engine. Call [`Engine::restore`] to pick up persisted state.
    pub fn new(store: S, settings: impl SettingsProvider + Send + 'static) -> Self {
        let mut engine = Self {
            store,
            settings: Box::new(settings),
            clock: Arc::new(SystemClock),
            aggregator: Aggregator::default(),
            sink: Box::new(TracingSink),
            settle_delay: Duration::seconds(DEFAULT_SETTLE_DELAY_SECS),
            state: EngineState::idle(0),
            next_credit_retry: None,
        };
        let total = engine.duration_seconds(SessionKind::Work);
        engine.state = EngineState::idle(total);
        engine
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_sink(mut self, sink: impl NotificationSink + Send + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn with_evaluator(mut self, evaluator: impl AchievementEvaluator + Send + 'static) -> Self {
        self.aggregator = Aggregator::new(Box::new(evaluator));
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn status(&self) -> TimerStatus {
        self.state.status
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        let session = self.state.active_session.as_ref();
        Event::StateSnapshot {
            status: self.state.status,
            session_id: session.map(|s| s.id.clone()),
            kind: session.map(|s| s.kind),
            remaining_seconds: self.state.remaining_seconds,
            total_seconds: self.state.total_seconds,
            next_kind: self.state.next_kind,
            completed_work_sessions: self.state.completed_work_sessions,
            pending_credits: self.state.pending_credits.len(),
            at: self.clock.now(),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Load the persisted state, retry queued credits, catch up on elapsed
    /// wall-clock time and fire an overdue continuation.
    ///
    /// A state that cannot be loaded is replaced by a fresh idle one.
    pub fn restore(&mut self) -> Transition {
        let now = self.clock.now();
        match self.store.load_latest_engine_state() {
            Ok(Some(state)) => self.state = state,
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "could not load engine state, starting idle");
                self.state = EngineState::idle(self.duration_seconds(SessionKind::Work));
            }
        }
        self.repair(now);

        let mut t = Transition::none();
        self.retry_pending_credits(now, &mut t);
        t.merge(self.reconcile_at(now));
        match self.state.status {
            TimerStatus::Completed => t.merge(self.fire_continuation(now)),
            TimerStatus::Idle => {
                let total = self.duration_seconds(self.state.next_kind);
                self.state.enter_idle(total);
            }
            TimerStatus::Running | TimerStatus::Paused => {}
        }
        self.finish(t)
    }

    /// Bring a loaded state back in line with the status invariants.
    fn repair(&mut self, now: DateTime<Utc>) {
        let state = &mut self.state;
        if state.status != TimerStatus::Idle && state.active_session.is_none() {
            tracing::warn!(status = %state.status, "persisted state has no session, resetting to idle");
            state.status = TimerStatus::Idle;
            state.continuation = None;
        }
        match state.status {
            TimerStatus::Running if state.last_resume_at.is_none() => {
                tracing::warn!("running state without a resume anchor, treating as paused");
                state.status = TimerStatus::Paused;
            }
            TimerStatus::Paused | TimerStatus::Idle => state.last_resume_at = None,
            TimerStatus::Completed => {
                state.last_resume_at = None;
                if state.continuation.is_none() {
                    let target = state
                        .active_session
                        .as_ref()
                        .map(Session::target)
                        .unwrap_or_default();
                    state.continuation = Some(PendingContinuation {
                        due_at: now,
                        auto_start: None,
                        target,
                    });
                }
            }
            TimerStatus::Running => {}
        }
    }

    /// Write the current state through to the store. Failures are logged.
    pub fn persist(&self) {
        if let Err(e) = self.store.persist_engine_state(&self.state) {
            tracing::warn!(error = %e, "failed to persist engine state");
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a session of `kind` against `target`.
    ///
    /// Allowed from idle, and from completed where it cancels any pending
    /// auto-chain.
    pub fn start(
        &mut self,
        kind: SessionKind,
        target: SessionTarget,
    ) -> Result<Transition, TransitionError> {
        let now = self.clock.now();
        let mut t = Transition::none();
        match self.state.status {
            TimerStatus::Idle => {}
            TimerStatus::Completed => self.cancel_continuation(now, &mut t),
            other => return Err(self.reject("start", other)),
        }
        self.begin_session(kind, target, false, now, &mut t);
        Ok(self.finish(t))
    }

    pub fn pause(&mut self) -> Result<Transition, TransitionError> {
        let status = self.state.status;
        if status != TimerStatus::Running {
            return Err(self.reject("pause", status));
        }
        let now = self.clock.now();
        let mut t = Transition::none();

        self.count_elapsed(now);
        if self.state.remaining_seconds <= 0 {
            t.merge(self.complete_at(now, now));
            return Ok(self.finish(t));
        }

        self.state.status = TimerStatus::Paused;
        self.state.last_resume_at = None;
        tracing::info!(remaining = self.state.remaining_seconds, "session paused");
        t.push(Event::SessionPaused {
            session_id: self.active_session_id(),
            remaining_seconds: self.state.remaining_seconds,
            at: now,
        });
        Ok(self.finish(t))
    }

    /// Resume a paused session. A no-op when already running.
    pub fn resume(&mut self) -> Result<Transition, TransitionError> {
        match self.state.status {
            TimerStatus::Running => Ok(Transition::none()),
            TimerStatus::Paused => {
                let now = self.clock.now();
                self.state.status = TimerStatus::Running;
                self.state.last_resume_at = Some(now);
                tracing::info!(remaining = self.state.remaining_seconds, "session resumed");
                let mut t = Transition::none();
                t.push(Event::SessionResumed {
                    session_id: self.active_session_id(),
                    remaining_seconds: self.state.remaining_seconds,
                    at: now,
                });
                Ok(self.finish(t))
            }
            other => Err(self.reject("resume", other)),
        }
    }

    /// End the active session early.
    ///
    /// Whole elapsed minutes of a work session are credited; anything else is
    /// discarded and its row removed. From completed, drops the pending
    /// continuation. From idle, does nothing.
    pub fn stop(&mut self) -> Result<Transition, TransitionError> {
        let now = self.clock.now();
        let mut t = Transition::none();
        match self.state.status {
            TimerStatus::Idle => return Ok(t),
            TimerStatus::Completed => {
                self.settle_to_idle(now, &mut t);
                return Ok(self.finish(t));
            }
            TimerStatus::Running => {
                self.count_elapsed(now);
                if self.state.remaining_seconds <= 0 {
                    t.merge(self.complete_at(now, now));
                    return Ok(self.finish(t));
                }
            }
            TimerStatus::Paused => {}
        }

        let elapsed_minutes = self.state.elapsed_minutes();
        let total = self.state.total_seconds;
        let session = self.state.active_session.take();
        self.state.enter_idle(total);

        let Some(mut session) = session else {
            return Ok(self.finish(t));
        };
        if elapsed_minutes > 0 && session.kind.is_work() {
            session.finalize(now, Outcome::StoppedEarly, elapsed_minutes);
            tracing::info!(session_id = %session.id, minutes = elapsed_minutes, "session stopped early");
            t.push(Event::SessionStopped {
                session_id: session.id.clone(),
                kind: session.kind,
                outcome: Outcome::StoppedEarly,
                credited_minutes: elapsed_minutes,
                at: now,
            });
            self.apply_credit(&session, elapsed_minutes, now, &mut t);
        } else {
            session.finalize(now, Outcome::Discarded, 0);
            tracing::info!(session_id = %session.id, "session discarded");
            if let Err(e) = self.store.delete_session(&session.id) {
                tracing::warn!(error = %e, session_id = %session.id, "failed to delete discarded session");
            }
            t.push(Event::SessionDiscarded {
                session_id: session.id,
                kind: session.kind,
                at: now,
            });
        }
        Ok(self.finish(t))
    }

    /// Finish the active session with full planned credit once its countdown
    /// has run out.
    ///
    /// Normally reached through a tick or the reconciler. A no-op while time
    /// is left on the countdown, and unless a session is running or paused.
    pub fn complete(&mut self) -> Transition {
        let now = self.clock.now();
        let remaining = match self.state.status {
            TimerStatus::Running => self.state.remaining_seconds - self.state.uncounted_seconds(now),
            TimerStatus::Paused => self.state.remaining_seconds,
            TimerStatus::Idle | TimerStatus::Completed => return Transition::none(),
        };
        if remaining > 0 {
            return Transition::none();
        }
        let ended_at = match (self.state.status, self.state.last_resume_at) {
            (TimerStatus::Running, Some(anchor)) => {
                (anchor + Duration::seconds(self.state.remaining_seconds.max(0))).min(now)
            }
            _ => now,
        };
        let t = self.complete_at(ended_at, now);
        self.finish(t)
    }

    /// Leave the completed state without waiting for the continuation.
    pub fn dismiss(&mut self) -> Result<Transition, TransitionError> {
        let now = self.clock.now();
        let mut t = Transition::none();
        match self.state.status {
            TimerStatus::Idle => Ok(t),
            TimerStatus::Completed => {
                self.settle_to_idle(now, &mut t);
                Ok(self.finish(t))
            }
            other => Err(self.reject("dismiss", other)),
        }
    }

    // ── Driving ──────────────────────────────────────────────────────

    /// Advance by one pulse.
    pub fn tick(&mut self) -> Transition {
        let now = self.clock.now();
        let before = self.state.status;
        let mut t = Transition::none();

        if !self.state.pending_credits.is_empty()
            && self.next_credit_retry.map_or(true, |at| now >= at)
        {
            self.retry_pending_credits(now, &mut t);
        }

        match self.state.status {
            TimerStatus::Running => {
                let behind = self.state.uncounted_seconds(now);
                if behind > DRIFT_TOLERANCE_SECS {
                    t.merge(self.reconcile_at(now));
                } else if behind >= 1 {
                    self.state.remaining_seconds -= 1;
                    self.state.last_resume_at =
                        self.state.last_resume_at.map(|anchor| anchor + Duration::seconds(1));
                    if self.state.remaining_seconds <= 0 {
                        t.merge(self.complete_at(now, now));
                    }
                }
            }
            TimerStatus::Completed => t.merge(self.fire_continuation(now)),
            TimerStatus::Idle | TimerStatus::Paused => {}
        }

        if t.is_empty() && self.state.status == before {
            return t;
        }
        self.finish(t)
    }

    /// Count wall-clock time that passed since the anchor in one step.
    ///
    /// Completes the session with full planned credit when that time covers
    /// the rest of the countdown. Only acts while running.
    pub fn reconcile(&mut self) -> Transition {
        let now = self.clock.now();
        let t = self.reconcile_at(now);
        if t.is_empty() {
            return t;
        }
        self.finish(t)
    }

    fn reconcile_at(&mut self, now: DateTime<Utc>) -> Transition {
        if self.state.status != TimerStatus::Running {
            return Transition::none();
        }
        let Some(anchor) = self.state.last_resume_at else {
            return Transition::none();
        };

        let elapsed = self.state.uncounted_seconds(now);
        let effective = self.state.remaining_seconds - elapsed;
        if effective > 0 {
            self.state.remaining_seconds = effective;
            self.state.last_resume_at = Some(now);
            tracing::info!(counted = elapsed, remaining = effective, "reconciled elapsed time");
            let mut t = Transition::none();
            t.push(Event::SessionReconciled {
                session_id: self.active_session_id(),
                counted_seconds: elapsed,
                remaining_seconds: effective,
                at: now,
            });
            t
        } else {
            let expired_at = anchor + Duration::seconds(self.state.remaining_seconds.max(0));
            self.complete_at(expired_at.min(now), now)
        }
    }

    // ── Internals ────────────────────────────────────────────────────

    fn reject(&self, action: &'static str, from: TimerStatus) -> TransitionError {
        let err = TransitionError::new(action, from);
        tracing::warn!("{err}");
        err
    }

    fn active_session_id(&self) -> String {
        self.state
            .active_session
            .as_ref()
            .map(|s| s.id.clone())
            .unwrap_or_default()
    }

    fn duration_minutes(&self, kind: SessionKind) -> u32 {
        self.settings.duration_minutes(kind).unwrap_or_else(|e| {
            tracing::warn!(error = %e, %kind, "using default duration");
            default_duration_minutes(kind)
        })
    }

    fn duration_seconds(&self, kind: SessionKind) -> i64 {
        i64::from(self.duration_minutes(kind)) * 60
    }

    fn auto_chain_enabled(&self, finished: SessionKind) -> bool {
        self.settings.auto_chain_enabled(finished).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "auto-chain setting unavailable, not chaining");
            false
        })
    }

    fn recovery_interval(&self) -> u32 {
        self.settings.recovery_interval().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default recovery interval");
            DEFAULT_RECOVERY_INTERVAL
        })
    }

    /// Move whole seconds past the anchor into the countdown.
    fn count_elapsed(&mut self, now: DateTime<Utc>) {
        let secs = self.state.uncounted_seconds(now);
        if secs > 0 {
            self.state.remaining_seconds -= secs;
            self.state.last_resume_at = self
                .state
                .last_resume_at
                .map(|anchor| anchor + Duration::seconds(secs));
        }
    }

    fn begin_session(
        &mut self,
        kind: SessionKind,
        target: SessionTarget,
        auto_chained: bool,
        now: DateTime<Utc>,
        t: &mut Transition,
    ) {
        let target = match self.store.resolve_target(&target) {
            Ok(resolved) => {
                if resolved != target {
                    tracing::warn!(requested = ?target, resolved = ?resolved, "session target adjusted");
                }
                resolved
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not check session target");
                target
            }
        };
        let planned = self.duration_minutes(kind);
        let session = Session::new(kind, target.clone(), planned, now);
        if let Err(e) = self.store.insert_session(&session) {
            tracing::warn!(error = %e, session_id = %session.id, "failed to record session start");
        }
        tracing::info!(session_id = %session.id, %kind, planned, auto_chained, "session started");
        t.push(Event::SessionStarted {
            session_id: session.id.clone(),
            kind,
            planned_minutes: planned,
            target,
            auto_chained,
            at: now,
        });
        self.state.begin(session, now);
    }

    fn complete_at(&mut self, ended_at: DateTime<Utc>, now: DateTime<Utc>) -> Transition {
        let mut t = Transition::none();
        if !self.state.is_active() {
            return t;
        }
        let Some(mut session) = self.state.active_session.take() else {
            let total = self.duration_seconds(self.state.next_kind);
            self.state.enter_idle(total);
            return t;
        };

        let kind = session.kind;
        let credited = if kind.is_work() {
            session.planned_duration_minutes
        } else {
            0
        };
        session.finalize(ended_at, Outcome::Completed, credited);

        self.state.status = TimerStatus::Completed;
        self.state.remaining_seconds = 0;
        self.state.last_resume_at = None;
        if kind.is_work() {
            self.state.completed_work_sessions += 1;
        }
        let next = schedule::next_kind(
            kind,
            self.state.completed_work_sessions,
            self.recovery_interval(),
        );
        self.state.next_kind = next;

        tracing::info!(session_id = %session.id, %kind, credited, "session completed");
        t.push(Event::SessionCompleted {
            session_id: session.id.clone(),
            kind,
            credited_minutes: credited,
            at: now,
        });

        if credited > 0 {
            self.apply_credit(&session, credited, now, &mut t);
        } else if let Err(e) =
            self.store
                .finalize_session(&session.id, ended_at, Outcome::Completed, 0)
        {
            tracing::warn!(error = %e, session_id = %session.id, "failed to finalize session");
        }

        let auto_start = self.auto_chain_enabled(kind).then_some(next);
        let due_at = now + self.settle_delay;
        if auto_start.is_some() {
            t.push(Event::ChainScheduled {
                next_kind: next,
                due_at,
                at: now,
            });
        }
        self.state.continuation = Some(PendingContinuation {
            due_at,
            auto_start,
            target: session.target(),
        });
        self.state.active_session = Some(session);
        t
    }

    fn fire_continuation(&mut self, now: DateTime<Utc>) -> Transition {
        let mut t = Transition::none();
        let Some(continuation) = self.state.continuation.take() else {
            return t;
        };
        if now < continuation.due_at {
            self.state.continuation = Some(continuation);
            return t;
        }
        match continuation.auto_start {
            Some(kind) => self.begin_session(kind, continuation.target, true, now, &mut t),
            None => {
                let total = self.duration_seconds(self.state.next_kind);
                self.state.enter_idle(total);
                tracing::debug!("completed session settled to idle");
            }
        }
        t
    }

    fn cancel_continuation(&mut self, now: DateTime<Utc>, t: &mut Transition) {
        if let Some(PendingContinuation {
            auto_start: Some(kind),
            ..
        }) = self.state.continuation.take()
        {
            tracing::info!(%kind, "auto-chain cancelled");
            t.push(Event::ChainCancelled {
                next_kind: kind,
                at: now,
            });
        }
    }

    fn settle_to_idle(&mut self, now: DateTime<Utc>, t: &mut Transition) {
        self.cancel_continuation(now, t);
        let total = self.duration_seconds(self.state.next_kind);
        self.state.enter_idle(total);
        t.push(self.snapshot());
    }

    fn apply_credit(&mut self, session: &Session, minutes: u32, now: DateTime<Utc>, t: &mut Transition) {
        match self.aggregator.credit(&self.store, session, minutes, now) {
            Ok((receipt, events)) => {
                t.credits.push(receipt);
                t.events.extend(events);
            }
            Err(e) if !e.is_retryable() => self.reject_credit(session, minutes, &e, t),
            Err(e) => {
                tracing::error!(error = %e, session_id = %session.id, minutes, "credit failed, queued for retry");
                t.credits.push(CreditReceipt {
                    session_id: session.id.clone(),
                    minutes,
                    status: CreditStatus::Deferred {
                        reason: e.to_string(),
                    },
                });
                self.state.pending_credits.push(PendingCredit {
                    session: session.clone(),
                    minutes,
                });
                self.next_credit_retry = Some(now + Duration::seconds(CREDIT_RETRY_INTERVAL_SECS));
            }
        }
    }

    /// Drop a credit the store will never accept.
    ///
    /// The session row is closed without credit when it exists, so it does
    /// not linger as an open session.
    fn reject_credit(&mut self, session: &Session, minutes: u32, e: &DatabaseError, t: &mut Transition) {
        tracing::error!(error = %e, session_id = %session.id, minutes, "credit rejected by the store, dropping it");
        if let (Some(outcome), Some(ended_at)) = (session.outcome, session.ended_at) {
            if let Err(e) = self.store.finalize_session(&session.id, ended_at, outcome, 0) {
                tracing::warn!(error = %e, session_id = %session.id, "failed to close rejected session");
            }
        }
        t.credits.push(CreditReceipt {
            session_id: session.id.clone(),
            minutes,
            status: CreditStatus::Rejected {
                reason: e.to_string(),
            },
        });
    }

    /// Retry queued credits in finalization order, stopping at the first
    /// transient failure so later credits never overtake earlier ones.
    /// Credits the store rejects outright are dropped and do not hold up the
    /// queue.
    fn retry_pending_credits(&mut self, now: DateTime<Utc>, t: &mut Transition) {
        if self.state.pending_credits.is_empty() {
            return;
        }
        let mut queue = std::mem::take(&mut self.state.pending_credits).into_iter();
        while let Some(pending) = queue.next() {
            match self
                .aggregator
                .credit(&self.store, &pending.session, pending.minutes, now)
            {
                Ok((receipt, events)) => {
                    tracing::info!(session_id = %pending.session.id, "pending credit applied");
                    t.credits.push(receipt);
                    t.events.extend(events);
                }
                Err(e) if !e.is_retryable() => {
                    self.reject_credit(&pending.session, pending.minutes, &e, t);
                }
                Err(e) => {
                    tracing::warn!(error = %e, session_id = %pending.session.id, "pending credit still failing");
                    self.state.pending_credits.push(pending);
                    self.state.pending_credits.extend(queue);
                    self.next_credit_retry =
                        Some(now + Duration::seconds(CREDIT_RETRY_INTERVAL_SECS));
                    return;
                }
            }
        }
        self.next_credit_retry = None;
    }

    /// Persist, then hand every event to the sink.
    fn finish(&mut self, t: Transition) -> Transition {
        self.persist();
        for event in &t.events {
            self.sink.notify(event);
        }
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::{Config, Database};

    fn engine() -> (Engine<Database>, ManualClock, String) {
        let db = Database::open_memory().unwrap();
        let skill = db.create_skill("Cello", None).unwrap();
        let clock = ManualClock::new(Utc::now());
        let engine = Engine::new(db, Config::default()).with_clock(clock.clone());
        (engine, clock, skill.id)
    }

    fn run_for(engine: &mut Engine<Database>, clock: &ManualClock, seconds: i64) {
        for _ in 0..seconds {
            clock.advance(Duration::seconds(1));
            engine.tick();
        }
    }

    #[test]
    fn wrong_state_calls_are_rejected() {
        let (mut engine, _clock, _) = engine();
        assert_eq!(
            engine.pause().unwrap_err(),
            TransitionError::new("pause", TimerStatus::Idle)
        );
        assert!(engine.resume().is_err());
        assert!(engine.dismiss().unwrap().is_empty());

        engine.start(SessionKind::Work, SessionTarget::default()).unwrap();
        assert_eq!(
            engine.start(SessionKind::Work, SessionTarget::default()).unwrap_err(),
            TransitionError::new("start", TimerStatus::Running)
        );
        assert!(engine.dismiss().is_err());
        assert!(engine.resume().unwrap().is_empty());
    }

    #[test]
    fn start_uses_configured_duration() {
        let (mut engine, _clock, skill) = engine();
        let t = engine
            .start(SessionKind::ShortRecovery, SessionTarget::skill(&skill))
            .unwrap();
        assert!(matches!(
            t.events[0],
            Event::SessionStarted { planned_minutes: 5, auto_chained: false, .. }
        ));
        assert_eq!(engine.state().total_seconds, 300);
        assert_eq!(engine.state().remaining_seconds, 300);
        assert!(engine.state().last_resume_at.is_some());
    }

    #[test]
    fn ticks_only_count_elapsed_seconds() {
        let (mut engine, clock, _) = engine();
        engine.start(SessionKind::Work, SessionTarget::default()).unwrap();
        engine.tick();
        assert_eq!(engine.state().remaining_seconds, 1500);
        run_for(&mut engine, &clock, 3);
        assert_eq!(engine.state().remaining_seconds, 1497);
    }

    #[test]
    fn large_gap_is_reconciled_in_one_tick() {
        let (mut engine, clock, _) = engine();
        engine.start(SessionKind::Work, SessionTarget::default()).unwrap();
        clock.advance(Duration::seconds(90));
        let t = engine.tick();
        assert!(matches!(
            t.events[0],
            Event::SessionReconciled { counted_seconds: 90, remaining_seconds: 1410, .. }
        ));
        assert_eq!(engine.state().remaining_seconds, 1410);
        assert_eq!(engine.state().last_resume_at, Some(clock.now()));
    }

    #[test]
    fn pause_counts_elapsed_time_first() {
        let (mut engine, clock, _) = engine();
        engine.start(SessionKind::Work, SessionTarget::default()).unwrap();
        clock.advance(Duration::seconds(10));
        engine.pause().unwrap();
        assert_eq!(engine.state().remaining_seconds, 1490);
        assert_eq!(engine.state().last_resume_at, None);

        clock.advance(Duration::minutes(30));
        engine.tick();
        assert_eq!(engine.state().remaining_seconds, 1490);
        engine.resume().unwrap();
        assert_eq!(engine.state().status, TimerStatus::Running);
    }

    #[test]
    fn stop_from_completed_cancels_chain() {
        let db = Database::open_memory().unwrap();
        let mut cfg = Config::default();
        cfg.schedule.work_minutes = 1;
        cfg.auto_chain.auto_start_recovery = true;
        let clock = ManualClock::new(Utc::now());
        let mut engine = Engine::new(db, cfg).with_clock(clock.clone());

        engine.start(SessionKind::Work, SessionTarget::default()).unwrap();
        run_for(&mut engine, &clock, 60);
        assert_eq!(engine.status(), TimerStatus::Completed);

        let t = engine.stop().unwrap();
        assert!(t
            .events
            .iter()
            .any(|e| matches!(e, Event::ChainCancelled { next_kind: SessionKind::ShortRecovery, .. })));
        assert_eq!(engine.status(), TimerStatus::Idle);
        assert_eq!(engine.state().total_seconds, 300);

        run_for(&mut engine, &clock, 5);
        assert_eq!(engine.status(), TimerStatus::Idle);
    }

    #[test]
    fn completed_settles_to_idle_without_auto_chain() {
        let (mut engine, clock, _) = engine();
        engine.start(SessionKind::ShortRecovery, SessionTarget::default()).unwrap();
        run_for(&mut engine, &clock, 300);
        assert_eq!(engine.status(), TimerStatus::Completed);
        assert_eq!(engine.state().next_kind, SessionKind::Work);

        run_for(&mut engine, &clock, DEFAULT_SETTLE_DELAY_SECS);
        assert_eq!(engine.status(), TimerStatus::Idle);
        assert!(engine.state().active_session.is_none());
        assert_eq!(engine.state().remaining_seconds, 1500);
    }

    #[test]
    fn recovery_completion_is_finalized_without_credit() {
        let (mut engine, clock, skill) = engine();
        engine
            .start(SessionKind::ShortRecovery, SessionTarget::skill(&skill))
            .unwrap();
        let id = engine.state().active_session.as_ref().unwrap().id.clone();
        clock.advance(Duration::seconds(300));
        let t = engine.reconcile();
        assert!(t.credits.is_empty());
        let stored = engine.store().get_session(&id).unwrap().unwrap();
        assert_eq!(stored.outcome, Some(Outcome::Completed));
        assert_eq!(stored.credited_minutes, Some(0));
        assert_eq!(
            engine.store().get_skill(&skill).unwrap().unwrap().accumulated_minutes,
            0
        );
    }

    #[test]
    fn restore_picks_up_persisted_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skillforge.db");
        let clock = ManualClock::new(Utc::now());
        {
            let db = Database::open_at(&path).unwrap();
            let mut engine = Engine::new(db, Config::default()).with_clock(clock.clone());
            engine.start(SessionKind::Work, SessionTarget::default()).unwrap();
            clock.advance(Duration::seconds(60));
            engine.pause().unwrap();
        }
        clock.advance(Duration::hours(3));
        let db = Database::open_at(&path).unwrap();
        let mut engine = Engine::new(db, Config::default()).with_clock(clock.clone());
        engine.restore();
        assert_eq!(engine.status(), TimerStatus::Paused);
        assert_eq!(engine.state().remaining_seconds, 1440);
    }

    #[test]
    fn complete_waits_for_the_countdown() {
        let (mut engine, clock, skill) = engine();
        engine.start(SessionKind::Work, SessionTarget::skill(&skill)).unwrap();
        clock.advance(Duration::minutes(5));
        engine.pause().unwrap();
        assert!(engine.complete().is_empty());
        assert_eq!(engine.status(), TimerStatus::Paused);
        assert_eq!(engine.store().get_skill(&skill).unwrap().unwrap().accumulated_minutes, 0);

        engine.resume().unwrap();
        assert!(engine.complete().is_empty());
        let resumed_at = clock.now();
        clock.advance(Duration::minutes(21));
        let t = engine.complete();
        assert_eq!(engine.status(), TimerStatus::Completed);
        assert_eq!(t.credits.len(), 1);
        assert_eq!(t.credits[0].minutes, 25);
        let session = engine.store().get_session(&t.credits[0].session_id).unwrap().unwrap();
        assert_eq!(session.ended_at, Some(resumed_at + Duration::minutes(20)));
    }

    #[test]
    fn snapshot_reflects_state() {
        let (mut engine, _clock, _) = engine();
        engine.start(SessionKind::Work, SessionTarget::default()).unwrap();
        match engine.snapshot() {
            Event::StateSnapshot {
                status,
                kind,
                remaining_seconds,
                ..
            } => {
                assert_eq!(status, TimerStatus::Running);
                assert_eq!(kind, Some(SessionKind::Work));
                assert_eq!(remaining_seconds, 1500);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
