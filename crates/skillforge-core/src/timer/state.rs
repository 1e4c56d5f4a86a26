//! The engine's persisted state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{Session, SessionKind, SessionTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
    Completed,
}

impl fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TimerStatus::Idle => "idle",
            TimerStatus::Running => "running",
            TimerStatus::Paused => "paused",
            TimerStatus::Completed => "completed",
        };
        write!(f, "{label}")
    }
}

/// What happens once the settle delay after a completion elapses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingContinuation {
    pub due_at: DateTime<Utc>,
    /// Session to start automatically; `None` means return to idle.
    pub auto_start: Option<SessionKind>,
    pub target: SessionTarget,
}

/// A finalized session whose credit has not reached the store yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingCredit {
    pub session: Session,
    pub minutes: u32,
}

/// Exactly one of these lives per running application.
///
/// `remaining_seconds` is the countdown as of `last_resume_at`; wall-clock time
/// past that anchor has not been counted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    pub status: TimerStatus,
    /// Present iff status is running, paused or completed.
    pub active_session: Option<Session>,
    pub remaining_seconds: i64,
    pub total_seconds: i64,
    /// Present iff status is running.
    pub last_resume_at: Option<DateTime<Utc>>,
    /// Kind suggested for the next session.
    #[serde(default = "default_next_kind")]
    pub next_kind: SessionKind,
    /// Work sessions completed so far; drives short/long recovery selection.
    #[serde(default)]
    pub completed_work_sessions: u32,
    #[serde(default)]
    pub continuation: Option<PendingContinuation>,
    #[serde(default)]
    pub pending_credits: Vec<PendingCredit>,
}

fn default_next_kind() -> SessionKind {
    SessionKind::Work
}

impl EngineState {
    /// Fresh idle state showing a countdown of `total_seconds`.
    pub fn idle(total_seconds: i64) -> Self {
        Self {
            status: TimerStatus::Idle,
            active_session: None,
            remaining_seconds: total_seconds,
            total_seconds,
            last_resume_at: None,
            next_kind: SessionKind::Work,
            completed_work_sessions: 0,
            continuation: None,
            pending_credits: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, TimerStatus::Running | TimerStatus::Paused)
    }

    pub fn elapsed_seconds(&self) -> i64 {
        (self.total_seconds - self.remaining_seconds).max(0)
    }

    /// Whole minutes counted so far, rounded down.
    pub fn elapsed_minutes(&self) -> u32 {
        u32::try_from(self.elapsed_seconds() / 60).unwrap_or(u32::MAX)
    }

    /// Whole wall-clock seconds since the counting anchor. Zero when paused or
    /// when the clock reads earlier than the anchor.
    pub fn uncounted_seconds(&self, now: DateTime<Utc>) -> i64 {
        self.last_resume_at
            .map(|anchor| (now - anchor).num_seconds().max(0))
            .unwrap_or(0)
    }

    /// 0.0 .. 100.0 progress within the current session.
    pub fn progress_pct(&self) -> f64 {
        if self.total_seconds <= 0 {
            return 0.0;
        }
        (self.elapsed_seconds() as f64 / self.total_seconds as f64 * 100.0).min(100.0)
    }

    pub(crate) fn begin(&mut self, session: Session, now: DateTime<Utc>) {
        let total = i64::from(session.planned_duration_minutes) * 60;
        self.status = TimerStatus::Running;
        self.active_session = Some(session);
        self.total_seconds = total;
        self.remaining_seconds = total;
        self.last_resume_at = Some(now);
        self.continuation = None;
    }

    pub(crate) fn enter_idle(&mut self, total_seconds: i64) {
        self.status = TimerStatus::Idle;
        self.active_session = None;
        self.total_seconds = total_seconds;
        self.remaining_seconds = total_seconds;
        self.last_resume_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn elapsed_minutes_round_down() {
        let mut state = EngineState::idle(1500);
        state.remaining_seconds = 1500 - 599;
        assert_eq!(state.elapsed_minutes(), 9);
        state.remaining_seconds = 1500 - 600;
        assert_eq!(state.elapsed_minutes(), 10);
    }

    #[test]
    fn uncounted_seconds_ignores_clock_running_backwards() {
        let now = Utc::now();
        let mut state = EngineState::idle(1500);
        state.last_resume_at = Some(now + Duration::seconds(30));
        assert_eq!(state.uncounted_seconds(now), 0);
        state.last_resume_at = Some(now - Duration::milliseconds(2_500));
        assert_eq!(state.uncounted_seconds(now), 2);
    }

    #[test]
    fn state_survives_json_without_optional_fields() {
        let json = r#"{
            "status": "paused",
            "active_session": null,
            "remaining_seconds": 42,
            "total_seconds": 300,
            "last_resume_at": null
        }"#;
        let state: EngineState = serde_json::from_str(json).unwrap();
        assert_eq!(state.status, TimerStatus::Paused);
        assert_eq!(state.next_kind, SessionKind::Work);
        assert!(state.pending_credits.is_empty());
    }
}
