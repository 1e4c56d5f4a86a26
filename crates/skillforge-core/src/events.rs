use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::achievements::AchievementId;
use crate::model::{Outcome, SessionKind, SessionTarget};
use crate::timer::TimerStatus;

/// Every state change in the engine produces an Event.
/// The CLI prints them; notification sinks receive them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        session_id: String,
        kind: SessionKind,
        planned_minutes: u32,
        target: SessionTarget,
        /// True when started by an auto-chain continuation.
        auto_chained: bool,
        at: DateTime<Utc>,
    },
    SessionPaused {
        session_id: String,
        remaining_seconds: i64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        session_id: String,
        remaining_seconds: i64,
        at: DateTime<Utc>,
    },
    /// Wall-clock time that passed while nobody was ticking was counted.
    SessionReconciled {
        session_id: String,
        counted_seconds: i64,
        remaining_seconds: i64,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        session_id: String,
        kind: SessionKind,
        credited_minutes: u32,
        at: DateTime<Utc>,
    },
    SessionStopped {
        session_id: String,
        kind: SessionKind,
        outcome: Outcome,
        credited_minutes: u32,
        at: DateTime<Utc>,
    },
    /// Stopped before a full minute elapsed; the session no longer exists.
    SessionDiscarded {
        session_id: String,
        kind: SessionKind,
        at: DateTime<Utc>,
    },
    ChainScheduled {
        next_kind: SessionKind,
        due_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    ChainCancelled {
        next_kind: SessionKind,
        at: DateTime<Utc>,
    },
    AchievementUnlocked {
        id: AchievementId,
        name: String,
        progress: u64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        status: TimerStatus,
        session_id: Option<String>,
        kind: Option<SessionKind>,
        remaining_seconds: i64,
        total_seconds: i64,
        next_kind: SessionKind,
        completed_work_sessions: u32,
        pending_credits: usize,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// One line of text suitable for a desktop notification or a log.
    pub fn headline(&self) -> String {
        match self {
            Event::SessionStarted { kind, planned_minutes, .. } => {
                format!("{kind} started ({planned_minutes} min)")
            }
            Event::SessionPaused { .. } => "Session paused".to_string(),
            Event::SessionResumed { .. } => "Session resumed".to_string(),
            Event::SessionReconciled { counted_seconds, .. } => {
                format!("Caught up {counted_seconds}s of elapsed time")
            }
            Event::SessionCompleted { kind, credited_minutes, .. } => {
                if kind.is_work() {
                    format!("{kind} complete: {credited_minutes} min logged")
                } else {
                    format!("{kind} over")
                }
            }
            Event::SessionStopped { credited_minutes, .. } => {
                format!("Stopped early: {credited_minutes} min logged")
            }
            Event::SessionDiscarded { .. } => "Session discarded".to_string(),
            Event::ChainScheduled { next_kind, .. } => format!("{next_kind} starts shortly"),
            Event::ChainCancelled { .. } => "Auto-start cancelled".to_string(),
            Event::AchievementUnlocked { name, .. } => format!("Achievement unlocked: {name}"),
            Event::StateSnapshot { status, .. } => format!("Timer {status}"),
        }
    }

    /// Whether the event is worth interrupting the user for.
    pub fn is_notable(&self) -> bool {
        matches!(
            self,
            Event::SessionCompleted { .. }
                | Event::SessionStarted { auto_chained: true, .. }
                | Event::AchievementUnlocked { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = Event::ChainCancelled {
            next_kind: SessionKind::ShortRecovery,
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ChainCancelled");
        assert_eq!(json["next_kind"], "short_recovery");
    }

    #[test]
    fn headline_mentions_credit() {
        let event = Event::SessionCompleted {
            session_id: "s".into(),
            kind: SessionKind::Work,
            credited_minutes: 25,
            at: Utc::now(),
        };
        assert_eq!(event.headline(), "Work complete: 25 min logged");
        assert!(event.is_notable());
    }
}
