//! Domain records shared by the engine and the store.

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// What a session is spent on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Work,
    ShortRecovery,
    LongRecovery,
}

impl SessionKind {
    pub fn is_work(&self) -> bool {
        matches!(self, SessionKind::Work)
    }

    pub fn as_db_value(&self) -> &'static str {
        match self {
            SessionKind::Work => "work",
            SessionKind::ShortRecovery => "short_recovery",
            SessionKind::LongRecovery => "long_recovery",
        }
    }

    pub fn from_db_value(value: &str) -> Option<Self> {
        match value {
            "work" => Some(SessionKind::Work),
            "short_recovery" => Some(SessionKind::ShortRecovery),
            "long_recovery" => Some(SessionKind::LongRecovery),
            _ => None,
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionKind::Work => "Work",
            SessionKind::ShortRecovery => "Short recovery",
            SessionKind::LongRecovery => "Long recovery",
        };
        write!(f, "{label}")
    }
}

impl FromStr for SessionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "work" | "focus" => Ok(SessionKind::Work),
            "short_recovery" | "short" | "short_break" => Ok(SessionKind::ShortRecovery),
            "long_recovery" | "long" | "long_break" => Ok(SessionKind::LongRecovery),
            other => Err(format!("unknown session kind: {other}")),
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Completed,
    StoppedEarly,
    Discarded,
}

impl Outcome {
    pub fn as_db_value(&self) -> &'static str {
        match self {
            Outcome::Completed => "completed",
            Outcome::StoppedEarly => "stopped_early",
            Outcome::Discarded => "discarded",
        }
    }

    pub fn from_db_value(value: &str) -> Option<Self> {
        match value {
            "completed" => Some(Outcome::Completed),
            "stopped_early" => Some(Outcome::StoppedEarly),
            "discarded" => Some(Outcome::Discarded),
            _ => None,
        }
    }
}

/// The skill and task a session is logged against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTarget {
    pub skill_id: Option<String>,
    pub task_id: Option<String>,
}

impl SessionTarget {
    pub fn skill(skill_id: impl Into<String>) -> Self {
        Self {
            skill_id: Some(skill_id.into()),
            task_id: None,
        }
    }

    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }
}

/// A single timed interval.
///
/// `ended_at`, `outcome` and `credited_minutes` are written together, once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub kind: SessionKind,
    pub skill_id: Option<String>,
    pub task_id: Option<String>,
    pub planned_duration_minutes: u32,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub credited_minutes: Option<u32>,
    pub outcome: Option<Outcome>,
}

impl Session {
    pub fn new(
        kind: SessionKind,
        target: SessionTarget,
        planned_duration_minutes: u32,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            skill_id: target.skill_id,
            task_id: target.task_id,
            planned_duration_minutes,
            started_at,
            ended_at: None,
            credited_minutes: None,
            outcome: None,
        }
    }

    pub fn target(&self) -> SessionTarget {
        SessionTarget {
            skill_id: self.skill_id.clone(),
            task_id: self.task_id.clone(),
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.outcome.is_some()
    }

    /// Record the outcome. Returns `false` (and changes nothing) when the
    /// session was already finalized.
    pub fn finalize(&mut self, ended_at: DateTime<Utc>, outcome: Outcome, credited_minutes: u32) -> bool {
        if self.is_finalized() {
            return false;
        }
        self.ended_at = Some(ended_at);
        self.outcome = Some(outcome);
        self.credited_minutes = Some(credited_minutes);
        true
    }

    /// Calendar day the session counts toward.
    pub fn activity_date(&self) -> NaiveDate {
        local_date(self.started_at)
    }
}

/// An accumulation target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub id: String,
    pub name: String,
    pub goal_minutes: u64,
    pub accumulated_minutes: u64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Skill {
    /// 0.0 .. 100.0 progress toward the goal.
    pub fn goal_progress_pct(&self) -> f64 {
        if self.goal_minutes == 0 {
            return 0.0;
        }
        (self.accumulated_minutes as f64 / self.goal_minutes as f64 * 100.0).min(100.0)
    }
}

/// A unit of work sessions may be logged against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub skill_id: String,
    pub title: String,
    pub estimated_intervals: u32,
    pub completed_interval_count: u32,
    pub logged_minutes: u64,
    pub created_at: DateTime<Utc>,
}

/// Per-day totals of credited work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub total_minutes: u64,
    pub total_session_count: u32,
}

/// A journal entry for one local day.
///
/// `total_minutes` is the day's credited work at the time of the last write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reflection {
    pub id: String,
    pub date: NaiveDate,
    pub content: String,
    pub mood: Option<String>,
    pub total_minutes: u64,
    pub skill_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The local calendar date of a timestamp.
pub fn local_date(at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&Local).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_aliases() {
        assert_eq!("focus".parse::<SessionKind>().unwrap(), SessionKind::Work);
        assert_eq!("long-recovery".parse::<SessionKind>().unwrap(), SessionKind::LongRecovery);
        assert!("nap".parse::<SessionKind>().is_err());
    }

    #[test]
    fn finalize_only_once() {
        let now = Utc::now();
        let mut session = Session::new(SessionKind::Work, SessionTarget::default(), 25, now);
        assert!(session.finalize(now, Outcome::Completed, 25));
        assert!(!session.finalize(now, Outcome::StoppedEarly, 3));
        assert_eq!(session.outcome, Some(Outcome::Completed));
        assert_eq!(session.credited_minutes, Some(25));
    }

    #[test]
    fn kind_db_values_are_stable() {
        for kind in [SessionKind::Work, SessionKind::ShortRecovery, SessionKind::LongRecovery] {
            assert_eq!(SessionKind::from_db_value(kind.as_db_value()), Some(kind));
        }
    }
}
