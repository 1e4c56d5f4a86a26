//! The persistence seam between the timer engine and its backing store.
//!
//! [`Database`](super::Database) is the production implementation; tests wrap
//! it to inject failures.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashSet;

use crate::achievements::{AchievementId, AchievementMetrics};
use crate::error::DatabaseError;
use crate::model::{Outcome, Session, SessionTarget};
use crate::timer::EngineState;

/// Durable storage the engine writes through.
///
/// Every method is a potential `PersistenceFailure`; the engine logs and
/// absorbs them rather than surfacing them to its callers.
pub trait SessionStore {
    /// The part of `target` that refers to rows which exist.
    ///
    /// Unknown skills and tasks are dropped, as is a task that belongs to a
    /// different skill. A task given without a skill brings its own skill.
    fn resolve_target(&self, target: &SessionTarget) -> Result<SessionTarget, DatabaseError>;

    fn insert_session(&self, session: &Session) -> Result<(), DatabaseError>;

    /// Write `ended_at`, `outcome` and `credited_minutes`. Returns `false` when
    /// the session was already finalized, in which case nothing changes.
    fn finalize_session(
        &self,
        id: &str,
        ended_at: DateTime<Utc>,
        outcome: Outcome,
        credited_minutes: u32,
    ) -> Result<bool, DatabaseError>;

    fn delete_session(&self, id: &str) -> Result<(), DatabaseError>;

    fn increment_skill_minutes(&self, skill_id: &str, minutes: u32) -> Result<(), DatabaseError>;

    fn increment_task_progress(
        &self,
        task_id: &str,
        minutes: u32,
        completed_delta: u32,
    ) -> Result<(), DatabaseError>;

    fn upsert_daily_activity(
        &self,
        date: NaiveDate,
        minutes_delta: u32,
        session_delta: u32,
    ) -> Result<(), DatabaseError>;

    /// Apply a finalized session's credit to every aggregate.
    ///
    /// Returns `false` if the session had already been credited. The default
    /// composes the primitive operations one by one; stores with transactions
    /// should override it so a failure leaves nothing applied.
    fn credit_session(&self, session: &Session, minutes: u32) -> Result<bool, DatabaseError> {
        let (Some(outcome), Some(ended_at)) = (session.outcome, session.ended_at) else {
            return Err(DatabaseError::QueryFailed(format!(
                "session {} is not finalized",
                session.id
            )));
        };
        if !self.finalize_session(&session.id, ended_at, outcome, minutes)? {
            return Ok(false);
        }
        let completed = u32::from(outcome == Outcome::Completed);
        if let Some(skill_id) = &session.skill_id {
            self.increment_skill_minutes(skill_id, minutes)?;
        }
        if let (Some(task_id), true) = (&session.task_id, session.kind.is_work()) {
            self.increment_task_progress(task_id, minutes, completed)?;
        }
        self.upsert_daily_activity(session.activity_date(), minutes, completed)?;
        Ok(true)
    }

    fn load_latest_engine_state(&self) -> Result<Option<EngineState>, DatabaseError>;

    fn persist_engine_state(&self, state: &EngineState) -> Result<(), DatabaseError>;

    /// Metric read-back for achievement evaluation, as of `now`.
    fn achievement_metrics(&self, now: DateTime<Utc>) -> Result<AchievementMetrics, DatabaseError>;

    fn unlocked_achievements(&self) -> Result<HashSet<AchievementId>, DatabaseError>;

    /// Record an unlock. Returns `false` if it was already unlocked.
    fn unlock_achievement(
        &self,
        id: AchievementId,
        progress: u64,
        at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError>;
}
