//! Commits credited minutes to the aggregates and evaluates achievements.

use chrono::{DateTime, Local, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::achievements::{AchievementEvaluator, CatalogueEvaluator};
use crate::error::DatabaseError;
use crate::events::Event;
use crate::model::{Outcome, Session};
use crate::storage::SessionStore;

/// What happened to a credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CreditStatus {
    Committed,
    /// The store had already recorded this session's outcome.
    AlreadyCredited,
    /// The store failed; the credit is queued for retry.
    Deferred { reason: String },
    /// The store refused the credit in a way a retry cannot fix.
    Rejected { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditReceipt {
    pub session_id: String,
    pub minutes: u32,
    #[serde(flatten)]
    pub status: CreditStatus,
}

impl CreditReceipt {
    pub fn is_committed(&self) -> bool {
        self.status == CreditStatus::Committed
    }
}

pub struct Aggregator {
    evaluator: Box<dyn AchievementEvaluator + Send>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(Box::new(CatalogueEvaluator))
    }
}

impl Aggregator {
    pub fn new(evaluator: Box<dyn AchievementEvaluator + Send>) -> Self {
        Self { evaluator }
    }

    /// Credit a finalized session, then evaluate achievements.
    ///
    /// Returns the store error untouched when the credit transaction fails;
    /// the caller decides whether to queue a retry. Achievement failures after
    /// a committed credit are logged and do not affect the receipt.
    pub fn credit<S: SessionStore>(
        &self,
        store: &S,
        session: &Session,
        minutes: u32,
        now: DateTime<Utc>,
    ) -> Result<(CreditReceipt, Vec<Event>), DatabaseError> {
        let committed = store.credit_session(session, minutes)?;
        let status = if committed {
            CreditStatus::Committed
        } else {
            CreditStatus::AlreadyCredited
        };
        let receipt = CreditReceipt {
            session_id: session.id.clone(),
            minutes,
            status,
        };
        if !committed {
            tracing::debug!(session_id = %session.id, "session already credited");
            return Ok((receipt, Vec::new()));
        }

        tracing::info!(session_id = %session.id, minutes, "credit committed");
        let events = match self.evaluate(store, session, now) {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(error = %e, "achievement evaluation failed");
                Vec::new()
            }
        };
        Ok((receipt, events))
    }

    fn evaluate<S: SessionStore>(
        &self,
        store: &S,
        session: &Session,
        now: DateTime<Utc>,
    ) -> Result<Vec<Event>, DatabaseError> {
        let mut metrics = store.achievement_metrics(now)?;
        if session.kind.is_work() && session.outcome == Some(Outcome::Completed) {
            let ended = session.ended_at.unwrap_or(now);
            metrics.completion_hour = Some(ended.with_timezone(&Local).hour());
        }
        let unlocked = store.unlocked_achievements()?;

        let mut events = Vec::new();
        for unlock in self.evaluator.evaluate(&metrics, &unlocked) {
            if store.unlock_achievement(unlock.id, unlock.progress, now)? {
                tracing::info!(achievement = %unlock.id, "achievement unlocked");
                events.push(Event::AchievementUnlocked {
                    id: unlock.id,
                    name: unlock.id.def().name.to_string(),
                    progress: unlock.progress,
                    at: now,
                });
            }
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievements::AchievementId;
    use crate::model::{SessionKind, SessionTarget};
    use crate::storage::Database;
    use chrono::Duration;

    #[test]
    fn first_completed_hour_unlocks_achievements_once() {
        let db = Database::open_memory().unwrap();
        let skill = db.create_skill("Violin", None).unwrap();
        let aggregator = Aggregator::default();
        let now = Utc::now();

        let mut session = Session::new(SessionKind::Work, SessionTarget::skill(&skill.id), 60, now - Duration::minutes(60));
        session.finalize(now, Outcome::Completed, 60);

        let (receipt, events) = aggregator.credit(&db, &session, 60, now).unwrap();
        assert!(receipt.is_committed());
        let ids: Vec<AchievementId> = events
            .iter()
            .filter_map(|e| match e {
                Event::AchievementUnlocked { id, .. } => Some(*id),
                _ => None,
            })
            .collect();
        assert!(ids.contains(&AchievementId::FirstHour));
        assert!(ids.contains(&AchievementId::FirstSkill));

        let (again, events) = aggregator.credit(&db, &session, 60, now).unwrap();
        assert_eq!(again.status, CreditStatus::AlreadyCredited);
        assert!(events.is_empty());
    }

    #[test]
    fn receipt_serializes_status_inline() {
        let receipt = CreditReceipt {
            session_id: "abc".into(),
            minutes: 10,
            status: CreditStatus::Deferred {
                reason: "Database is locked".into(),
            },
        };
        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["status"], "deferred");
        assert_eq!(json["reason"], "Database is locked");
    }
}
