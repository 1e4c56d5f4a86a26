//! SQLite-based storage for sessions, skills, tasks and their aggregates.
//!
//! Provides persistent storage for:
//! - Skills and tasks sessions are logged against
//! - Timer sessions and their one-time outcome
//! - Daily activity buckets and achievement unlocks
//! - One journal entry per day
//! - Key-value store for engine state

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::{data_dir, migrations, SessionStore};
use crate::achievements::{catalogue, Achievement, AchievementId, AchievementMetrics};
use crate::error::DatabaseError;
use crate::model::{
    local_date, DailyActivity, Outcome, Reflection, Session, SessionKind, SessionTarget, Skill,
    Task,
};
use crate::stats::{current_streak, Stats};
use crate::timer::EngineState;

const ENGINE_STATE_KEY: &str = "engine_state";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Default skill goal: ten thousand hours.
pub const DEFAULT_GOAL_MINUTES: u64 = 600_000;

/// Row counts touched by [`Database::rebuild_aggregates`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildSummary {
    pub skills: usize,
    pub tasks: usize,
    pub days: usize,
}

/// SQLite database for sessions and aggregates.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/skillforge/skillforge.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, DatabaseError> {
        let path = data_dir().map_err(DatabaseError::DataDir)?.join("skillforge.db");
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: PathBuf::from(path),
            source,
        })?;
        Self::init(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory().map_err(|source| DatabaseError::OpenFailed {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, DatabaseError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    // ── skills ──────────────────────────────────────────────────────────

    /// Create a skill. The first skill created becomes the active one.
    pub fn create_skill(&self, name: &str, goal_minutes: Option<u64>) -> Result<Skill, DatabaseError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DatabaseError::QueryFailed("skill name is empty".to_string()));
        }
        let now = Utc::now();
        let is_first = self.skill_count()? == 0;
        let skill = Skill {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            goal_minutes: goal_minutes.unwrap_or(DEFAULT_GOAL_MINUTES),
            accumulated_minutes: 0,
            is_active: is_first,
            created_at: now,
        };
        self.conn.execute(
            "INSERT INTO skills (id, name, goal_minutes, accumulated_minutes, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, 0, ?4, ?5, ?5)",
            params![
                skill.id,
                skill.name,
                skill.goal_minutes,
                skill.is_active,
                now.to_rfc3339()
            ],
        )?;
        Ok(skill)
    }

    pub fn get_skill(&self, id: &str) -> Result<Option<Skill>, DatabaseError> {
        let skill = self
            .conn
            .query_row(
                "SELECT id, name, goal_minutes, accumulated_minutes, is_active, created_at
                 FROM skills WHERE id = ?1",
                [id],
                skill_from_row,
            )
            .optional()?;
        Ok(skill)
    }

    pub fn list_skills(&self) -> Result<Vec<Skill>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, goal_minutes, accumulated_minutes, is_active, created_at
             FROM skills ORDER BY created_at, name",
        )?;
        let skills = stmt
            .query_map([], skill_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(skills)
    }

    /// Make `id` the only active skill.
    pub fn set_active_skill(&self, id: &str) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        let exists: bool = tx
            .query_row("SELECT 1 FROM skills WHERE id = ?1", [id], |_| Ok(true))
            .optional()?
            .unwrap_or(false);
        if !exists {
            return Err(DatabaseError::NotFound(format!("no such skill: {id}")));
        }
        tx.execute(
            "UPDATE skills SET is_active = (id = ?1), updated_at = ?2",
            params![id, Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn active_skill(&self) -> Result<Option<Skill>, DatabaseError> {
        let skill = self
            .conn
            .query_row(
                "SELECT id, name, goal_minutes, accumulated_minutes, is_active, created_at
                 FROM skills WHERE is_active = 1 LIMIT 1",
                [],
                skill_from_row,
            )
            .optional()?;
        Ok(skill)
    }

    fn skill_count(&self) -> Result<u64, DatabaseError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM skills", [], |row| row.get(0))?)
    }

    // ── tasks ───────────────────────────────────────────────────────────

    pub fn create_task(
        &self,
        skill_id: &str,
        title: &str,
        estimated_intervals: u32,
    ) -> Result<Task, DatabaseError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(DatabaseError::QueryFailed("task title is empty".to_string()));
        }
        if self.get_skill(skill_id)?.is_none() {
            return Err(DatabaseError::NotFound(format!("no such skill: {skill_id}")));
        }
        let task = Task {
            id: uuid::Uuid::new_v4().to_string(),
            skill_id: skill_id.to_string(),
            title: title.to_string(),
            estimated_intervals,
            completed_interval_count: 0,
            logged_minutes: 0,
            created_at: Utc::now(),
        };
        self.conn.execute(
            "INSERT INTO tasks (id, skill_id, title, estimated_intervals, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                task.id,
                task.skill_id,
                task.title,
                task.estimated_intervals,
                task.created_at.to_rfc3339()
            ],
        )?;
        Ok(task)
    }

    pub fn get_task(&self, id: &str) -> Result<Option<Task>, DatabaseError> {
        let task = self
            .conn
            .query_row(
                "SELECT id, skill_id, title, estimated_intervals, completed_intervals, logged_minutes, created_at
                 FROM tasks WHERE id = ?1",
                [id],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    /// Tasks of one skill, or of every skill.
    pub fn list_tasks(&self, skill_id: Option<&str>) -> Result<Vec<Task>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, skill_id, title, estimated_intervals, completed_intervals, logged_minutes, created_at
             FROM tasks
             WHERE ?1 IS NULL OR skill_id = ?1
             ORDER BY created_at, title",
        )?;
        let tasks = stmt
            .query_map([skill_id], task_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    // ── sessions ────────────────────────────────────────────────────────

    pub fn get_session(&self, id: &str) -> Result<Option<Session>, DatabaseError> {
        let session = self
            .conn
            .query_row(
                "SELECT id, kind, skill_id, task_id, planned_minutes, started_at, ended_at, credited_minutes, outcome
                 FROM timer_sessions WHERE id = ?1",
                [id],
                session_from_row,
            )
            .optional()?;
        Ok(session)
    }

    /// Most recent sessions first.
    pub fn list_sessions(&self, limit: usize) -> Result<Vec<Session>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, skill_id, task_id, planned_minutes, started_at, ended_at, credited_minutes, outcome
             FROM timer_sessions ORDER BY started_at DESC LIMIT ?1",
        )?;
        let sessions = stmt
            .query_map([limit as i64], session_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    // ── aggregates ──────────────────────────────────────────────────────

    pub fn daily_activity(&self, date: NaiveDate) -> Result<Option<DailyActivity>, DatabaseError> {
        let activity = self
            .conn
            .query_row(
                "SELECT date, total_minutes, total_sessions FROM daily_activities WHERE date = ?1",
                [date.format(DATE_FORMAT).to_string()],
                daily_from_row,
            )
            .optional()?;
        Ok(activity)
    }

    /// Every bucket, oldest first.
    pub fn daily_activities(&self) -> Result<Vec<DailyActivity>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT date, total_minutes, total_sessions FROM daily_activities ORDER BY date")?;
        let days = stmt
            .query_map([], daily_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(days)
    }

    fn practice_days(&self) -> Result<Vec<NaiveDate>, DatabaseError> {
        Ok(self
            .daily_activities()?
            .into_iter()
            .filter(|day| day.total_minutes > 0)
            .map(|day| day.date)
            .collect())
    }

    /// (minutes, completed sessions) summed over `[from, to]`.
    fn bucket_totals(&self, from: NaiveDate, to: NaiveDate) -> Result<(u64, u64), DatabaseError> {
        Ok(self.conn.query_row(
            "SELECT COALESCE(SUM(total_minutes), 0), COALESCE(SUM(total_sessions), 0)
             FROM daily_activities WHERE date >= ?1 AND date <= ?2",
            [
                from.format(DATE_FORMAT).to_string(),
                to.format(DATE_FORMAT).to_string(),
            ],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?)
    }

    /// Today's, this week's and all-time totals as of `now`, without goals.
    pub fn stats(&self, now: DateTime<Utc>) -> Result<Stats, DatabaseError> {
        let today = local_date(now);
        let (today_minutes, today_sessions) = self.bucket_totals(today, today)?;
        let (week_minutes, _) = self.bucket_totals(today - Duration::days(6), today)?;
        let (total_minutes, total_sessions) = self.conn.query_row(
            "SELECT COALESCE(SUM(total_minutes), 0), COALESCE(SUM(total_sessions), 0)
             FROM daily_activities",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(Stats {
            today_minutes,
            today_sessions,
            week_minutes,
            total_minutes,
            total_sessions,
            streak_days: current_streak(&self.practice_days()?, today),
            ..Stats::default()
        })
    }

    /// Recompute skill minutes, task progress and daily buckets from the
    /// credited sessions.
    pub fn rebuild_aggregates(&self) -> Result<RebuildSummary, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;

        let skills = tx.execute(
            "UPDATE skills SET accumulated_minutes = COALESCE((
                SELECT SUM(s.credited_minutes) FROM timer_sessions s
                WHERE s.skill_id = skills.id AND s.credited_minutes > 0
             ), 0)",
            [],
        )?;

        let tasks = tx.execute(
            "UPDATE tasks SET
                logged_minutes = COALESCE((
                    SELECT SUM(s.credited_minutes) FROM timer_sessions s
                    WHERE s.task_id = tasks.id AND s.kind = 'work' AND s.credited_minutes > 0
                ), 0),
                completed_intervals = (
                    SELECT COUNT(*) FROM timer_sessions s
                    WHERE s.task_id = tasks.id AND s.kind = 'work' AND s.outcome = 'completed'
                      AND s.credited_minutes > 0
                )",
            [],
        )?;

        tx.execute("DELETE FROM daily_activities", [])?;
        let days = tx.execute(
            "INSERT INTO daily_activities (date, total_minutes, total_sessions)
             SELECT activity_date,
                    SUM(credited_minutes),
                    SUM(CASE WHEN outcome = 'completed' THEN 1 ELSE 0 END)
             FROM timer_sessions
             WHERE credited_minutes > 0
             GROUP BY activity_date",
            [],
        )?;

        tx.commit()?;
        tracing::info!(skills, tasks, days, "rebuilt aggregates from sessions");
        Ok(RebuildSummary { skills, tasks, days })
    }

    // ── achievements ────────────────────────────────────────────────────

    /// The full catalogue with unlock state. Locked entries report their
    /// live progress as of `now`.
    pub fn list_achievements(&self, now: DateTime<Utc>) -> Result<Vec<Achievement>, DatabaseError> {
        let metrics = self.achievement_metrics(now)?;
        let mut stmt = self
            .conn
            .prepare("SELECT id, progress, unlocked_at FROM achievements")?;
        let stored = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, u64>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut out = Vec::with_capacity(catalogue().len());
        for def in catalogue() {
            let row = stored.iter().find(|(id, _, _)| id == def.id.as_str());
            let unlocked_at = match row.and_then(|(_, _, at)| at.as_deref()) {
                Some(at) => Some(parse_timestamp(at).map_err(|e| DatabaseError::Corrupt(e.to_string()))?),
                None => None,
            };
            let progress = match (unlocked_at, row) {
                (Some(_), Some((_, progress, _))) => *progress,
                _ => metrics.value_of(def.metric).min(def.target),
            };
            out.push(Achievement {
                id: def.id,
                name: def.name.to_string(),
                description: def.description.to_string(),
                icon: def.icon.to_string(),
                progress,
                target: def.target,
                unlocked_at,
            });
        }
        Ok(out)
    }

    // ── journal ─────────────────────────────────────────────────────────

    /// Write the journal entry for `date`, replacing an earlier one for the
    /// same day along with its skill links.
    ///
    /// The entry's `total_minutes` is the day's credited work as of this call.
    pub fn upsert_reflection(
        &self,
        date: NaiveDate,
        content: &str,
        mood: Option<&str>,
        skill_ids: &[String],
    ) -> Result<Reflection, DatabaseError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(DatabaseError::QueryFailed("reflection content is empty".to_string()));
        }
        let mood = mood.map(str::trim).filter(|m| !m.is_empty());
        for skill_id in skill_ids {
            if self.get_skill(skill_id)?.is_none() {
                return Err(DatabaseError::NotFound(format!("no such skill: {skill_id}")));
            }
        }

        let day = date.format(DATE_FORMAT).to_string();
        let total_minutes = self.daily_activity(date)?.map_or(0, |d| d.total_minutes);
        let now = Utc::now().to_rfc3339();

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO reflections (id, date, content, mood, total_minutes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT(date) DO UPDATE SET
                content = excluded.content,
                mood = excluded.mood,
                total_minutes = excluded.total_minutes,
                updated_at = excluded.updated_at",
            params![
                uuid::Uuid::new_v4().to_string(),
                day,
                content,
                mood,
                total_minutes as i64,
                now
            ],
        )?;
        let id: String = tx.query_row("SELECT id FROM reflections WHERE date = ?1", [&day], |row| {
            row.get(0)
        })?;
        tx.execute("DELETE FROM reflection_skills WHERE reflection_id = ?1", [&id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO reflection_skills (reflection_id, skill_id) VALUES (?1, ?2)",
            )?;
            for skill_id in skill_ids {
                stmt.execute(params![id, skill_id])?;
            }
        }
        tx.commit()?;

        tracing::debug!(%date, reflection_id = %id, "journal entry written");
        self.get_reflection(date)?
            .ok_or_else(|| DatabaseError::NotFound(format!("reflection for {day}")))
    }

    pub fn get_reflection(&self, date: NaiveDate) -> Result<Option<Reflection>, DatabaseError> {
        let reflection = self
            .conn
            .query_row(
                "SELECT id, date, content, mood, total_minutes, created_at, updated_at
                 FROM reflections WHERE date = ?1",
                [date.format(DATE_FORMAT).to_string()],
                reflection_from_row,
            )
            .optional()?;
        match reflection {
            Some(mut reflection) => {
                reflection.skill_ids = self.reflection_skill_ids(&reflection.id)?;
                Ok(Some(reflection))
            }
            None => Ok(None),
        }
    }

    /// Most recent days first.
    pub fn list_reflections(&self, limit: usize) -> Result<Vec<Reflection>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, date, content, mood, total_minutes, created_at, updated_at
             FROM reflections ORDER BY date DESC LIMIT ?1",
        )?;
        let mut reflections = stmt
            .query_map([limit as i64], reflection_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        for reflection in &mut reflections {
            reflection.skill_ids = self.reflection_skill_ids(&reflection.id)?;
        }
        Ok(reflections)
    }

    fn reflection_skill_ids(&self, reflection_id: &str) -> Result<Vec<String>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT skill_id FROM reflection_skills WHERE reflection_id = ?1 ORDER BY skill_id",
        )?;
        let ids = stmt
            .query_map([reflection_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    // ── kv ──────────────────────────────────────────────────────────────

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl SessionStore for Database {
    fn resolve_target(&self, target: &SessionTarget) -> Result<SessionTarget, DatabaseError> {
        let mut resolved = SessionTarget::default();
        if let Some(skill_id) = &target.skill_id {
            if self.get_skill(skill_id)?.is_some() {
                resolved.skill_id = Some(skill_id.clone());
            }
        }
        if let Some(task) = match &target.task_id {
            Some(task_id) => self.get_task(task_id)?,
            None => None,
        } {
            match &resolved.skill_id {
                Some(skill_id) if *skill_id != task.skill_id => {}
                Some(_) => resolved.task_id = Some(task.id),
                None if target.skill_id.is_none() => {
                    resolved.skill_id = Some(task.skill_id);
                    resolved.task_id = Some(task.id);
                }
                None => {}
            }
        }
        Ok(resolved)
    }

    fn insert_session(&self, session: &Session) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO timer_sessions
                (id, kind, skill_id, task_id, planned_minutes, started_at, ended_at, credited_minutes, outcome, activity_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                session.id,
                session.kind.as_db_value(),
                session.skill_id,
                session.task_id,
                session.planned_duration_minutes,
                session.started_at.to_rfc3339(),
                session.ended_at.map(|t| t.to_rfc3339()),
                session.credited_minutes,
                session.outcome.map(|o| o.as_db_value()),
                session.activity_date().format(DATE_FORMAT).to_string(),
            ],
        )?;
        Ok(())
    }

    fn finalize_session(
        &self,
        id: &str,
        ended_at: DateTime<Utc>,
        outcome: Outcome,
        credited_minutes: u32,
    ) -> Result<bool, DatabaseError> {
        let changed = self.conn.execute(
            "UPDATE timer_sessions SET ended_at = ?2, outcome = ?3, credited_minutes = ?4
             WHERE id = ?1 AND outcome IS NULL",
            params![id, ended_at.to_rfc3339(), outcome.as_db_value(), credited_minutes],
        )?;
        Ok(changed > 0)
    }

    fn delete_session(&self, id: &str) -> Result<(), DatabaseError> {
        self.conn
            .execute("DELETE FROM timer_sessions WHERE id = ?1", [id])?;
        Ok(())
    }

    fn increment_skill_minutes(&self, skill_id: &str, minutes: u32) -> Result<(), DatabaseError> {
        add_skill_minutes(&self.conn, skill_id, minutes)
    }

    fn increment_task_progress(
        &self,
        task_id: &str,
        minutes: u32,
        completed_delta: u32,
    ) -> Result<(), DatabaseError> {
        add_task_progress(&self.conn, task_id, minutes, completed_delta)
    }

    fn upsert_daily_activity(
        &self,
        date: NaiveDate,
        minutes_delta: u32,
        session_delta: u32,
    ) -> Result<(), DatabaseError> {
        add_daily_activity(&self.conn, date, minutes_delta, session_delta)
    }

    /// Finalize the row and apply every increment in one transaction.
    ///
    /// The finalize step is an upsert guarded on `outcome IS NULL`, so a row
    /// whose insert was lost is created here and a row already credited is
    /// left untouched.
    fn credit_session(&self, session: &Session, minutes: u32) -> Result<bool, DatabaseError> {
        let (Some(outcome), Some(ended_at)) = (session.outcome, session.ended_at) else {
            return Err(DatabaseError::QueryFailed(format!(
                "session {} is not finalized",
                session.id
            )));
        };

        let tx = self.conn.unchecked_transaction()?;
        let finalized = tx.execute(
            "INSERT INTO timer_sessions
                (id, kind, skill_id, task_id, planned_minutes, started_at, ended_at, credited_minutes, outcome, activity_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
                ended_at = excluded.ended_at,
                credited_minutes = excluded.credited_minutes,
                outcome = excluded.outcome
             WHERE timer_sessions.outcome IS NULL",
            params![
                session.id,
                session.kind.as_db_value(),
                session.skill_id,
                session.task_id,
                session.planned_duration_minutes,
                session.started_at.to_rfc3339(),
                ended_at.to_rfc3339(),
                minutes,
                outcome.as_db_value(),
                session.activity_date().format(DATE_FORMAT).to_string(),
            ],
        )?;
        if finalized == 0 {
            return Ok(false);
        }

        let completed = u32::from(outcome == Outcome::Completed);
        if let Some(skill_id) = &session.skill_id {
            add_skill_minutes(&tx, skill_id, minutes)?;
        }
        if let (Some(task_id), true) = (&session.task_id, session.kind.is_work()) {
            add_task_progress(&tx, task_id, minutes, completed)?;
        }
        add_daily_activity(&tx, session.activity_date(), minutes, completed)?;

        tx.commit()?;
        Ok(true)
    }

    fn load_latest_engine_state(&self) -> Result<Option<EngineState>, DatabaseError> {
        match self.kv_get(ENGINE_STATE_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn persist_engine_state(&self, state: &EngineState) -> Result<(), DatabaseError> {
        let json = serde_json::to_string(state)?;
        self.kv_set(ENGINE_STATE_KEY, &json)
    }

    fn achievement_metrics(&self, now: DateTime<Utc>) -> Result<AchievementMetrics, DatabaseError> {
        let today = local_date(now);
        let (total_minutes, max_skill_minutes, skill_count) = self.conn.query_row(
            "SELECT COALESCE(SUM(accumulated_minutes), 0), COALESCE(MAX(accumulated_minutes), 0), COUNT(*)
             FROM skills",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        let (_, today_sessions) = self.bucket_totals(today, today)?;
        let (_, week_sessions) = self.bucket_totals(today - Duration::days(6), today)?;
        Ok(AchievementMetrics {
            total_minutes,
            max_skill_minutes,
            streak_days: current_streak(&self.practice_days()?, today),
            skill_count,
            today_sessions,
            week_sessions,
            completion_hour: None,
        })
    }

    fn unlocked_achievements(&self) -> Result<HashSet<AchievementId>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM achievements WHERE unlocked_at IS NOT NULL")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids.iter().filter_map(|id| id.parse().ok()).collect())
    }

    fn unlock_achievement(
        &self,
        id: AchievementId,
        progress: u64,
        at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let changed = self.conn.execute(
            "UPDATE achievements SET unlocked_at = ?2, progress = ?3
             WHERE id = ?1 AND unlocked_at IS NULL",
            params![id.as_str(), at.to_rfc3339(), progress],
        )?;
        Ok(changed > 0)
    }
}

fn add_skill_minutes(conn: &Connection, skill_id: &str, minutes: u32) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE skills SET accumulated_minutes = accumulated_minutes + ?2, updated_at = ?3 WHERE id = ?1",
        params![skill_id, minutes, Utc::now().to_rfc3339()],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound(format!("no such skill: {skill_id}")));
    }
    Ok(())
}

fn add_task_progress(
    conn: &Connection,
    task_id: &str,
    minutes: u32,
    completed_delta: u32,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE tasks SET logged_minutes = logged_minutes + ?2,
                          completed_intervals = completed_intervals + ?3
         WHERE id = ?1",
        params![task_id, minutes, completed_delta],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound(format!("no such task: {task_id}")));
    }
    Ok(())
}

fn add_daily_activity(
    conn: &Connection,
    date: NaiveDate,
    minutes_delta: u32,
    session_delta: u32,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO daily_activities (date, total_minutes, total_sessions) VALUES (?1, ?2, ?3)
         ON CONFLICT(date) DO UPDATE SET
            total_minutes = total_minutes + excluded.total_minutes,
            total_sessions = total_sessions + excluded.total_sessions",
        params![date.format(DATE_FORMAT).to_string(), minutes_delta, session_delta],
    )?;
    Ok(())
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, message.into())
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|t| t.with_timezone(&Utc))
}

fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).map_err(|e| conversion_error(idx, e.to_string()))
}

fn skill_from_row(row: &Row<'_>) -> rusqlite::Result<Skill> {
    Ok(Skill {
        id: row.get(0)?,
        name: row.get(1)?,
        goal_minutes: row.get(2)?,
        accumulated_minutes: row.get(3)?,
        is_active: row.get(4)?,
        created_at: timestamp_at(row, 5)?,
    })
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        skill_id: row.get(1)?,
        title: row.get(2)?,
        estimated_intervals: row.get(3)?,
        completed_interval_count: row.get(4)?,
        logged_minutes: row.get(5)?,
        created_at: timestamp_at(row, 6)?,
    })
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    let kind: String = row.get(1)?;
    let ended_at = match row.get::<_, Option<String>>(6)? {
        Some(raw) => Some(parse_timestamp(&raw).map_err(|e| conversion_error(6, e.to_string()))?),
        None => None,
    };
    let outcome = match row.get::<_, Option<String>>(8)? {
        Some(raw) => Some(
            Outcome::from_db_value(&raw)
                .ok_or_else(|| conversion_error(8, format!("unknown outcome: {raw}")))?,
        ),
        None => None,
    };
    Ok(Session {
        id: row.get(0)?,
        kind: SessionKind::from_db_value(&kind)
            .ok_or_else(|| conversion_error(1, format!("unknown session kind: {kind}")))?,
        skill_id: row.get(2)?,
        task_id: row.get(3)?,
        planned_duration_minutes: row.get(4)?,
        started_at: timestamp_at(row, 5)?,
        ended_at,
        credited_minutes: row.get(7)?,
        outcome,
    })
}

fn daily_from_row(row: &Row<'_>) -> rusqlite::Result<DailyActivity> {
    let raw: String = row.get(0)?;
    Ok(DailyActivity {
        date: NaiveDate::parse_from_str(&raw, DATE_FORMAT)
            .map_err(|e| conversion_error(0, e.to_string()))?,
        total_minutes: row.get(1)?,
        total_session_count: row.get(2)?,
    })
}

fn reflection_from_row(row: &Row<'_>) -> rusqlite::Result<Reflection> {
    let raw: String = row.get(1)?;
    Ok(Reflection {
        id: row.get(0)?,
        date: NaiveDate::parse_from_str(&raw, DATE_FORMAT)
            .map_err(|e| conversion_error(1, e.to_string()))?,
        content: row.get(2)?,
        mood: row.get(3)?,
        total_minutes: row.get(4)?,
        skill_ids: Vec::new(),
        created_at: timestamp_at(row, 5)?,
        updated_at: timestamp_at(row, 6)?,
    })
}
