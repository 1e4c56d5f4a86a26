//! Database schema migrations for skillforge.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{params, Connection, Result as SqliteResult};

use crate::achievements::catalogue;

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 3;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }
    if current_version < 3 {
        migrate_v3(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: skills, tasks, sessions, daily buckets, achievements, kv.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS skills (
            id                  TEXT PRIMARY KEY,
            name                TEXT NOT NULL,
            description         TEXT NOT NULL DEFAULT '',
            goal_minutes        INTEGER NOT NULL DEFAULT 600000,
            accumulated_minutes INTEGER NOT NULL DEFAULT 0,
            is_active           INTEGER NOT NULL DEFAULT 0,
            created_at          TEXT NOT NULL,
            updated_at          TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tasks (
            id                  TEXT PRIMARY KEY,
            skill_id            TEXT NOT NULL REFERENCES skills(id) ON DELETE CASCADE,
            title               TEXT NOT NULL,
            estimated_intervals INTEGER NOT NULL DEFAULT 1,
            completed_intervals INTEGER NOT NULL DEFAULT 0,
            logged_minutes      INTEGER NOT NULL DEFAULT 0,
            created_at          TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS timer_sessions (
            id               TEXT PRIMARY KEY,
            kind             TEXT NOT NULL,
            skill_id         TEXT REFERENCES skills(id) ON DELETE SET NULL,
            task_id          TEXT REFERENCES tasks(id) ON DELETE SET NULL,
            planned_minutes  INTEGER NOT NULL,
            started_at       TEXT NOT NULL,
            ended_at         TEXT,
            credited_minutes INTEGER,
            outcome          TEXT,
            activity_date    TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS daily_activities (
            date           TEXT PRIMARY KEY,
            total_minutes  INTEGER NOT NULL DEFAULT 0,
            total_sessions INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS achievements (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            description TEXT NOT NULL,
            icon        TEXT NOT NULL,
            progress    INTEGER NOT NULL DEFAULT 0,
            target      INTEGER NOT NULL,
            unlocked_at TEXT
        );

        CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_skill_id ON tasks(skill_id);
        CREATE INDEX IF NOT EXISTS idx_timer_sessions_skill_id ON timer_sessions(skill_id);
        CREATE INDEX IF NOT EXISTS idx_timer_sessions_task_id ON timer_sessions(task_id);
        CREATE INDEX IF NOT EXISTS idx_timer_sessions_activity_date ON timer_sessions(activity_date);",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()?;
    Ok(())
}

/// Migration v2: seed the achievement catalogue.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO achievements (id, name, description, icon, target)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for def in catalogue() {
            stmt.execute(params![
                def.id.as_str(),
                def.name,
                def.description,
                def.icon,
                def.target
            ])?;
        }
    }

    set_schema_version(&tx, 2)?;
    tx.commit()?;
    Ok(())
}

/// Migration v3: daily journal entries and the skills they mention.
fn migrate_v3(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS reflections (
            id            TEXT PRIMARY KEY,
            date          TEXT NOT NULL UNIQUE,
            content       TEXT NOT NULL,
            mood          TEXT,
            total_minutes INTEGER NOT NULL DEFAULT 0,
            created_at    TEXT NOT NULL,
            updated_at    TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS reflection_skills (
            reflection_id TEXT NOT NULL REFERENCES reflections(id) ON DELETE CASCADE,
            skill_id      TEXT NOT NULL REFERENCES skills(id) ON DELETE CASCADE,
            PRIMARY KEY (reflection_id, skill_id)
        );",
    )?;

    set_schema_version(&tx, 3)?;
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_from_scratch() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);

        let achievements: i64 = conn
            .query_row("SELECT COUNT(*) FROM achievements", [], |row| row.get(0))
            .unwrap();
        assert_eq!(achievements, 15);

        let target: i64 = conn
            .query_row(
                "SELECT target FROM achievements WHERE id = 'skill_mastery'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(target, 600_000);
    }

    #[test]
    fn test_migrate_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();

        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
        let achievements: i64 = conn
            .query_row("SELECT COUNT(*) FROM achievements", [], |row| row.get(0))
            .unwrap();
        assert_eq!(achievements, 15);
    }

    #[test]
    fn test_incremental_migration_keeps_unlocks() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema_version_table(&conn).unwrap();
        migrate_v1(&conn).unwrap();
        conn.execute(
            "INSERT INTO achievements (id, name, description, icon, target, unlocked_at)
             VALUES ('first_hour', 'First Hour', '', 'Clock', 60, '2026-01-01T00:00:00+00:00')",
            [],
        )
        .unwrap();

        migrate(&conn).unwrap();

        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
        let unlocked: Option<String> = conn
            .query_row(
                "SELECT unlocked_at FROM achievements WHERE id = 'first_hour'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(unlocked.is_some());
    }

    #[test]
    fn test_v3_adds_journal_tables() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema_version_table(&conn).unwrap();
        migrate_v1(&conn).unwrap();
        migrate_v2(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), 2);

        migrate(&conn).unwrap();

        assert_eq!(get_schema_version(&conn), 3);
        for table in ["reflections", "reflection_skills"] {
            let found: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(found, 1, "missing table {table}");
        }
    }
}
