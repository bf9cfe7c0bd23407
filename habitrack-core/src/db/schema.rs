//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: users, habits and the completion ledger
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id               TEXT PRIMARY KEY,
        name             TEXT NOT NULL,
        joined_at        DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS habits (
        id               TEXT PRIMARY KEY,
        user_id          TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        name             TEXT NOT NULL,
        category         TEXT NOT NULL,
        points           INTEGER NOT NULL CHECK (points >= 0),
        is_active        INTEGER NOT NULL DEFAULT 1,
        frequency        TEXT NOT NULL,
        created_at       DATETIME NOT NULL
    );

    -- Append-only: rows are never updated
    CREATE TABLE IF NOT EXISTS completions (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id          TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        habit_id         TEXT NOT NULL REFERENCES habits(id) ON DELETE CASCADE,
        completed_at     DATETIME NOT NULL,
        points_awarded   INTEGER NOT NULL,
        notes            TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_habits_user ON habits(user_id, is_active);
    CREATE INDEX IF NOT EXISTS idx_completions_user_ts ON completions(user_id, completed_at);
    CREATE INDEX IF NOT EXISTS idx_completions_habit ON completions(habit_id);
    "#,
    // Version 2: goals and badges
    r#"
    CREATE TABLE IF NOT EXISTS goals (
        id               TEXT PRIMARY KEY,
        user_id          TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        title            TEXT NOT NULL,
        description      TEXT,
        target_date      DATE,
        created_at       DATETIME NOT NULL,
        completed_at     DATETIME
    );

    CREATE TABLE IF NOT EXISTS badge_awards (
        user_id          TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        badge            TEXT NOT NULL,
        awarded_at       DATETIME NOT NULL,

        PRIMARY KEY (user_id, badge)
    );

    CREATE INDEX IF NOT EXISTS idx_goals_user ON goals(user_id);
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version = get_schema_version(conn)?;

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute_batch(&format!("PRAGMA user_version = {}", version))?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}
