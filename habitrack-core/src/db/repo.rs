//! Database repository layer
//!
//! Provides query and insert operations for all entity types.

use crate::error::{Error, Result};
use crate::types::*;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Filter for habit listings.
#[derive(Debug, Clone, Default)]
pub struct HabitFilter {
    /// Only habits with `is_active = 1`
    pub active_only: bool,
    /// Restrict to one category
    pub category: Option<String>,
}

/// Database handle (single connection)
pub struct Database {
    conn: Mutex<Connection>,
}

/// Canonical text form for stored timestamps. Fixed width so that string
/// comparison in SQL matches chronological order.
fn ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_failure(row: &Row, column: &str, message: String) -> rusqlite::Error {
    let idx = row.as_ref().column_index(column).unwrap_or(0);
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn parse_ts(row: &Row, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_failure(row, column, format!("bad timestamp {:?}: {}", raw, e)))
}

fn parse_ts_opt(row: &Row, column: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(column)?;
    match raw {
        Some(_) => parse_ts(row, column).map(Some),
        None => Ok(None),
    }
}

/// Malformed stored values surface as [`Error::InvalidData`], everything
/// else as a database error.
fn row_error(e: rusqlite::Error) -> Error {
    match e {
        rusqlite::Error::FromSqlConversionFailure(_, _, inner) => {
            Error::InvalidData(inner.to_string())
        }
        other => Error::Database(other),
    }
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        tracing::debug!(path = %path.display(), "Opened database");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn();
        super::schema::run_migrations(&conn)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock cannot leave SQLite half-written
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ============================================
    // User operations
    // ============================================

    /// Insert a new user
    pub fn insert_user(&self, user: &User) -> Result<()> {
        if user.name.trim().is_empty() {
            return Err(Error::InvalidInput("user name must not be empty".into()));
        }
        let conn = self.conn();
        conn.execute(
            "INSERT INTO users (id, name, joined_at) VALUES (?1, ?2, ?3)",
            params![user.id, user.name, ts(user.joined_at)],
        )?;
        tracing::info!(user_id = %user.id, "Created user");
        Ok(())
    }

    /// Get a user by ID
    pub fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row("SELECT * FROM users WHERE id = ?", [id], Self::row_to_user)
            .optional()
            .map_err(row_error)
    }

    /// List all users, oldest first
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT * FROM users ORDER BY joined_at, name")?;
        let users = stmt
            .query_map([], Self::row_to_user)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(row_error)?;
        Ok(users)
    }

    fn require_user(&self, id: &str) -> Result<User> {
        self.get_user(id)?
            .ok_or_else(|| Error::UserNotFound(id.to_string()))
    }

    fn row_to_user(row: &Row) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get("id")?,
            name: row.get("name")?,
            joined_at: parse_ts(row, "joined_at")?,
        })
    }

    // ============================================
    // Habit operations
    // ============================================

    /// Insert a new habit for an existing user
    pub fn insert_habit(&self, habit: &Habit) -> Result<()> {
        if habit.name.trim().is_empty() {
            return Err(Error::InvalidInput("habit name must not be empty".into()));
        }
        if !(0..=MAX_HABIT_POINTS).contains(&habit.points) {
            return Err(Error::InvalidInput(format!(
                "habit points must be between 0 and {}, got {}",
                MAX_HABIT_POINTS, habit.points
            )));
        }
        self.require_user(&habit.user_id)?;

        let conn = self.conn();
        conn.execute(
            r#"
            INSERT INTO habits (id, user_id, name, category, points, is_active, frequency, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                habit.id,
                habit.user_id,
                habit.name,
                habit.category,
                habit.points,
                habit.is_active,
                habit.frequency.as_str(),
                ts(habit.created_at),
            ],
        )?;
        tracing::info!(habit_id = %habit.id, user_id = %habit.user_id, "Created habit");
        Ok(())
    }

    /// Get a habit by ID
    pub fn get_habit(&self, id: &str) -> Result<Option<Habit>> {
        let conn = self.conn();
        conn.query_row("SELECT * FROM habits WHERE id = ?", [id], Self::row_to_habit)
            .optional()
            .map_err(row_error)
    }

    /// List a user's habits with optional filtering
    pub fn list_habits(&self, user_id: &str, filter: &HabitFilter) -> Result<Vec<Habit>> {
        let conn = self.conn();

        let mut sql = String::from("SELECT * FROM habits WHERE user_id = ?");
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id.to_string())];

        if filter.active_only {
            sql.push_str(" AND is_active = 1");
        }

        if let Some(category) = &filter.category {
            sql.push_str(" AND category = ?");
            params.push(Box::new(category.clone()));
        }

        sql.push_str(" ORDER BY created_at, name");

        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let habits = stmt
            .query_map(params_refs.as_slice(), Self::row_to_habit)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(row_error)?;

        Ok(habits)
    }

    /// Activate or deactivate a habit
    pub fn set_habit_active(&self, id: &str, active: bool) -> Result<()> {
        let conn = self.conn();
        let changed = conn.execute(
            "UPDATE habits SET is_active = ?1 WHERE id = ?2",
            params![active, id],
        )?;
        if changed == 0 {
            return Err(Error::HabitNotFound(id.to_string()));
        }
        tracing::info!(habit_id = %id, active, "Updated habit status");
        Ok(())
    }

    /// Delete a habit and, by cascade, all of its completions
    pub fn delete_habit(&self, id: &str) -> Result<()> {
        let conn = self.conn();
        let changed = conn.execute("DELETE FROM habits WHERE id = ?", [id])?;
        if changed == 0 {
            return Err(Error::HabitNotFound(id.to_string()));
        }
        tracing::info!(habit_id = %id, "Deleted habit");
        Ok(())
    }

    fn row_to_habit(row: &Row) -> rusqlite::Result<Habit> {
        let frequency_str: String = row.get("frequency")?;
        let frequency = frequency_str
            .parse::<Frequency>()
            .map_err(|e| conversion_failure(row, "frequency", e))?;

        Ok(Habit {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            category: row.get("category")?,
            points: row.get("points")?,
            is_active: row.get("is_active")?,
            frequency,
            created_at: parse_ts(row, "created_at")?,
        })
    }

    // ============================================
    // Completion ledger
    // ============================================

    /// Append a completion for an active habit.
    ///
    /// The habit's current point value is copied onto the event.
    pub fn record_completion(
        &self,
        habit_id: &str,
        completed_at: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<CompletionEvent> {
        let habit = self
            .get_habit(habit_id)?
            .ok_or_else(|| Error::HabitNotFound(habit_id.to_string()))?;
        if !habit.is_active {
            return Err(Error::InvalidInput(format!(
                "habit {} is inactive",
                habit.name
            )));
        }

        let mut event = CompletionEvent::for_habit(&habit, completed_at, notes);

        let conn = self.conn();
        conn.execute(
            r#"
            INSERT INTO completions (user_id, habit_id, completed_at, points_awarded, notes)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                event.user_id,
                event.habit_id,
                ts(event.completed_at),
                event.points_awarded,
                event.notes,
            ],
        )?;
        event.id = conn.last_insert_rowid();

        tracing::info!(
            habit_id = %event.habit_id,
            user_id = %event.user_id,
            points = event.points_awarded,
            "Recorded completion"
        );
        Ok(event)
    }

    /// List a user's completions ordered by time, optionally within `[start, end)`.
    pub fn list_completions(
        &self,
        user_id: &str,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<Vec<CompletionEvent>> {
        let conn = self.conn();

        let events = match range {
            Some((start, end)) => {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT * FROM completions
                    WHERE user_id = ?1 AND completed_at >= ?2 AND completed_at < ?3
                    ORDER BY completed_at, id
                    "#,
                )?;
                let rows = stmt
                    .query_map(params![user_id, ts(start), ts(end)], Self::row_to_completion)?
                    .collect::<std::result::Result<Vec<_>, _>>();
                rows
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT * FROM completions WHERE user_id = ? ORDER BY completed_at, id",
                )?;
                let rows = stmt
                    .query_map([user_id], Self::row_to_completion)?
                    .collect::<std::result::Result<Vec<_>, _>>();
                rows
            }
        }
        .map_err(row_error)?;

        Ok(events)
    }

    /// Count a user's completions at or after `since`
    pub fn count_completions_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<i64> {
        let conn = self.conn();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM completions WHERE user_id = ?1 AND completed_at >= ?2",
            params![user_id, ts(since)],
            |r| r.get(0),
        )?;
        Ok(count)
    }

    fn row_to_completion(row: &Row) -> rusqlite::Result<CompletionEvent> {
        Ok(CompletionEvent {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            habit_id: row.get("habit_id")?,
            completed_at: parse_ts(row, "completed_at")?,
            points_awarded: row.get("points_awarded")?,
            notes: row.get("notes")?,
        })
    }

    // ============================================
    // Goal operations
    // ============================================

    /// Insert a new goal
    pub fn insert_goal(&self, goal: &Goal) -> Result<()> {
        if goal.title.trim().is_empty() {
            return Err(Error::InvalidInput("goal title must not be empty".into()));
        }
        self.require_user(&goal.user_id)?;

        let conn = self.conn();
        conn.execute(
            r#"
            INSERT INTO goals (id, user_id, title, description, target_date, created_at, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                goal.id,
                goal.user_id,
                goal.title,
                goal.description,
                goal.target_date.map(|d| d.format("%Y-%m-%d").to_string()),
                ts(goal.created_at),
                goal.completed_at.map(ts),
            ],
        )?;
        tracing::info!(goal_id = %goal.id, user_id = %goal.user_id, "Created goal");
        Ok(())
    }

    /// Get a goal by ID
    pub fn get_goal(&self, id: &str) -> Result<Option<Goal>> {
        let conn = self.conn();
        conn.query_row("SELECT * FROM goals WHERE id = ?", [id], Self::row_to_goal)
            .optional()
            .map_err(row_error)
    }

    /// List a user's goals, oldest first
    pub fn list_goals(&self, user_id: &str) -> Result<Vec<Goal>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT * FROM goals WHERE user_id = ? ORDER BY created_at, title")?;
        let goals = stmt
            .query_map([user_id], Self::row_to_goal)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(row_error)?;
        Ok(goals)
    }

    /// Mark a goal completed. A goal can only be completed once.
    ///
    /// The guarded UPDATE decides the outcome, so of two concurrent calls
    /// only one succeeds.
    pub fn complete_goal(&self, id: &str, completed_at: DateTime<Utc>) -> Result<Goal> {
        let changed = self.conn().execute(
            "UPDATE goals SET completed_at = ?1 WHERE id = ?2 AND completed_at IS NULL",
            params![ts(completed_at), id],
        )?;

        let goal = self
            .get_goal(id)?
            .ok_or_else(|| Error::GoalNotFound(id.to_string()))?;
        if changed == 0 {
            return Err(Error::GoalAlreadyCompleted(id.to_string()));
        }

        tracing::info!(goal_id = %id, "Completed goal");
        Ok(goal)
    }

    /// Number of completed goals for a user
    pub fn count_completed_goals(&self, user_id: &str) -> Result<i64> {
        let conn = self.conn();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM goals WHERE user_id = ? AND completed_at IS NOT NULL",
            [user_id],
            |r| r.get(0),
        )?;
        Ok(count)
    }

    fn row_to_goal(row: &Row) -> rusqlite::Result<Goal> {
        let target_date_str: Option<String> = row.get("target_date")?;
        let target_date = match target_date_str {
            Some(s) => Some(NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| {
                conversion_failure(row, "target_date", format!("bad date {:?}: {}", s, e))
            })?),
            None => None,
        };

        Ok(Goal {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            target_date,
            created_at: parse_ts(row, "created_at")?,
            completed_at: parse_ts_opt(row, "completed_at")?,
        })
    }

    // ============================================
    // Badge operations
    // ============================================

    /// Award a badge. Returns `false` if the user already had it.
    pub fn award_badge(&self, user_id: &str, badge: &str, awarded_at: DateTime<Utc>) -> Result<bool> {
        let conn = self.conn();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO badge_awards (user_id, badge, awarded_at) VALUES (?1, ?2, ?3)",
            params![user_id, badge, ts(awarded_at)],
        )?;
        if inserted > 0 {
            tracing::info!(user_id, badge, "Awarded badge");
        }
        Ok(inserted > 0)
    }

    /// Badges a user has earned, in award order
    pub fn list_badges(&self, user_id: &str) -> Result<Vec<BadgeAward>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT * FROM badge_awards WHERE user_id = ? ORDER BY awarded_at, badge",
        )?;
        let badges = stmt
            .query_map([user_id], |row| {
                Ok(BadgeAward {
                    user_id: row.get("user_id")?,
                    badge: row.get("badge")?,
                    awarded_at: parse_ts(row, "awarded_at")?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(row_error)?;
        Ok(badges)
    }

    // ============================================
    // Snapshots
    // ============================================

    /// Fetch everything the stats engine needs for one user.
    ///
    /// Each piece is a separate query; no transaction spans them.
    pub fn load_snapshot(&self, user_id: &str) -> Result<StatsSnapshot> {
        let user = self.require_user(user_id)?;
        let habits = self.list_habits(user_id, &HabitFilter::default())?;
        let completions = self.list_completions(user_id, None)?;
        let goals_completed = self.count_completed_goals(user_id)?;
        let badges_earned = self.list_badges(user_id)?.len() as i64;

        tracing::debug!(
            user_id,
            habits = habits.len(),
            completions = completions.len(),
            "Loaded stats snapshot"
        );

        Ok(StatsSnapshot {
            user,
            habits,
            completions,
            goals_completed,
            badges_earned,
        })
    }
}
