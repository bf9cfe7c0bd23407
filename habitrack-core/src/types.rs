//! Core domain types for habitrack
//!
//! These types are the persisted data model. Everything the analytics module
//! derives from them (streaks, rates, levels) is computed on demand and never
//! stored.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **User** | The person who owns habits and goals |
//! | **Habit** | A recurring action worth a fixed number of points per completion |
//! | **Completion** | An immutable, timestamped record that a habit was done |
//! | **Goal** | A one-off objective that is completed at most once |
//! | **Badge** | A catalog achievement awarded once per user |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// User
// ============================================

/// A person tracking habits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// When the user was created
    pub joined_at: DateTime<Utc>,
}

impl User {
    /// Create a user with a fresh ID joined now.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            joined_at: Utc::now(),
        }
    }
}

// ============================================
// Habit
// ============================================

/// How often a habit is meant to be done.
///
/// Stored for display; the completion rate treats every active habit as
/// expected once per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            _ => Err(format!("unknown frequency: {}", s)),
        }
    }
}

/// Largest reward a single habit completion may carry.
pub const MAX_HABIT_POINTS: i64 = 10_000;

/// A recurring action owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    /// Unique identifier
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// Display name
    pub name: String,
    /// Free-form category used for grouping ("health", "learning", ...)
    pub category: String,
    /// Points awarded per completion
    pub points: i64,
    /// Inactive habits are excluded from rate denominators
    pub is_active: bool,
    /// Intended cadence
    pub frequency: Frequency,
    /// When the habit was created
    pub created_at: DateTime<Utc>,
}

impl Habit {
    /// Create an active habit with a fresh ID.
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        points: i64,
        frequency: Frequency,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            name: name.into(),
            category: category.into(),
            points,
            is_active: true,
            frequency,
            created_at: Utc::now(),
        }
    }
}

// ============================================
// Completion
// ============================================

/// One completion of a habit. Never updated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionEvent {
    /// Row ID (0 before insertion)
    pub id: i64,
    pub user_id: String,
    pub habit_id: String,
    pub completed_at: DateTime<Utc>,
    /// Habit points at the time of completion
    pub points_awarded: i64,
    pub notes: Option<String>,
}

impl CompletionEvent {
    /// Build a completion for `habit` at `completed_at`, snapshotting its points.
    pub fn for_habit(habit: &Habit, completed_at: DateTime<Utc>, notes: Option<String>) -> Self {
        Self {
            id: 0,
            user_id: habit.user_id.clone(),
            habit_id: habit.id.clone(),
            completed_at,
            points_awarded: habit.points,
            notes,
        }
    }
}

// ============================================
// Goal
// ============================================

/// A one-off objective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub target_date: Option<chrono::NaiveDate>,
    pub created_at: DateTime<Utc>,
    /// Set once when the goal is completed
    pub completed_at: Option<DateTime<Utc>>,
}

impl Goal {
    pub fn new(user_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            title: title.into(),
            description: None,
            target_date: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

// ============================================
// Badges
// ============================================

/// A badge a user has earned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeAward {
    pub user_id: String,
    /// Catalog key, see [`crate::analytics::badges::CATALOG`]
    pub badge: String,
    pub awarded_at: DateTime<Utc>,
}

/// Everything the engine needs for one user, fetched in one pass.
///
/// The queries behind it are independent, so counts may disagree slightly
/// under concurrent writes; derived rates are clamped.
#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    pub user: User,
    /// All habits, active or not
    pub habits: Vec<Habit>,
    /// All completion events for the user
    pub completions: Vec<CompletionEvent>,
    pub goals_completed: i64,
    pub badges_earned: i64,
}

impl StatsSnapshot {
    /// Habits that count toward rate denominators.
    pub fn active_habits(&self) -> impl Iterator<Item = &Habit> {
        self.habits.iter().filter(|h| h.is_active)
    }

    pub fn active_habit_count(&self) -> u32 {
        self.active_habits().count() as u32
    }
}
