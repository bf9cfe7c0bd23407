//! Integration tests for the storage layer and stats engine
//!
//! These tests write real completions to a SQLite file, reload them as a
//! snapshot and check the derived stats end to end.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use habitrack_core::analytics::{
    category_breakdown, compute_user_stats, daily_trend, evaluate_badges, key_metrics,
};
use habitrack_core::db::Database;
use habitrack_core::types::{Frequency, Goal, Habit, User};
use habitrack_core::Error;
use tempfile::TempDir;

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 11, 30).unwrap()
}

fn at(days_ago: i64, hour: u32) -> DateTime<Utc> {
    let day = today() - Duration::days(days_ago);
    Utc.from_utc_datetime(&day.and_hms_opt(hour, 0, 0).unwrap())
}

fn open_db(dir: &TempDir) -> Database {
    habitrack_core::logging::init_test();
    let db = Database::open(&dir.path().join("habitrack.db")).expect("open should succeed");
    db.migrate().expect("migrate should succeed");
    db
}

fn seed_user(db: &Database) -> User {
    let user = User {
        joined_at: at(90, 12),
        ..User::new("Grace")
    };
    db.insert_user(&user).unwrap();
    user
}

// ============================================
// Streaks and rates
// ============================================

#[test]
fn test_empty_ledger_stats() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    let user = seed_user(&db);

    let snapshot = db.load_snapshot(&user.id).unwrap();
    let stats = compute_user_stats(&snapshot, today(), utc(), 30);

    assert_eq!(stats.current_streak, 0);
    assert_eq!(stats.completion_rate, 0);
    assert_eq!(stats.level, 1);
    assert_eq!(stats.joined_date, today() - Duration::days(90));
}

#[test]
fn test_today_and_yesterday_streak() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    let user = seed_user(&db);
    let habit = Habit::new(&user.id, "Meditate", "mind", 10, Frequency::Daily);
    db.insert_habit(&habit).unwrap();

    db.record_completion(&habit.id, at(0, 7), None).unwrap();
    db.record_completion(&habit.id, at(1, 7), None).unwrap();

    let stats = compute_user_stats(&db.load_snapshot(&user.id).unwrap(), today(), utc(), 30);
    assert_eq!(stats.current_streak, 2);
    assert_eq!(stats.today_completed, 1);
    assert_eq!(stats.today_total, 1);
}

#[test]
fn test_gap_then_older_run() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    let user = seed_user(&db);
    let habit = Habit::new(&user.id, "Meditate", "mind", 10, Frequency::Daily);
    db.insert_habit(&habit).unwrap();

    for days_ago in [0, 3, 4, 5, 6, 7, 8] {
        db.record_completion(&habit.id, at(days_ago, 20), None).unwrap();
    }

    let stats = compute_user_stats(&db.load_snapshot(&user.id).unwrap(), today(), utc(), 30);
    assert_eq!(stats.current_streak, 1);
    assert_eq!(stats.longest_streak, 6);
}

#[test]
fn test_completion_rate_half() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    let user = seed_user(&db);

    let habits: Vec<Habit> = (0..5)
        .map(|i| Habit::new(&user.id, format!("Habit {}", i), "misc", 1, Frequency::Daily))
        .collect();
    for habit in &habits {
        db.insert_habit(habit).unwrap();
    }

    // 75 completions spread over the last 30 days
    for n in 0..75i64 {
        let habit = &habits[(n % 5) as usize];
        db.record_completion(&habit.id, at(n % 30, 9), None).unwrap();
    }

    let stats = compute_user_stats(&db.load_snapshot(&user.id).unwrap(), today(), utc(), 30);
    assert_eq!(stats.completion_rate, 50);
    assert_eq!(stats.total_points, 75);
}

#[test]
fn test_no_active_habits_means_zero_rate() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    let user = seed_user(&db);
    let habit = Habit::new(&user.id, "Run", "health", 10, Frequency::Daily);
    db.insert_habit(&habit).unwrap();
    db.record_completion(&habit.id, at(0, 9), None).unwrap();
    db.set_habit_active(&habit.id, false).unwrap();

    let stats = compute_user_stats(&db.load_snapshot(&user.id).unwrap(), today(), utc(), 30);
    assert_eq!(stats.completion_rate, 0);
    assert_eq!(stats.today_total, 0);
    // The streak still counts the completion
    assert_eq!(stats.current_streak, 1);
}

// ============================================
// Points and levels
// ============================================

#[test]
fn test_points_are_snapshotted_per_completion() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    let user = seed_user(&db);
    let habit = Habit::new(&user.id, "Run", "health", 100, Frequency::Daily);
    db.insert_habit(&habit).unwrap();
    db.record_completion(&habit.id, at(2, 9), None).unwrap();
    db.record_completion(&habit.id, at(1, 9), None).unwrap();

    let cheap = Habit::new(&user.id, "Stretch", "health", 50, Frequency::Daily);
    db.insert_habit(&cheap).unwrap();
    db.record_completion(&cheap.id, at(0, 9), None).unwrap();

    let stats = compute_user_stats(&db.load_snapshot(&user.id).unwrap(), today(), utc(), 30);
    assert_eq!(stats.total_points, 250);
    assert_eq!(stats.level, 3);
    assert_eq!(stats.tier, "Novice");
}

// ============================================
// Trends, categories, badges
// ============================================

#[test]
fn test_trend_and_categories_from_db() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    let user = seed_user(&db);
    let run = Habit::new(&user.id, "Run", "health", 10, Frequency::Daily);
    let read = Habit::new(&user.id, "Read", "learning", 10, Frequency::Daily);
    db.insert_habit(&run).unwrap();
    db.insert_habit(&read).unwrap();

    db.record_completion(&run.id, at(0, 6), None).unwrap();
    db.record_completion(&read.id, at(0, 21), None).unwrap();
    db.record_completion(&run.id, at(2, 6), None).unwrap();

    let snapshot = db.load_snapshot(&user.id).unwrap();
    let start = today() - Duration::days(6);
    let trend = daily_trend(&snapshot.completions, start, today(), 2, utc()).unwrap();
    assert_eq!(trend.len(), 7);
    assert_eq!(trend[6].completed, 2);
    assert_eq!(trend[6].rate, 100);
    assert_eq!(trend[4].completed, 1);
    assert_eq!(trend[4].rate, 50);
    assert_eq!(trend[5].rate, 0);

    let categories = category_breakdown(&snapshot.completions, &snapshot.habits, 7);
    assert_eq!(categories[0].category, "health");
    assert_eq!(categories[0].completed, 2);
    assert_eq!(categories[1].category, "learning");

    let metrics = key_metrics(&snapshot, today(), utc());
    assert_eq!(metrics[0].value, 3);
    assert_eq!(metrics[0].previous, 0);
}

#[test]
fn test_badges_and_goals() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    let user = seed_user(&db);
    let habit = Habit::new(&user.id, "Run", "health", 10, Frequency::Daily);
    db.insert_habit(&habit).unwrap();
    for days_ago in 0..3 {
        db.record_completion(&habit.id, at(days_ago, 9), None).unwrap();
    }
    let goal = Goal::new(&user.id, "Run every day for a month");
    db.insert_goal(&goal).unwrap();
    db.complete_goal(&goal.id, at(0, 10)).unwrap();

    let stats = compute_user_stats(&db.load_snapshot(&user.id).unwrap(), today(), utc(), 30);
    let earned: Vec<_> = evaluate_badges(&stats.badge_facts())
        .into_iter()
        .map(|b| b.key)
        .collect();
    assert_eq!(earned, vec!["first_step", "streak_3", "goal_getter"]);

    for key in &earned {
        db.award_badge(&user.id, key, at(0, 10)).unwrap();
    }
    let stats = compute_user_stats(&db.load_snapshot(&user.id).unwrap(), today(), utc(), 30);
    assert_eq!(stats.badges_earned, 3);
    assert_eq!(stats.goals_completed, 1);
}

#[test]
fn test_reopen_persists_ledger() {
    let dir = TempDir::new().unwrap();
    let user_id = {
        let db = open_db(&dir);
        let user = seed_user(&db);
        let habit = Habit::new(&user.id, "Run", "health", 10, Frequency::Daily);
        db.insert_habit(&habit).unwrap();
        db.record_completion(&habit.id, at(0, 9), Some("5km".into()))
            .unwrap();
        user.id
    };

    let db = open_db(&dir);
    let completions = db.list_completions(&user_id, None).unwrap();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].notes.as_deref(), Some("5km"));
}

#[test]
fn test_missing_user_is_reported() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    assert!(matches!(
        db.load_snapshot("ghost"),
        Err(Error::UserNotFound(id)) if id == "ghost"
    ));
}
