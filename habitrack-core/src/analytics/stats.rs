//! User-facing stats assembled from a [`StatsSnapshot`].

use std::collections::HashSet;

use chrono::{Duration, FixedOffset, NaiveDate};
use serde::Serialize;

use super::badges::BadgeFacts;
use super::completion::{completion_rate, window_start};
use super::level::LevelInfo;
use super::streak::{day_key, streak_stats};
use crate::types::{CompletionEvent, StatsSnapshot};

/// Profile/dashboard stats for one user.
#[derive(Debug, Clone, Serialize)]
pub struct UserStats {
    pub total_points: i64,
    pub level: u32,
    pub level_progress: u8,
    pub tier: &'static str,
    pub tier_progress: u8,
    pub current_streak: u32,
    pub longest_streak: u32,
    /// Percentage over the configured window
    pub completion_rate: u8,
    /// Distinct active habits completed today
    pub today_completed: u32,
    /// Active habits
    pub today_total: u32,
    /// Total completion events
    pub habits_completed: u64,
    pub goals_completed: i64,
    pub badges_earned: i64,
    pub joined_date: NaiveDate,
}

impl UserStats {
    /// Facts used to decide which badges this user qualifies for.
    pub fn badge_facts(&self) -> BadgeFacts {
        BadgeFacts {
            total_completions: self.habits_completed,
            longest_streak: self.longest_streak,
            tier_rank: super::level::tier_for_points(self.total_points).rank,
            goals_completed: self.goals_completed.max(0) as u64,
        }
    }
}

/// Completions whose local day falls in `start..=end`.
fn count_between(
    events: &[CompletionEvent],
    start: NaiveDate,
    end: NaiveDate,
    offset: FixedOffset,
) -> u64 {
    events
        .iter()
        .map(|e| day_key(e.completed_at, offset))
        .filter(|d| *d >= start && *d <= end)
        .count() as u64
}

/// Derive [`UserStats`] from a snapshot.
pub fn compute_user_stats(
    snapshot: &StatsSnapshot,
    today: NaiveDate,
    offset: FixedOffset,
    window_days: u32,
) -> UserStats {
    let events = &snapshot.completions;
    let active_habits = snapshot.active_habit_count();

    let streaks = streak_stats(events, today, offset);
    let level = LevelInfo::from_points(super::level::total_points(events));

    let completed_in_window = window_start(today, window_days)
        .map(|start| count_between(events, start, today, offset))
        .unwrap_or(0);

    let active_ids: HashSet<&str> = snapshot.active_habits().map(|h| h.id.as_str()).collect();
    let today_completed = events
        .iter()
        .filter(|e| day_key(e.completed_at, offset) == today)
        .filter(|e| active_ids.contains(e.habit_id.as_str()))
        .map(|e| e.habit_id.as_str())
        .collect::<HashSet<_>>()
        .len() as u32;

    let stats = UserStats {
        total_points: level.total_points,
        level: level.level,
        level_progress: level.level_progress,
        tier: level.tier.name,
        tier_progress: level.tier_progress,
        current_streak: streaks.current,
        longest_streak: streaks.longest.days,
        completion_rate: completion_rate(completed_in_window, active_habits, window_days),
        today_completed,
        today_total: active_habits,
        habits_completed: events.len() as u64,
        goals_completed: snapshot.goals_completed,
        badges_earned: snapshot.badges_earned,
        joined_date: day_key(snapshot.user.joined_at, offset),
    };

    tracing::debug!(
        user_id = %snapshot.user.id,
        events = events.len(),
        active_habits,
        current_streak = stats.current_streak,
        completion_rate = stats.completion_rate,
        "Computed user stats"
    );

    stats
}

/// A headline number with its change against the previous period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyMetric {
    pub label: &'static str,
    pub value: i64,
    pub previous: i64,
    pub delta_pct: f64,
}

impl KeyMetric {
    fn new(label: &'static str, value: i64, previous: i64) -> Self {
        Self {
            label,
            value,
            previous,
            delta_pct: calc_delta(value, previous),
        }
    }

    /// Format delta for display (e.g., "+23%" or "-15%").
    pub fn delta_display(&self) -> String {
        if self.delta_pct >= 0.0 {
            format!("+{:.0}%", self.delta_pct)
        } else {
            format!("{:.0}%", self.delta_pct)
        }
    }
}

/// Percentage change from `previous` to `current`.
pub fn calc_delta(current: i64, previous: i64) -> f64 {
    if previous == 0 {
        if current == 0 {
            0.0
        } else {
            100.0 // Growth from nothing shown as 100%
        }
    } else {
        ((current - previous) as f64 / previous as f64) * 100.0
    }
}

/// This week against last week: completions, completion rate, points and
/// active days. Weeks are the 7 days ending today and the 7 before those.
pub fn key_metrics(snapshot: &StatsSnapshot, today: NaiveDate, offset: FixedOffset) -> Vec<KeyMetric> {
    let this_start = today - Duration::days(6);
    let last_end = this_start - Duration::days(1);
    let last_start = last_end - Duration::days(6);
    let active = snapshot.active_habit_count();

    let week = |start: NaiveDate, end: NaiveDate| {
        let events: Vec<&CompletionEvent> = snapshot
            .completions
            .iter()
            .filter(|e| {
                let d = day_key(e.completed_at, offset);
                d >= start && d <= end
            })
            .collect();
        let count = events.len() as u64;
        let points = super::level::total_points(events.iter().copied());
        let days = super::streak::distinct_days(events.iter().copied(), offset).len() as i64;
        (count, points, days)
    };

    let (count_now, points_now, days_now) = week(this_start, today);
    let (count_prev, points_prev, days_prev) = week(last_start, last_end);

    vec![
        KeyMetric::new("Completions", count_now as i64, count_prev as i64),
        KeyMetric::new(
            "Completion rate",
            i64::from(completion_rate(count_now, active, 7)),
            i64::from(completion_rate(count_prev, active, 7)),
        ),
        KeyMetric::new("Points earned", points_now, points_prev),
        KeyMetric::new("Active days", days_now, days_prev),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Frequency, Habit, User};
    use chrono::{TimeZone, Utc};

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 20).unwrap()
    }

    fn at(days_ago: i64, hour: u32) -> chrono::DateTime<Utc> {
        let d = today() - Duration::days(days_ago);
        Utc.from_utc_datetime(&d.and_hms_opt(hour, 0, 0).unwrap())
    }

    fn snapshot(habits: Vec<Habit>, completions: Vec<CompletionEvent>) -> StatsSnapshot {
        StatsSnapshot {
            user: User {
                id: "u1".into(),
                name: "Ada".into(),
                joined_at: at(60, 9),
            },
            habits,
            completions,
            goals_completed: 1,
            badges_earned: 2,
        }
    }

    #[test]
    fn test_empty_snapshot() {
        let stats = compute_user_stats(&snapshot(vec![], vec![]), today(), utc(), 30);
        assert_eq!(stats.current_streak, 0);
        assert_eq!(stats.completion_rate, 0);
        assert_eq!(stats.total_points, 0);
        assert_eq!(stats.level, 1);
        assert_eq!(stats.tier, "Beginner");
        assert_eq!(stats.today_total, 0);
        assert_eq!(stats.joined_date, today() - Duration::days(60));
    }

    #[test]
    fn test_user_stats() {
        let run = Habit::new("u1", "Run", "health", 50, Frequency::Daily);
        let read = Habit::new("u1", "Read", "learning", 25, Frequency::Daily);
        let mut paused = Habit::new("u1", "Swim", "health", 100, Frequency::Weekly);
        paused.is_active = false;

        let completions = vec![
            CompletionEvent::for_habit(&run, at(0, 7), None),
            CompletionEvent::for_habit(&run, at(0, 19), None),
            CompletionEvent::for_habit(&read, at(1, 21), None),
            CompletionEvent::for_habit(&paused, at(0, 8), None),
            // outside the 30-day window
            CompletionEvent::for_habit(&read, at(40, 8), None),
        ];
        let snap = snapshot(vec![run, read, paused], completions);
        let stats = compute_user_stats(&snap, today(), utc(), 30);

        assert_eq!(stats.total_points, 50 + 50 + 25 + 100 + 25);
        assert_eq!(stats.level, 3);
        assert_eq!(stats.current_streak, 2);
        assert_eq!(stats.longest_streak, 2);
        // 4 completions in window / (2 active habits * 30 days)
        assert_eq!(stats.completion_rate, 7);
        assert_eq!(stats.today_completed, 1);
        assert_eq!(stats.today_total, 2);
        assert_eq!(stats.habits_completed, 5);
        assert_eq!(stats.goals_completed, 1);
        assert_eq!(stats.badges_earned, 2);

        let facts = stats.badge_facts();
        assert_eq!(facts.total_completions, 5);
        assert_eq!(facts.tier_rank, 2);
    }

    #[test]
    fn test_calc_delta() {
        assert_eq!(calc_delta(123, 100), 23.0);
        assert_eq!(calc_delta(80, 100), -20.0);
        assert_eq!(calc_delta(100, 0), 100.0);
        assert_eq!(calc_delta(0, 0), 0.0);
    }

    #[test]
    fn test_key_metrics_week_over_week() {
        let habit = Habit::new("u1", "Run", "health", 10, Frequency::Daily);
        let completions = vec![
            CompletionEvent::for_habit(&habit, at(0, 8), None),
            CompletionEvent::for_habit(&habit, at(1, 8), None),
            CompletionEvent::for_habit(&habit, at(2, 8), None),
            CompletionEvent::for_habit(&habit, at(8, 8), None),
            CompletionEvent::for_habit(&habit, at(9, 8), None),
        ];
        let metrics = key_metrics(&snapshot(vec![habit], completions), today(), utc());

        assert_eq!(metrics[0].label, "Completions");
        assert_eq!(metrics[0].value, 3);
        assert_eq!(metrics[0].previous, 2);
        assert_eq!(metrics[0].delta_display(), "+50%");
        // 3/7 -> 43, 2/7 -> 29
        assert_eq!(metrics[1].value, 43);
        assert_eq!(metrics[1].previous, 29);
        assert_eq!(metrics[2].value, 30);
        assert_eq!(metrics[3].value, 3);
    }
}
