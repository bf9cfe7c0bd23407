//! Daily trend and category breakdowns for charts.

use std::collections::{BTreeMap, HashMap};

use chrono::{FixedOffset, NaiveDate};
use serde::Serialize;

use super::completion::percentage;
use super::streak::day_key;
use crate::error::{Error, Result};
use crate::types::{CompletionEvent, Habit};

/// Category used for completions whose habit is unknown.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Chart palette for categories.
pub const CATEGORY_PALETTE: [&str; 8] = [
    "#3b82f6", "#10b981", "#f59e0b", "#ef4444", "#8b5cf6", "#ec4899", "#14b8a6", "#f97316",
];

/// Completions for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayBucket {
    pub date: NaiveDate,
    pub completed: u32,
    pub total: u32,
    pub rate: u8,
}

/// One bucket per day in `start..=end`.
///
/// `total` is the current active-habit count for every day; habits created or
/// deactivated mid-range are not tracked historically.
pub fn daily_trend(
    events: &[CompletionEvent],
    start: NaiveDate,
    end: NaiveDate,
    active_habits: u32,
    offset: FixedOffset,
) -> Result<Vec<DayBucket>> {
    if start > end {
        return Err(Error::InvalidInput(format!(
            "trend range starts after it ends: {} > {}",
            start, end
        )));
    }

    let mut counts: HashMap<NaiveDate, u32> = HashMap::new();
    for event in events {
        let day = day_key(event.completed_at, offset);
        if day >= start && day <= end {
            *counts.entry(day).or_default() += 1;
        }
    }

    let buckets = start
        .iter_days()
        .take_while(|d| *d <= end)
        .map(|date| {
            let completed = counts.get(&date).copied().unwrap_or(0);
            DayBucket {
                date,
                completed,
                total: active_habits,
                rate: percentage(u64::from(completed), u64::from(active_habits)),
            }
        })
        .collect();

    Ok(buckets)
}

/// Completions grouped by habit category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryBucket {
    pub category: String,
    pub completed: u32,
    pub total: u32,
    pub rate: u8,
    pub color: &'static str,
}

/// Group `events` by the category of the habit they belong to.
///
/// `total` is the number of active habits in the category times `days`.
/// Sorted by completions descending, then by name.
pub fn category_breakdown(
    events: &[CompletionEvent],
    habits: &[Habit],
    days: u32,
) -> Vec<CategoryBucket> {
    let category_of: HashMap<&str, &str> = habits
        .iter()
        .map(|h| (h.id.as_str(), h.category.as_str()))
        .collect();

    let mut active: BTreeMap<&str, u32> = BTreeMap::new();
    for habit in habits.iter().filter(|h| h.is_active) {
        *active.entry(habit.category.as_str()).or_default() += 1;
    }

    let mut completed: BTreeMap<&str, u32> = BTreeMap::new();
    for event in events {
        let category = category_of
            .get(event.habit_id.as_str())
            .copied()
            .unwrap_or(UNCATEGORIZED);
        *completed.entry(category).or_default() += 1;
    }

    let mut names: Vec<&str> = active.keys().chain(completed.keys()).copied().collect();
    names.sort_unstable();
    names.dedup();

    let mut buckets: Vec<CategoryBucket> = names
        .into_iter()
        .map(|name| {
            let done = completed.get(name).copied().unwrap_or(0);
            let total = active.get(name).copied().unwrap_or(0).saturating_mul(days);
            CategoryBucket {
                category: name.to_string(),
                completed: done,
                total,
                rate: percentage(u64::from(done), u64::from(total)),
                color: category_color(name),
            }
        })
        .collect();

    buckets.sort_by(|a, b| {
        b.completed
            .cmp(&a.completed)
            .then_with(|| a.category.cmp(&b.category))
    });
    buckets
}

/// Palette color picked from the category's first character.
pub fn category_color(category: &str) -> &'static str {
    let idx = category
        .chars()
        .next()
        .map(|c| c as usize % CATEGORY_PALETTE.len())
        .unwrap_or(0);
    CATEGORY_PALETTE[idx]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Frequency;
    use chrono::{TimeZone, Utc};

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn event(habit: &Habit, d: u32) -> CompletionEvent {
        CompletionEvent::for_habit(habit, Utc.with_ymd_and_hms(2024, 5, d, 12, 0, 0).unwrap(), None)
    }

    #[test]
    fn test_daily_trend_buckets() {
        let habit = Habit::new("u", "Read", "learning", 10, Frequency::Daily);
        let events = vec![event(&habit, 2), event(&habit, 2), event(&habit, 4), event(&habit, 9)];

        let trend = daily_trend(&events, date(1), date(4), 4, utc()).unwrap();
        assert_eq!(trend.len(), 4);
        assert_eq!(trend[0].completed, 0);
        assert_eq!(trend[1].completed, 2);
        assert_eq!(trend[1].total, 4);
        assert_eq!(trend[1].rate, 50);
        assert_eq!(trend[3].rate, 25);
    }

    #[test]
    fn test_daily_trend_without_habits() {
        let habit = Habit::new("u", "Read", "learning", 10, Frequency::Daily);
        let events = vec![event(&habit, 1)];
        let trend = daily_trend(&events, date(1), date(1), 0, utc()).unwrap();
        assert_eq!(trend[0].completed, 1);
        assert_eq!(trend[0].rate, 0);
    }

    #[test]
    fn test_daily_trend_rejects_inverted_range() {
        let result = daily_trend(&[], date(5), date(1), 1, utc());
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_category_breakdown() {
        let run = Habit::new("u", "Run", "health", 10, Frequency::Daily);
        let stretch = Habit::new("u", "Stretch", "health", 5, Frequency::Daily);
        let read = Habit::new("u", "Read", "learning", 10, Frequency::Daily);
        let mut old = Habit::new("u", "Journal", "mind", 5, Frequency::Daily);
        old.is_active = false;
        let habits = vec![run.clone(), stretch.clone(), read.clone(), old.clone()];

        let events = vec![
            event(&run, 1),
            event(&stretch, 1),
            event(&read, 2),
            event(&old, 3),
        ];

        let buckets = category_breakdown(&events, &habits, 7);
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0].category, "health");
        assert_eq!(buckets[0].completed, 2);
        assert_eq!(buckets[0].total, 14);
        assert_eq!(buckets[0].rate, 14);
        // learning and mind tie on one completion; name order decides
        assert_eq!(buckets[1].category, "learning");
        assert_eq!(buckets[2].category, "mind");
        assert_eq!(buckets[2].total, 0);
        assert_eq!(buckets[2].rate, 0);
    }

    #[test]
    fn test_unknown_habit_is_uncategorized() {
        let ghost = Habit::new("u", "Deleted", "gone", 10, Frequency::Daily);
        let buckets = category_breakdown(&[event(&ghost, 1)], &[], 7);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].category, UNCATEGORIZED);
    }

    #[test]
    fn test_category_color_is_deterministic() {
        assert_eq!(category_color("health"), category_color("hobbies"));
        assert_eq!(category_color(""), CATEGORY_PALETTE[0]);
        // 'a' is 97, 97 % 8 == 1
        assert_eq!(category_color("art"), CATEGORY_PALETTE[1]);
    }
}
