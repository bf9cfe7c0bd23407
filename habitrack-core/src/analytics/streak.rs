//! Streak calculation.
//!
//! A streak is a run of consecutive calendar days with at least one
//! completion. Days are taken in the user's timezone.
//!
//! The current streak is anchored on today, or on yesterday when nothing has
//! been completed yet today. A user who kept a 10-day run going and hasn't
//! checked in this morning still sees 10; missing a whole day resets it.

use std::collections::BTreeSet;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Serialize;

use crate::types::CompletionEvent;

/// Calendar date of a timestamp in the given timezone.
pub fn day_key(ts: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    ts.with_timezone(&offset).date_naive()
}

/// Distinct completion days, ascending.
pub fn distinct_days<'a>(
    events: impl IntoIterator<Item = &'a CompletionEvent>,
    offset: FixedOffset,
) -> BTreeSet<NaiveDate> {
    events
        .into_iter()
        .map(|e| day_key(e.completed_at, offset))
        .collect()
}

/// Length of the run ending today (or yesterday if today is empty).
///
/// Dates after `today` are ignored.
pub fn current_streak(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let anchor = if days.contains(&today) {
        today
    } else {
        match today.pred_opt() {
            Some(yesterday) if days.contains(&yesterday) => yesterday,
            _ => return 0,
        }
    };

    let mut streak = 0u32;
    let mut expected = anchor;
    for &day in days.range(..=anchor).rev() {
        if day != expected {
            break;
        }
        streak += 1;
        match expected.pred_opt() {
            Some(prev) => expected = prev,
            None => break,
        }
    }
    streak
}

/// A run of consecutive active days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StreakRun {
    /// Number of days in the run
    pub days: u32,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Longest run of consecutive days. Ties keep the earliest run.
pub fn longest_streak(days: &BTreeSet<NaiveDate>) -> StreakRun {
    let mut longest = StreakRun::default();
    let mut run_start: Option<NaiveDate> = None;
    let mut run_len = 0u32;
    let mut prev: Option<NaiveDate> = None;

    for &day in days {
        match prev {
            Some(p) if (day - p).num_days() == 1 => run_len += 1,
            _ => {
                run_len = 1;
                run_start = Some(day);
            }
        }
        if run_len > longest.days {
            longest = StreakRun {
                days: run_len,
                start: run_start,
                end: Some(day),
            };
        }
        prev = Some(day);
    }

    longest
}

/// Streak statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StreakStats {
    /// Current streak (consecutive days with activity)
    pub current: u32,
    /// Longest streak ever
    pub longest: StreakRun,
    /// Total days with at least one completion
    pub active_days: u32,
}

/// Compute current and longest streak for a set of completions.
pub fn streak_stats<'a>(
    events: impl IntoIterator<Item = &'a CompletionEvent>,
    today: NaiveDate,
    offset: FixedOffset,
) -> StreakStats {
    let days = distinct_days(events, offset);
    StreakStats {
        current: current_streak(&days, today),
        longest: longest_streak(&days),
        active_days: days.len() as u32,
    }
}
