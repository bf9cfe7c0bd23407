//! Completion rate over a rolling window.

use chrono::{Duration, NaiveDate};

/// Percentage of expected completions actually done.
///
/// Every active habit is expected once per day for the whole window, so the
/// denominator is `active_habits * window_days`. A zero denominator gives 0.
/// The result is clamped to `[0, 100]`.
pub fn completion_rate(completed: u64, active_habits: u32, window_days: u32) -> u8 {
    let possible = u64::from(active_habits) * u64::from(window_days);
    percentage(completed, possible)
}

/// `round(part / whole * 100)` clamped to `[0, 100]`, 0 when `whole` is 0.
pub fn percentage(part: u64, whole: u64) -> u8 {
    if whole == 0 {
        return 0;
    }
    let pct = (part as f64 / whole as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

/// First day of a `window_days`-long window ending with `today`.
///
/// Returns `None` for an empty window.
pub fn window_start(today: NaiveDate, window_days: u32) -> Option<NaiveDate> {
    if window_days == 0 {
        return None;
    }
    today.checked_sub_signed(Duration::days(i64::from(window_days) - 1))
}
