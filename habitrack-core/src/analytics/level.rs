//! Points, levels and tiers.
//!
//! Levels follow a flat curve: every 100 points is one level. Tiers are the
//! named ranks from a fixed threshold table. They are separate concepts and
//! are reported side by side.

use serde::Serialize;

use crate::types::CompletionEvent;

/// Points needed per level.
pub const POINTS_PER_LEVEL: i64 = 100;

/// Sum of the points actually awarded by each completion.
pub fn total_points<'a>(events: impl IntoIterator<Item = &'a CompletionEvent>) -> i64 {
    events
        .into_iter()
        .map(|e| e.points_awarded.max(0))
        .fold(0i64, i64::saturating_add)
}

/// `floor(points / 100) + 1`. Negative totals are treated as 0 and the
/// result saturates at `u32::MAX`.
pub fn level_for_points(points: i64) -> u32 {
    u32::try_from(points.max(0) / POINTS_PER_LEVEL)
        .unwrap_or(u32::MAX - 1)
        .saturating_add(1)
}

/// Percentage through the current level.
pub fn level_progress(points: i64) -> u8 {
    (points.max(0) % POINTS_PER_LEVEL) as u8
}

/// One row of the tier table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tier {
    pub rank: u32,
    pub name: &'static str,
    pub min_points: i64,
    pub max_points: i64,
}

/// Tier thresholds, ascending and non-overlapping.
pub const TIERS: &[Tier] = &[
    Tier { rank: 1, name: "Beginner", min_points: 0, max_points: 99 },
    Tier { rank: 2, name: "Novice", min_points: 100, max_points: 299 },
    Tier { rank: 3, name: "Apprentice", min_points: 300, max_points: 599 },
    Tier { rank: 4, name: "Adept", min_points: 600, max_points: 999 },
    Tier { rank: 5, name: "Expert", min_points: 1000, max_points: 1999 },
    Tier { rank: 6, name: "Master", min_points: 2000, max_points: 3999 },
    Tier { rank: 7, name: "Grandmaster", min_points: 4000, max_points: 9999 },
    Tier { rank: 8, name: "Legend", min_points: 10000, max_points: 99999 },
];

/// Last tier whose minimum is at or below `points`.
pub fn tier_for_points(points: i64) -> &'static Tier {
    let mut current = &TIERS[0];
    for tier in TIERS {
        if tier.min_points <= points {
            current = tier;
        }
    }
    current
}

/// The tier after `tier`, if any.
pub fn next_tier(tier: &Tier) -> Option<&'static Tier> {
    TIERS.iter().find(|t| t.rank == tier.rank + 1)
}

/// Percentage of the way from the current tier's minimum to the next one's.
/// 100 at the top tier.
pub fn tier_progress(points: i64) -> u8 {
    let current = tier_for_points(points);
    match next_tier(current) {
        Some(next) => {
            let span = (next.min_points - current.min_points) as f64;
            let done = (points.max(0) - current.min_points) as f64;
            (done / span * 100.0).clamp(0.0, 100.0) as u8
        }
        None => 100,
    }
}

/// Gamification summary for a point total.
#[derive(Debug, Clone, Serialize)]
pub struct LevelInfo {
    pub total_points: i64,
    pub level: u32,
    /// Percentage through the current level
    pub level_progress: u8,
    pub tier: Tier,
    /// Percentage toward the next tier
    pub tier_progress: u8,
    pub points_to_next_tier: Option<i64>,
}

impl LevelInfo {
    pub fn from_points(total_points: i64) -> Self {
        let tier = *tier_for_points(total_points);
        Self {
            total_points,
            level: level_for_points(total_points),
            level_progress: level_progress(total_points),
            tier,
            tier_progress: tier_progress(total_points),
            points_to_next_tier: next_tier(&tier).map(|t| t.min_points - total_points.max(0)),
        }
    }
}
