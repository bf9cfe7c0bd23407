//! Badge catalog.
//!
//! Each badge is a predicate over a few lifetime facts. Badges are only ever
//! added; once awarded they stay even if the facts later change (e.g. a habit
//! with completions is deleted).

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Serialize;

/// Lifetime facts badges are judged on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BadgeFacts {
    pub total_completions: u64,
    pub longest_streak: u32,
    pub tier_rank: u32,
    pub goals_completed: u64,
}

/// A catalog entry.
#[derive(Clone, Copy, Serialize)]
pub struct Badge {
    /// Stable key persisted with awards
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    #[serde(skip)]
    earned: fn(&BadgeFacts) -> bool,
}

impl std::fmt::Debug for Badge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Badge").field("key", &self.key).finish()
    }
}

impl Badge {
    pub fn is_earned(&self, facts: &BadgeFacts) -> bool {
        (self.earned)(facts)
    }
}

pub const CATALOG: &[Badge] = &[
    Badge {
        key: "first_step",
        name: "First Step",
        description: "Complete a habit for the first time",
        earned: |f| f.total_completions >= 1,
    },
    Badge {
        key: "streak_3",
        name: "Warming Up",
        description: "Keep a 3-day streak",
        earned: |f| f.longest_streak >= 3,
    },
    Badge {
        key: "streak_7",
        name: "Week Warrior",
        description: "Keep a 7-day streak",
        earned: |f| f.longest_streak >= 7,
    },
    Badge {
        key: "streak_30",
        name: "Unstoppable",
        description: "Keep a 30-day streak",
        earned: |f| f.longest_streak >= 30,
    },
    Badge {
        key: "century",
        name: "Century",
        description: "Log 100 completions",
        earned: |f| f.total_completions >= 100,
    },
    Badge {
        key: "expert_tier",
        name: "Expert",
        description: "Reach the Expert tier",
        earned: |f| f.tier_rank >= 5,
    },
    Badge {
        key: "goal_getter",
        name: "Goal Getter",
        description: "Complete a goal",
        earned: |f| f.goals_completed >= 1,
    },
];

/// Look up a badge by key.
pub fn badge(key: &str) -> Option<&'static Badge> {
    CATALOG.iter().find(|b| b.key == key)
}

/// Every catalog badge the facts qualify for, in catalog order.
pub fn evaluate_badges(facts: &BadgeFacts) -> Vec<&'static Badge> {
    CATALOG.iter().filter(|b| b.is_earned(facts)).collect()
}

/// Recompute a user's stats and persist any badges they newly qualify for.
///
/// Returns the badges awarded by this call.
pub fn sync_badges(
    db: &crate::Database,
    user_id: &str,
    today: NaiveDate,
    offset: FixedOffset,
    window_days: u32,
    now: DateTime<Utc>,
) -> crate::Result<Vec<&'static Badge>> {
    let snapshot = db.load_snapshot(user_id)?;
    let stats = super::compute_user_stats(&snapshot, today, offset, window_days);

    let mut awarded = Vec::new();
    for badge in evaluate_badges(&stats.badge_facts()) {
        if db.award_badge(user_id, badge.key, now)? {
            awarded.push(badge);
        }
    }
    Ok(awarded)
}
