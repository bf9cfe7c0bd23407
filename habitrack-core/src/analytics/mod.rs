//! Analytics module for habitrack
//!
//! Derives gamification metrics from a user's completion ledger:
//! - Current and longest streaks
//! - Completion rate over a rolling window
//! - Points, levels and tiers
//! - Daily trends and category breakdowns
//! - Badges and week-over-week key metrics
//!
//! Every function here is a pure projection over data the caller already
//! fetched. "Today" and the timezone offset are always passed in.

pub mod badges;
pub mod completion;
pub mod level;
pub mod stats;
pub mod streak;
pub mod trends;

pub use badges::{evaluate_badges, sync_badges, Badge, BadgeFacts, CATALOG};
pub use completion::completion_rate;
pub use level::{level_for_points, tier_for_points, total_points, LevelInfo, Tier, TIERS};
pub use stats::{compute_user_stats, key_metrics, KeyMetric, UserStats};
pub use streak::{current_streak, longest_streak, streak_stats, StreakRun, StreakStats};
pub use trends::{category_breakdown, category_color, daily_trend, CategoryBucket, DayBucket};
