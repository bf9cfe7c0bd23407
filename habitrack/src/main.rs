//! habitrack - habit and goal tracker CLI
//!
//! Records habit completions and reports streaks, points, levels and trends.

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use habitrack_core::analytics::{
    self, badges, category_breakdown, daily_trend, key_metrics, LevelInfo,
};
use habitrack_core::analytics::completion::window_start;
use habitrack_core::config::MAX_RANGE_DAYS;
use habitrack_core::format::{format_days, format_relative_time_opt, progress_bar};
use habitrack_core::{Config, Database, Frequency, Goal, Habit, HabitFilter, User};

#[derive(Parser, Debug)]
#[command(name = "habitrack")]
#[command(about = "Track habits and goals, earn points, keep streaks")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Manage habits
    Habit {
        #[command(subcommand)]
        action: HabitAction,
    },
    /// Mark a habit done
    Complete {
        /// User ID, ID prefix or name
        #[arg(short, long)]
        user: String,
        /// Habit ID, ID prefix or name
        habit: String,
        /// Optional note stored with the completion
        #[arg(long)]
        notes: Option<String>,
        /// Completion time (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<String>,
    },
    /// Manage goals
    Goal {
        #[command(subcommand)]
        action: GoalAction,
    },
    /// Show points, level, streaks and completion rate
    Stats {
        #[arg(short, long)]
        user: String,
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Show per-day completions for the last N days
    Trend {
        #[arg(short, long)]
        user: String,
        /// Number of days (default from config)
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=MAX_RANGE_DAYS as i64))]
        days: Option<u32>,
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Show completions grouped by habit category
    Categories {
        #[arg(short, long)]
        user: String,
        /// Number of days (default from config)
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=MAX_RANGE_DAYS as i64))]
        days: Option<u32>,
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[derive(Subcommand, Debug)]
enum UserAction {
    /// Create a user
    Add { name: String },
    /// List users
    List,
}

#[derive(Subcommand, Debug)]
enum HabitAction {
    /// Create a habit
    Add {
        #[arg(short, long)]
        user: String,
        name: String,
        #[arg(short, long, default_value = "general")]
        category: String,
        /// Points per completion
        #[arg(short, long, default_value_t = 10)]
        points: i64,
        #[arg(long, default_value = "daily")]
        frequency: String,
    },
    /// List habits
    List {
        #[arg(short, long)]
        user: String,
        /// Include inactive habits
        #[arg(long)]
        all: bool,
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Stop counting a habit toward completion rates
    Deactivate {
        #[arg(short, long)]
        user: String,
        habit: String,
    },
    /// Resume a deactivated habit
    Activate {
        #[arg(short, long)]
        user: String,
        habit: String,
    },
    /// Delete a habit and all of its completions
    Delete {
        #[arg(short, long)]
        user: String,
        habit: String,
    },
}

#[derive(Subcommand, Debug)]
enum GoalAction {
    /// Create a goal
    Add {
        #[arg(short, long)]
        user: String,
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// Target date (YYYY-MM-DD)
        #[arg(long)]
        target: Option<String>,
    },
    /// Mark a goal completed
    Complete {
        #[arg(short, long)]
        user: String,
        /// Goal ID, ID prefix or title
        goal: String,
    },
    /// List goals
    List {
        #[arg(short, long)]
        user: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// Shared state for a single invocation.
struct Ctx {
    db: Database,
    config: Config,
    offset: FixedOffset,
    now: DateTime<Utc>,
}

impl Ctx {
    fn today(&self) -> NaiveDate {
        self.now.with_timezone(&self.offset).date_naive()
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;
    let _log_guard = habitrack_core::logging::init(&config.logging).ok();

    let db_path = Config::database_path();
    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    let offset = config
        .analytics
        .offset()
        .context("invalid analytics configuration")?;

    let ctx = Ctx {
        db,
        config,
        offset,
        now: Utc::now(),
    };

    tracing::debug!(command = ?args.command, "Running command");

    match args.command {
        Command::User { action } => run_user(&ctx, action),
        Command::Habit { action } => run_habit(&ctx, action),
        Command::Complete {
            user,
            habit,
            notes,
            at,
        } => run_complete(&ctx, &user, &habit, notes, at.as_deref()),
        Command::Goal { action } => run_goal(&ctx, action),
        Command::Stats { user, format } => run_stats(&ctx, &user, format),
        Command::Trend { user, days, format } => run_trend(&ctx, &user, days, format),
        Command::Categories { user, days, format } => run_categories(&ctx, &user, days, format),
    }
}

// ============================================
// Lookups
// ============================================

/// Find a user by exact ID, name, or unique ID prefix.
fn resolve_user(db: &Database, query: &str) -> Result<User> {
    if let Some(user) = db.get_user(query)? {
        return Ok(user);
    }
    let users = db.list_users()?;
    let matches: Vec<User> = users
        .into_iter()
        .filter(|u| u.name.eq_ignore_ascii_case(query) || u.id.starts_with(query))
        .collect();
    pick_one(matches, "user", query)
}

/// Find one of a user's habits by exact ID, name, or unique ID prefix.
fn resolve_habit(db: &Database, user: &User, query: &str) -> Result<Habit> {
    let habits = db.list_habits(&user.id, &HabitFilter::default())?;
    if let Some(habit) = habits.iter().find(|h| h.id == query) {
        return Ok(habit.clone());
    }
    let matches: Vec<Habit> = habits
        .into_iter()
        .filter(|h| h.name.eq_ignore_ascii_case(query) || h.id.starts_with(query))
        .collect();
    pick_one(matches, "habit", query)
}

fn resolve_goal(db: &Database, user: &User, query: &str) -> Result<Goal> {
    let goals = db.list_goals(&user.id)?;
    if let Some(goal) = goals.iter().find(|g| g.id == query) {
        return Ok(goal.clone());
    }
    let matches: Vec<Goal> = goals
        .into_iter()
        .filter(|g| g.title.eq_ignore_ascii_case(query) || g.id.starts_with(query))
        .collect();
    pick_one(matches, "goal", query)
}

fn pick_one<T>(mut matches: Vec<T>, kind: &str, query: &str) -> Result<T> {
    match matches.len() {
        0 => anyhow::bail!("No {} found matching '{}'", kind, query),
        1 => Ok(matches.remove(0)),
        n => anyhow::bail!("'{}' matches {} {}s; be more specific", query, n, kind),
    }
}

fn short_id(id: &str) -> &str {
    &id[..id.len().min(8)]
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ============================================
// Commands
// ============================================

fn run_user(ctx: &Ctx, action: UserAction) -> Result<()> {
    match action {
        UserAction::Add { name } => {
            let user = User::new(name);
            ctx.db.insert_user(&user).context("failed to create user")?;
            println!("Created user {} ({})", user.name, user.id);
        }
        UserAction::List => {
            let users = ctx.db.list_users()?;
            if users.is_empty() {
                println!("No users yet. Create one with 'habitrack user add <name>'.");
            }
            for user in users {
                println!(
                    "{}  {:<20} joined {}",
                    short_id(&user.id),
                    user.name,
                    user.joined_at.with_timezone(&ctx.offset).format("%Y-%m-%d")
                );
            }
        }
    }
    Ok(())
}

fn run_habit(ctx: &Ctx, action: HabitAction) -> Result<()> {
    match action {
        HabitAction::Add {
            user,
            name,
            category,
            points,
            frequency,
        } => {
            let user = resolve_user(&ctx.db, &user)?;
            let frequency: Frequency = frequency.parse().map_err(anyhow::Error::msg)?;
            let habit = Habit::new(&user.id, name, category, points, frequency);
            ctx.db.insert_habit(&habit).context("failed to create habit")?;
            println!(
                "Created habit {} ({}, {} pts, {})",
                habit.name, habit.category, habit.points, habit.frequency
            );
        }
        HabitAction::List { user, all, format } => {
            let user = resolve_user(&ctx.db, &user)?;
            let filter = HabitFilter {
                active_only: !all,
                ..Default::default()
            };
            let habits = ctx.db.list_habits(&user.id, &filter)?;
            if format == Format::Json {
                return print_json(&habits);
            }
            if habits.is_empty() {
                println!("No habits found for {}.", user.name);
                return Ok(());
            }
            let completions = ctx.db.list_completions(&user.id, None)?;
            for habit in &habits {
                let last = completions
                    .iter()
                    .filter(|c| c.habit_id == habit.id)
                    .map(|c| c.completed_at)
                    .max();
                println!(
                    "{}  {:<20} {:<12} {:>4} pts  {:<8} last: {}{}",
                    short_id(&habit.id),
                    habit.name,
                    habit.category,
                    habit.points,
                    habit.frequency,
                    format_relative_time_opt(last, ctx.now),
                    if habit.is_active { "" } else { "  (inactive)" }
                );
            }
        }
        HabitAction::Deactivate { user, habit } => {
            let user = resolve_user(&ctx.db, &user)?;
            let habit = resolve_habit(&ctx.db, &user, &habit)?;
            ctx.db.set_habit_active(&habit.id, false)?;
            println!("Deactivated {}", habit.name);
        }
        HabitAction::Activate { user, habit } => {
            let user = resolve_user(&ctx.db, &user)?;
            let habit = resolve_habit(&ctx.db, &user, &habit)?;
            ctx.db.set_habit_active(&habit.id, true)?;
            println!("Activated {}", habit.name);
        }
        HabitAction::Delete { user, habit } => {
            let user = resolve_user(&ctx.db, &user)?;
            let habit = resolve_habit(&ctx.db, &user, &habit)?;
            ctx.db.delete_habit(&habit.id)?;
            println!("Deleted {} and its completions", habit.name);
        }
    }
    Ok(())
}

fn run_complete(
    ctx: &Ctx,
    user: &str,
    habit: &str,
    notes: Option<String>,
    at: Option<&str>,
) -> Result<()> {
    let user = resolve_user(&ctx.db, user)?;
    let habit = resolve_habit(&ctx.db, &user, habit)?;

    let completed_at = match at {
        Some(s) => DateTime::parse_from_rfc3339(s)
            .with_context(|| format!("invalid --at timestamp '{}'", s))?
            .with_timezone(&Utc),
        None => ctx.now,
    };

    let event = ctx
        .db
        .record_completion(&habit.id, completed_at, notes)
        .context("failed to record completion")?;
    println!("Completed {} (+{} pts)", habit.name, event.points_awarded);

    announce_badges(ctx, &user)
}

fn announce_badges(ctx: &Ctx, user: &User) -> Result<()> {
    let awarded = badges::sync_badges(
        &ctx.db,
        &user.id,
        ctx.today(),
        ctx.offset,
        ctx.config.analytics.window_days,
        ctx.now,
    )?;
    for badge in awarded {
        println!("Badge earned: {} - {}", badge.name, badge.description);
    }
    Ok(())
}

fn run_goal(ctx: &Ctx, action: GoalAction) -> Result<()> {
    match action {
        GoalAction::Add {
            user,
            title,
            description,
            target,
        } => {
            let user = resolve_user(&ctx.db, &user)?;
            let target_date = target
                .map(|s| {
                    NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                        .with_context(|| format!("invalid --target date '{}'", s))
                })
                .transpose()?;
            let goal = Goal {
                description,
                target_date,
                ..Goal::new(&user.id, title)
            };
            ctx.db.insert_goal(&goal).context("failed to create goal")?;
            println!("Created goal {}", goal.title);
        }
        GoalAction::Complete { user, goal } => {
            let user = resolve_user(&ctx.db, &user)?;
            let goal = resolve_goal(&ctx.db, &user, &goal)?;
            ctx.db.complete_goal(&goal.id, ctx.now)?;
            println!("Completed goal {}", goal.title);
            announce_badges(ctx, &user)?;
        }
        GoalAction::List { user } => {
            let user = resolve_user(&ctx.db, &user)?;
            for goal in ctx.db.list_goals(&user.id)? {
                let status = if goal.is_completed() { "done" } else { "open" };
                let target = goal
                    .target_date
                    .map(|d| format!(" (by {})", d))
                    .unwrap_or_default();
                println!("{}  [{}] {}{}", short_id(&goal.id), status, goal.title, target);
            }
        }
    }
    Ok(())
}

fn run_stats(ctx: &Ctx, user: &str, format: Format) -> Result<()> {
    let user = resolve_user(&ctx.db, user)?;
    let snapshot = ctx.db.load_snapshot(&user.id)?;
    let today = ctx.today();
    let window = ctx.config.analytics.window_days;

    let stats = analytics::compute_user_stats(&snapshot, today, ctx.offset, window);
    let metrics = key_metrics(&snapshot, today, ctx.offset);
    let level = LevelInfo::from_points(stats.total_points);
    let earned = ctx.db.list_badges(&user.id)?;

    if format == Format::Json {
        return print_json(&serde_json::json!({
            "user": snapshot.user,
            "stats": stats,
            "level": level,
            "key_metrics": metrics,
            "badges": earned,
        }));
    }

    println!();
    println!("{} - member since {}", user.name, stats.joined_date);
    println!();
    println!(
        "   Points:   {:<10} Level {} {}",
        stats.total_points,
        stats.level,
        progress_bar(stats.level_progress, 20)
    );
    match level.points_to_next_tier {
        Some(remaining) => println!(
            "   Tier:     {:<10} {} ({} pts to next)",
            stats.tier,
            progress_bar(stats.tier_progress, 20),
            remaining
        ),
        None => println!("   Tier:     {:<10} (top tier)", stats.tier),
    }
    println!(
        "   Streak:   {:<10} Longest: {}",
        format_days(stats.current_streak),
        format_days(stats.longest_streak)
    );
    println!(
        "   Rate:     {:<10} over the last {}",
        format!("{}%", stats.completion_rate),
        format_days(window)
    );
    println!(
        "   Today:    {}/{} habits",
        stats.today_completed, stats.today_total
    );
    println!(
        "   Totals:   {} completions, {} goals, {} badges",
        stats.habits_completed, stats.goals_completed, stats.badges_earned
    );
    println!();
    println!("THIS WEEK");
    for metric in &metrics {
        println!(
            "   {:<16} {:>6}  {}",
            metric.label,
            metric.value,
            metric.delta_display()
        );
    }
    println!();
    Ok(())
}

fn range_start(today: NaiveDate, days: u32) -> Result<NaiveDate> {
    if days > MAX_RANGE_DAYS {
        anyhow::bail!("--days must be between 1 and {}", MAX_RANGE_DAYS);
    }
    window_start(today, days)
        .with_context(|| format!("--days must be between 1 and {}", MAX_RANGE_DAYS))
}

fn run_trend(ctx: &Ctx, user: &str, days: Option<u32>, format: Format) -> Result<()> {
    let user = resolve_user(&ctx.db, user)?;
    let days = days.unwrap_or(ctx.config.analytics.trend_days);
    let today = ctx.today();
    let start = range_start(today, days)?;

    let active = ctx
        .db
        .list_habits(
            &user.id,
            &HabitFilter {
                active_only: true,
                ..Default::default()
            },
        )?
        .len() as u32;
    let completions = ctx.db.list_completions(&user.id, None)?;
    let trend = daily_trend(&completions, start, today, active, ctx.offset)?;

    if format == Format::Json {
        return print_json(&trend);
    }
    for bucket in &trend {
        println!(
            "{}  {:>3}/{:<3} {:>3}% {}",
            bucket.date,
            bucket.completed,
            bucket.total,
            bucket.rate,
            progress_bar(bucket.rate, 20)
        );
    }
    Ok(())
}

fn run_categories(ctx: &Ctx, user: &str, days: Option<u32>, format: Format) -> Result<()> {
    let user = resolve_user(&ctx.db, user)?;
    let days = days.unwrap_or(ctx.config.analytics.window_days);
    let today = ctx.today();
    let start = range_start(today, days)?;

    let snapshot = ctx.db.load_snapshot(&user.id)?;
    let in_range: Vec<_> = snapshot
        .completions
        .iter()
        .filter(|c| {
            let d = analytics::streak::day_key(c.completed_at, ctx.offset);
            d >= start && d <= today
        })
        .cloned()
        .collect();
    let buckets = category_breakdown(&in_range, &snapshot.habits, days);

    if format == Format::Json {
        return print_json(&buckets);
    }
    if buckets.is_empty() {
        println!("No habits or completions yet.");
    }
    for bucket in &buckets {
        println!(
            "{:<16} {:>4}/{:<5} {:>3}% {}  {}",
            bucket.category,
            bucket.completed,
            bucket.total,
            bucket.rate,
            progress_bar(bucket.rate, 20),
            bucket.color
        );
    }
    Ok(())
}
