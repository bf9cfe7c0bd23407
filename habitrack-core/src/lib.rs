//! # habitrack-core
//!
//! Core library for habitrack - a personal habit and goal tracker.
//!
//! This library provides:
//! - Domain types for users, habits, completions, goals and badges
//! - Database storage layer with SQLite
//! - The stats engine: streaks, completion rates, levels, trends
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Data flows through two layers:
//! - **Stored:** SQLite tables; completions are an append-only ledger
//! - **Derived:** Stats computed per request from a [`StatsSnapshot`], never persisted
//!
//! ## Example
//!
//! ```rust,no_run
//! use habitrack_core::{analytics, Config, Database};
//!
//! let config = Config::load().expect("failed to load config");
//! let db = Database::open(&Config::database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//!
//! let offset = config.analytics.offset().expect("bad offset");
//! let snapshot = db.load_snapshot("user-id").expect("failed to load snapshot");
//! let today = chrono::Utc::now().with_timezone(&offset).date_naive();
//! let stats = analytics::compute_user_stats(&snapshot, today, offset, config.analytics.window_days);
//! println!("streak: {}", stats.current_streak);
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use db::{Database, HabitFilter};
pub use error::{Error, Result};
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod logging;
pub mod types;
