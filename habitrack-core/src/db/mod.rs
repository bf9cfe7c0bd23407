//! Database layer for habitrack
//!
//! This module provides the storage layer using SQLite with:
//! - Schema migrations
//! - Repository pattern for queries
//! - The append-only completion ledger

pub mod repo;
pub mod schema;

pub use repo::{Database, HabitFilter};
