//! Error types for habitrack-core

use thiserror::Error;

/// Main error type for the habitrack-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Caller supplied arguments that cannot be computed on
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Persisted data is malformed (bad timestamp, unknown enum value)
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// User not found
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// Habit not found
    #[error("habit not found: {0}")]
    HabitNotFound(String),

    /// Goal not found
    #[error("goal not found: {0}")]
    GoalNotFound(String),

    /// Goal was already marked completed
    #[error("goal already completed: {0}")]
    GoalAlreadyCompleted(String),
}

/// Result type alias for habitrack-core
pub type Result<T> = std::result::Result<T, Error>;
