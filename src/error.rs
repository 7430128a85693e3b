//! Error types for the poker ledger.

use crate::model::{GameId, UserId};
use thiserror::Error;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors that can occur while reading, writing or settling games.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Failed to open, read or write a data file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading or writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON report serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed row in one of the data tables
    #[error("Invalid record in {file} at row {row}: {message}")]
    InvalidRecord {
        file: String,
        row: usize,
        message: String,
    },

    /// Referenced game does not exist
    #[error("Game {0} not found")]
    GameNotFound(GameId),

    /// Referenced username does not exist
    #[error("User '{0}' not found")]
    UserNotFound(String),

    /// Referenced user id does not exist
    #[error("User id {0} not found")]
    UserIdNotFound(UserId),

    /// Game parameters violate an invariant
    #[error("Invalid game: {0}")]
    InvalidGame(String),

    /// Empty name or other rejected field value
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Rebuys must purchase at least one unit and no more than `i32::MAX`
    #[error("Invalid rebuy count {0}: must be between 1 and 2147483647")]
    InvalidRebuyCount(u32),
}
