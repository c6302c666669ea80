// src/error.rs

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrainerError>;

/// Failures at the host boundary. The audiometric engine itself is total.
#[derive(Error, Debug)]
pub enum TrainerError {
    #[error("Unknown case: {0}")]
    UnknownCase(String),

    #[error("A case is already loading")]
    LoadInProgress,

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
