//! Error types.
//!
//! Two failures are never surfaced as values: an unreadable persisted blob
//! degrades to an empty store, and a list click on an unknown id is dropped.

use std::path::PathBuf;

use thiserror::Error;

/// Errors the controller reports to its caller.
#[derive(Error, Debug)]
pub enum AppError {
    /// Geolocation failed; the session cannot start.
    #[error("Could not get your position: {0}")]
    PositionUnavailable(String),

    /// A form value was rejected; the form stays open.
    #[error(transparent)]
    ValidationFailed(#[from] ValidationError),

    /// The store could not be written.
    #[error("Could not save workouts: {0}")]
    Persist(#[from] PersistError),
}

/// A form value that did not pass the submission gate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} must be a number")]
    NotANumber { field: &'static str },

    #[error("{field} must be a positive number")]
    NotPositive { field: &'static str },

    #[error("{field} must be a whole number")]
    NotWhole { field: &'static str },
}

/// Key-value storage failures.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum PersistError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Failed to encode workouts: {0}")]
    Encode(#[from] serde_json::Error),
}
