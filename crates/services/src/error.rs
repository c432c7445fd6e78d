//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::RingError;
use exam_core::model::{AnswerError, SnapshotError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by exam sessions and the exam workflow.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for exam")]
    Empty,
    #[error("no active exam for this learner and token")]
    NotFound,
    #[error("option {0} does not exist for the current question")]
    UnknownOption(char),
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

// A ring only fails to build from an empty question list.
impl From<RingError> for SessionError {
    fn from(_: RingError) -> Self {
        SessionError::Empty
    }
}

/// Errors emitted while loading or saving question banks.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BankError {
    #[error("failed to read or write question bank: {0}")]
    Io(#[from] std::io::Error),
    #[error("question bank is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors emitted while bootstrapping storage for the app.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
