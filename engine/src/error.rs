//! Engine-specific error types

use shared::{ApplicationStatus, EntryId, JobId, SharedError, UserId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Duplicate entry: user {user_id} already has an active entry for job {job_id}")]
    DuplicateEntry { user_id: UserId, job_id: JobId },

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidState {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },

    #[error("Entry not found: {0}")]
    EntryNotFound(EntryId),

    #[error("Profile not found for user: {0}")]
    ProfileNotFound(UserId),

    #[error("Configuration error: {field}")]
    ConfigurationError { field: String },

    #[error("Shared component error")]
    SharedError(#[from] SharedError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl EngineError {
    pub fn config(field: impl Into<String>) -> Self {
        Self::ConfigurationError { field: field.into() }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
