use std::sync::PoisonError;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("key not found: {key}")]
    NotFound { key: String },
    #[error("key already exists: {key}")]
    AlreadyExists { key: String },
    #[error("conflict on {key}: expected revision {expected}, current revision {actual}")]
    Conflict {
        key: String,
        expected: u64,
        actual: u64,
    },
    #[error("precondition failed on {key}: {reason}")]
    PreconditionFailed { key: String, reason: String },
    #[error("invalid object at {key}: {reason}")]
    InvalidObject { key: String, reason: String },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("lock poison error")]
    LockPoisoned,
    #[error("storage has been destroyed")]
    Destroyed,
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}

impl<T> From<PoisonError<T>> for StorageError {
    fn from(_error: PoisonError<T>) -> Self {
        Self::LockPoisoned
    }
}
