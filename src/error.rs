//! Error types for the stats store.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Backing store missing or unreadable.
    #[error("stats store {path} is unavailable: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Backing store readable but not parseable as records.
    #[error("stats store {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// (university, course) appears more than once.
    #[error("duplicate record for university {university:?}, course {course:?}")]
    DuplicateKey { university: String, course: String },

    /// Writing the updated record set failed; nothing was replaced.
    #[error("failed to persist stats store {path}: {reason}")]
    Persist { path: PathBuf, reason: String },
}

impl StoreError {
    /// True for errors that mean "no data" rather than a failed write.
    pub fn is_unavailable(&self) -> bool {
        !matches!(self, StoreError::Persist { .. })
    }
}
