//! Error types for the license store.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite failure.
    #[error("storage error: {0}")]
    Database(String),

    /// No rights row exists for this license id.
    #[error("unknown license: {0}")]
    UnknownLicense(String),

    /// The shared connection lock was poisoned by a panicking thread.
    #[error("store lock poisoned")]
    LockPoisoned,
}

pub(crate) fn db(context: &str) -> impl FnOnce(rusqlite::Error) -> StoreError + '_ {
    move |e| StoreError::Database(format!("{context}: {e}"))
}
