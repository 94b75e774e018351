use std::time::Duration;

/// Errors from lock acquisition.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// The lock could not be acquired within the configured wait.
    #[error("failed to acquire lock on object {object_id} within {wait:?}")]
    Timeout { object_id: String, wait: Duration },

    /// The lock database failed for a reason other than contention.
    #[error("lock database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Result alias for lock operations.
pub type LockResult<T> = Result<T, LockError>;
