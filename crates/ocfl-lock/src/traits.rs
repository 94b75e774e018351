//! The [`ObjectLock`] trait and its guard.

use crate::error::{LockError, LockResult};

/// Held while an object's write lock is owned; dropping it releases the lock.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct ObjectLockGuard<'a> {
    _held: Box<dyn Held + 'a>,
}

/// Anything whose `Drop` releases a lock.
trait Held {}

impl<T> Held for T {}

impl<'a> ObjectLockGuard<'a> {
    /// Wrap a value whose `Drop` releases the lock.
    pub fn new<T: 'a>(held: T) -> Self {
        Self {
            _held: Box::new(held),
        }
    }
}

impl std::fmt::Debug for ObjectLockGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ObjectLockGuard")
    }
}

/// Mutual exclusion keyed by object id.
///
/// Implementations must be thread-safe (`Send + Sync`). Acquisition waits
/// at most the wait duration the implementation was configured with.
/// Locks are not reentrant: acquiring an id the current thread already
/// holds waits out the bound and times out.
pub trait ObjectLock: Send + Sync {
    /// Acquire exclusive access to `object_id`.
    fn acquire(&self, object_id: &str) -> LockResult<ObjectLockGuard<'_>>;
}

/// Closure-scoped locking for every [`ObjectLock`], including trait objects.
pub trait ObjectLockExt: ObjectLock {
    /// Run `action` while holding the write lock for `object_id`.
    ///
    /// Errors from `action` are returned unchanged; acquisition failures are
    /// converted through `E: From<LockError>`.
    fn with_write_lock<T, E, F>(&self, object_id: &str, action: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<LockError>,
    {
        let _guard = self.acquire(object_id)?;
        action()
    }
}

impl<L: ObjectLock + ?Sized> ObjectLockExt for L {}
