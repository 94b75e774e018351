use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{LockError, LockResult};
use crate::traits::{ObjectLock, ObjectLockGuard};

/// In-process lock: one mutex per object id.
///
/// Entries are created on first use and kept for the lifetime of the lock.
pub struct InMemoryObjectLock {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    wait: Duration,
}

impl InMemoryObjectLock {
    pub fn new(wait: Duration) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            wait,
        }
    }

    fn lock_for(&self, object_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        locks.entry(object_id.to_string()).or_default().clone()
    }
}

impl ObjectLock for InMemoryObjectLock {
    fn acquire(&self, object_id: &str) -> LockResult<ObjectLockGuard<'_>> {
        let lock = self.lock_for(object_id);
        match lock.try_lock_arc_for(self.wait) {
            Some(guard) => Ok(ObjectLockGuard::new(guard)),
            None => {
                debug!(object_id, wait = ?self.wait, "timed out waiting for object lock");
                Err(LockError::Timeout {
                    object_id: object_id.to_string(),
                    wait: self.wait,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ObjectLockExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    #[test]
    fn second_acquire_times_out_while_held() {
        let lock = InMemoryObjectLock::new(Duration::from_millis(50));
        let barrier = Barrier::new(2);
        let release = Barrier::new(2);

        std::thread::scope(|s| {
            s.spawn(|| {
                let _guard = lock.acquire("o1").unwrap();
                barrier.wait();
                release.wait();
            });

            barrier.wait();
            let err = lock.acquire("o1").unwrap_err();
            assert!(matches!(err, LockError::Timeout { ref object_id, .. } if object_id == "o1"));
            release.wait();
        });
    }

    #[test]
    fn different_ids_do_not_contend() {
        let lock = InMemoryObjectLock::new(Duration::from_millis(10));
        let _a = lock.acquire("a").unwrap();
        let _b = lock.acquire("b").unwrap();
    }

    #[test]
    fn released_after_action_error() {
        let lock = InMemoryObjectLock::new(Duration::from_millis(10));
        let result: Result<(), LockError> = lock.with_write_lock("o1", || {
            Err(LockError::Timeout {
                object_id: "inner".into(),
                wait: Duration::ZERO,
            })
        });
        assert!(matches!(
            result,
            Err(LockError::Timeout { ref object_id, .. }) if object_id == "inner"
        ));
        let _guard = lock.acquire("o1").unwrap();
    }

    #[test]
    fn actions_on_one_id_never_overlap() {
        let lock = InMemoryObjectLock::new(Duration::from_secs(5));
        let inside = AtomicUsize::new(0);
        let max_inside = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    lock.with_write_lock::<_, LockError, _>("o1", || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(2));
                        inside.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .unwrap();
                });
            }
        });
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn usable_as_trait_object() {
        let lock: Box<dyn ObjectLock> =
            Box::new(InMemoryObjectLock::new(Duration::from_millis(10)));
        let value = lock.with_write_lock::<_, LockError, _>("o1", || Ok(7)).unwrap();
        assert_eq!(value, 7);
    }
}
