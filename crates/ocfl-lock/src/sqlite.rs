use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, TransactionBehavior};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{LockError, LockResult};
use crate::traits::{ObjectLock, ObjectLockGuard};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Lock shared by every process that opens the same SQLite database.
///
/// Each object id owns one row of `ocfl_object_lock`, inserted the first time
/// the id is locked. Acquisition claims the row by setting `holder` while it
/// is `NULL`, inside an `IMMEDIATE` transaction, and retries until the wait
/// elapses. Releasing clears `holder`.
///
/// A process that dies while holding a lock leaves its row claimed;
/// [`SqliteObjectLock::clear_stale`] releases such rows.
pub struct SqliteObjectLock {
    path: PathBuf,
    wait: Duration,
    poll_interval: Duration,
}

impl SqliteObjectLock {
    /// Open (creating if necessary) the lock table in the database at `path`.
    pub fn open(path: impl AsRef<Path>, wait: Duration) -> LockResult<Self> {
        let lock = Self {
            path: path.as_ref().to_path_buf(),
            wait,
            poll_interval: DEFAULT_POLL_INTERVAL,
        };
        let conn = lock.connection()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS ocfl_object_lock (
                object_id TEXT PRIMARY KEY,
                holder TEXT,
                acquired_at INTEGER
            );
            "#,
        )?;
        Ok(lock)
    }

    /// How long to sleep between claim attempts while the row is held.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Release rows claimed longer than `older_than` ago. Returns how many
    /// rows were released.
    pub fn clear_stale(&self, older_than: Duration) -> LockResult<usize> {
        let older_than = i64::try_from(older_than.as_millis()).unwrap_or(i64::MAX);
        let cutoff = Utc::now().timestamp_millis().saturating_sub(older_than);
        let conn = self.connection()?;
        let cleared = conn.execute(
            "UPDATE ocfl_object_lock SET holder = NULL, acquired_at = NULL
             WHERE holder IS NOT NULL AND acquired_at < ?1",
            params![cutoff],
        )?;
        if cleared > 0 {
            warn!(cleared, "released stale object locks");
        }
        Ok(cleared)
    }

    fn connection(&self) -> LockResult<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(self.wait)?;
        Ok(conn)
    }

    fn try_claim(conn: &mut Connection, object_id: &str, holder: &str) -> rusqlite::Result<bool> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT OR IGNORE INTO ocfl_object_lock (object_id, holder, acquired_at)
             VALUES (?1, NULL, NULL)",
            params![object_id],
        )?;
        let claimed = tx.execute(
            "UPDATE ocfl_object_lock SET holder = ?1, acquired_at = ?2
             WHERE object_id = ?3 AND holder IS NULL",
            params![holder, Utc::now().timestamp_millis(), object_id],
        )?;
        tx.commit()?;
        Ok(claimed == 1)
    }

    fn timeout(&self, object_id: &str) -> LockError {
        LockError::Timeout {
            object_id: object_id.to_string(),
            wait: self.wait,
        }
    }
}

impl ObjectLock for SqliteObjectLock {
    fn acquire(&self, object_id: &str) -> LockResult<ObjectLockGuard<'_>> {
        let deadline = Instant::now() + self.wait;
        let holder = Uuid::now_v7().to_string();
        let mut conn = self.connection()?;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            conn.busy_timeout(remaining)?;

            match Self::try_claim(&mut conn, object_id, &holder) {
                Ok(true) => {
                    debug!(object_id, %holder, "acquired object lock");
                    return Ok(ObjectLockGuard::new(HeldRow {
                        conn,
                        object_id: object_id.to_string(),
                        holder,
                    }));
                }
                Ok(false) => {}
                Err(e) if is_contention(&e) => {}
                Err(e) => return Err(e.into()),
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!(object_id, wait = ?self.wait, "timed out waiting for object lock");
                return Err(self.timeout(object_id));
            }
            std::thread::sleep(self.poll_interval.min(remaining));
        }
    }
}

/// Claimed row; dropping it clears the holder.
struct HeldRow {
    conn: Connection,
    object_id: String,
    holder: String,
}

impl Drop for HeldRow {
    fn drop(&mut self) {
        let result = self.conn.execute(
            "UPDATE ocfl_object_lock SET holder = NULL, acquired_at = NULL
             WHERE object_id = ?1 AND holder = ?2",
            params![self.object_id, self.holder],
        );
        match result {
            Ok(1) => debug!(object_id = %self.object_id, "released object lock"),
            Ok(_) => warn!(
                object_id = %self.object_id,
                holder = %self.holder,
                "object lock was no longer held at release"
            ),
            Err(e) => warn!(
                object_id = %self.object_id,
                error = %e,
                "failed to release object lock"
            ),
        }
    }
}

fn is_contention(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ObjectLockExt;

    fn open(dir: &tempfile::TempDir, wait: Duration) -> SqliteObjectLock {
        SqliteObjectLock::open(dir.path().join("locks.db"), wait)
            .unwrap()
            .with_poll_interval(Duration::from_millis(5))
    }

    #[test]
    fn second_holder_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let first = open(&dir, Duration::from_millis(100));
        let second = open(&dir, Duration::from_millis(100));

        let guard = first.acquire("o1").unwrap();
        let started = Instant::now();
        let err = second.acquire("o1").unwrap_err();
        assert!(matches!(err, LockError::Timeout { ref object_id, .. } if object_id == "o1"));
        assert!(started.elapsed() >= Duration::from_millis(100));

        drop(guard);
        let _again = second.acquire("o1").unwrap();
    }

    #[test]
    fn distinct_ids_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let lock = open(&dir, Duration::from_millis(50));
        let _a = lock.acquire("a").unwrap();
        let _b = lock.acquire("b").unwrap();
    }

    #[test]
    fn released_even_when_action_fails() {
        let dir = tempfile::tempdir().unwrap();
        let lock = open(&dir, Duration::from_millis(50));
        let result: Result<(), LockError> = lock.with_write_lock("o1", || {
            Err(LockError::Timeout {
                object_id: "inner".into(),
                wait: Duration::ZERO,
            })
        });
        assert!(result.is_err());
        let _guard = lock.acquire("o1").unwrap();
    }

    #[test]
    fn waiter_acquires_after_release() {
        let dir = tempfile::tempdir().unwrap();
        let lock = open(&dir, Duration::from_secs(5));

        std::thread::scope(|s| {
            let guard = lock.acquire("o1").unwrap();
            let waiter = s.spawn(|| lock.acquire("o1").map(|_| ()));
            std::thread::sleep(Duration::from_millis(30));
            drop(guard);
            waiter.join().unwrap().unwrap();
        });
    }

    #[test]
    fn clear_stale_releases_abandoned_rows() {
        let dir = tempfile::tempdir().unwrap();
        let lock = open(&dir, Duration::from_millis(20));
        let guard = lock.acquire("o1").unwrap();
        std::mem::forget(guard);

        assert!(lock.acquire("o1").is_err());
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(lock.clear_stale(Duration::ZERO).unwrap(), 1);
        let _guard = lock.acquire("o1").unwrap();
    }
}
