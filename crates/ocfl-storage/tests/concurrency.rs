//! Writers racing on the same object, with and without per-object locks.

mod common;

use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::Duration;

use common::*;
use ocfl_inventory::Inventory;
use ocfl_lock::{InMemoryObjectLock, LockError, ObjectLock, ObjectLockExt, SqliteObjectLock};
use ocfl_storage::{OcflStorage, StorageError, StorageResult};
use ocfl_types::VersionId;

/// Stage one `v2` per writer from the same `v1`, then store them all at
/// once, each under `lock` when one is given.
fn race(
    storage: Arc<dyn OcflStorage>,
    lock: Option<Arc<dyn ObjectLock>>,
    base: &Inventory,
    writers: usize,
) -> Vec<StorageResult<()>> {
    let barrier = Arc::new(Barrier::new(writers));
    let handles: Vec<_> = (0..writers)
        .map(|i| {
            let storage = Arc::clone(&storage);
            let lock = lock.clone();
            let barrier = Arc::clone(&barrier);
            let base = base.clone();
            thread::spawn(move || {
                let staging = tempfile::tempdir().unwrap();
                let body = format!("writer {i}");
                let inventory =
                    stage_version(&base, &[("a.txt", body.as_bytes())], &[], staging.path());
                barrier.wait();
                let store = || storage.store_new_version(&inventory, staging.path());
                match lock {
                    Some(lock) => lock.with_write_lock(inventory.id(), store),
                    None => store(),
                }
            })
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

fn assert_single_winner(results: &[StorageResult<()>]) {
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1, "{results:?}");
    for result in results.iter().filter(|r| r.is_err()) {
        assert!(matches!(result, Err(StorageError::OutOfSync(_))), "{result:?}");
    }
}

#[test]
fn locked_filesystem_writers_have_one_winner() {
    let (storage, _tmp) = fs_storage();
    let v1 = commit(&storage, "o1", &[("a.txt", b"base")]);
    let storage: Arc<dyn OcflStorage> = Arc::new(storage);
    let lock: Arc<dyn ObjectLock> = Arc::new(InMemoryObjectLock::new(Duration::from_secs(30)));

    let results = race(Arc::clone(&storage), Some(lock), &v1, 4);
    assert_single_winner(&results);
    assert_eq!(storage.load_inventory("o1").unwrap().unwrap().head(), VersionId::new(2));
}

#[test]
fn unlocked_filesystem_writers_still_have_one_winner() {
    let (storage, _tmp) = fs_storage();
    let v1 = commit(&storage, "o1", &[("a.txt", b"base")]);
    let storage: Arc<dyn OcflStorage> = Arc::new(storage);

    let results = race(Arc::clone(&storage), None, &v1, 4);
    assert_single_winner(&results);

    let head = storage.load_inventory("o1").unwrap().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    storage.reconstruct_object_version(&head, VersionId::new(2), tmp.path()).unwrap();
}

#[test]
fn sqlite_locked_cloud_writers_have_one_winner() {
    let tmp = tempfile::tempdir().unwrap();
    let storage: Arc<dyn OcflStorage> = Arc::new(cloud_storage(memory_client()));
    let v1 = commit(storage.as_ref(), "o1", &[("a.txt", b"base")]);
    let lock: Arc<dyn ObjectLock> =
        Arc::new(
            SqliteObjectLock::open(tmp.path().join("locks.db"), Duration::from_secs(30)).unwrap(),
        );

    let results = race(Arc::clone(&storage), Some(lock), &v1, 3);
    assert_single_winner(&results);
}

#[test]
fn held_lock_times_out_other_writers() {
    let (storage, _tmp) = fs_storage();
    let v1 = commit(&storage, "o1", &[("a.txt", b"base")]);
    let lock = Arc::new(InMemoryObjectLock::new(Duration::from_millis(50)));

    let (locked_tx, locked_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let holder = {
        let lock = Arc::clone(&lock);
        thread::spawn(move || {
            let _guard = lock.acquire("o1").unwrap();
            locked_tx.send(()).unwrap();
            release_rx.recv().unwrap();
        })
    };
    locked_rx.recv().unwrap();

    let staging = tempfile::tempdir().unwrap();
    let v2 = stage_version(&v1, &[("b.txt", b"b")], &[], staging.path());
    let err = lock
        .with_write_lock("o1", || storage.store_new_version(&v2, staging.path()))
        .unwrap_err();
    assert!(matches!(err, StorageError::Lock(LockError::Timeout { .. })), "{err}");
    assert!(!storage.root().join("o1/v2").exists());

    release_tx.send(()).unwrap();
    holder.join().unwrap();

    lock.with_write_lock("o1", || storage.store_new_version(&v2, staging.path()))
        .unwrap();
    assert_eq!(storage.load_inventory("o1").unwrap().unwrap().head(), VersionId::new(2));
}

#[test]
fn locks_on_different_objects_do_not_contend() {
    let (storage, _tmp) = fs_storage();
    let lock = InMemoryObjectLock::new(Duration::from_millis(50));
    let _held = lock.acquire("o1").unwrap();

    lock.with_write_lock("o2", || -> StorageResult<()> {
        commit(&storage, "o2", &[("a.txt", b"independent")]);
        Ok(())
    })
    .unwrap();
    assert!(storage.contains_object("o2").unwrap());
}
