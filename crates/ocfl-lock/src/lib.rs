//! Per-object write locks for the OCFL storage engine.
//!
//! Every mutating storage operation runs while its caller holds the write
//! lock for the object id. Two backends are provided:
//!
//! - [`InMemoryObjectLock`] -- one mutex per object id, for a single process
//! - [`SqliteObjectLock`] -- one row per object id in a shared SQLite
//!   database, for several processes on one host or a shared volume
//!
//! # Design Rules
//!
//! 1. At most one holder per object id at a time.
//! 2. Waiting is bounded; exceeding the bound is a [`LockError::Timeout`].
//! 3. Release always happens, even when the guarded action fails.
//! 4. No fairness guarantee beyond the underlying primitive's.

pub mod error;
pub mod memory;
pub mod sqlite;
pub mod traits;

pub use error::{LockError, LockResult};
pub use memory::InMemoryObjectLock;
pub use sqlite::SqliteObjectLock;
pub use traits::{ObjectLock, ObjectLockExt, ObjectLockGuard};
