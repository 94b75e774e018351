//! Storage engine for OCFL repositories.
//!
//! Objects are stored as immutable, content-addressed versions. A commit
//! writes the new version's content and inventory next to the existing ones
//! and then publishes it by replacing the object-root inventory, so readers
//! always see either the old head or the new one.
//!
//! # Key Types
//!
//! - [`OcflStorage`] -- the backend contract
//! - [`FileSystemOcflStorage`] -- objects as directories on a filesystem
//! - [`CloudOcflStorage`] -- objects as keys in a blob store behind a
//!   [`CloudClient`]; [`InMemoryCloudClient`] for tests and embedding
//! - [`ObjectIdPathMapper`] -- where an object lives: [`FlatLayout`],
//!   [`HashedNTupleLayout`]
//! - [`ParallelProcess`] -- the bounded worker pool each backend owns
//! - [`FileRetriever`] -- lazy, fixity-checked access to one content file
//!
//! # Design Rules
//!
//! 1. Versions are never rewritten. The object-root inventory is replaced
//!    last, and replacing it is what makes a version visible.
//! 2. Writers hold the object's lock from `ocfl-lock`; the storage still
//!    detects a lost race and reports [`StorageError::OutOfSync`].
//! 3. Every byte read back is re-hashed against the manifest.
//! 4. Compensation after a failure is best-effort and logged; the original
//!    error is what the caller sees.

pub mod cloud;
pub mod config;
pub mod declarations;
pub mod error;
pub mod fs;
pub mod layout;
mod lifecycle;
pub mod parallel;
pub mod retriever;
pub mod traits;

pub use cloud::{
    CloudClient, CloudError, CloudOcflStorage, CloudResult, InMemoryCloudClient, ListResult,
    ListedObject,
};
pub use config::StorageConfig;
pub use declarations::Namaste;
pub use error::{StorageError, StorageResult};
pub use fs::FileSystemOcflStorage;
pub use layout::{FlatLayout, HashedNTupleLayout, ObjectIdPathMapper};
pub use parallel::{Interrupt, ParallelProcess};
pub use retriever::FileRetriever;
pub use traits::{ObjectIdIter, OcflStorage};
