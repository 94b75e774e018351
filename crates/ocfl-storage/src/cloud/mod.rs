//! Blob-store backend: the transport abstraction, an in-memory transport,
//! and the storage engine built on top of them.

pub mod client;
pub mod memory;
mod scan;
pub mod storage;

pub use client::{CloudClient, CloudError, CloudResult, ListResult, ListedObject};
pub use memory::InMemoryCloudClient;
pub use storage::CloudOcflStorage;
