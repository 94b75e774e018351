//! Inventory data model for the OCFL storage engine.
//!
//! An inventory is the authoritative description of one object: every
//! version's logical state, the deduplicated manifest mapping digests to the
//! content paths that hold their bytes, and optional fixity blocks for
//! additional algorithms.
//!
//! # Key Types
//!
//! - [`Inventory`] -- immutable, validated at construction
//! - [`InventoryBuilder`] -- produces a new [`Inventory`] for every version
//! - [`Version`] -- one snapshot: timestamp, metadata and state
//! - [`PathBiMap`] -- digest ↔ path index behind manifests and states
//! - [`InventoryDocument`] -- the `inventory.json` wire form, hydrated with an
//!   [`InventoryContext`] by an [`InventoryMapper`]
//!
//! # Design Rules
//!
//! 1. Inventories are never mutated; each version gets a new instance.
//! 2. Validation happens once, when an inventory is built or hydrated.
//! 3. Storage facts (object root, mutable HEAD, revision) are not part of
//!    the document and are supplied explicitly on hydration.
//! 4. Every persisted inventory is accompanied by a digest sidecar.

pub mod bimap;
pub mod config;
pub mod document;
pub mod error;
pub mod inventory;
pub mod mapper;
pub mod paths;
pub mod sidecar;
pub mod version;

pub use bimap::PathBiMap;
pub use config::OcflConfig;
pub use document::{InventoryContext, InventoryDocument, VersionDocument};
pub use error::{InventoryError, InventoryResult};
pub use inventory::{Inventory, InventoryBuilder};
pub use mapper::{InventoryMapper, JsonInventoryMapper};
pub use paths::{join_path, ObjectPaths};
pub use sidecar::{
    parse_sidecar, read_inventory_with_sidecar, read_sidecar_digest, sidecar_contents,
    verify_inventory_digest, write_inventory_with_sidecar, SerializedInventory,
};
pub use version::{User, Version, VersionBuilder};
