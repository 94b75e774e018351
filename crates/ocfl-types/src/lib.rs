//! Foundation types for the OCFL storage engine.
//!
//! This crate provides the small, ordered identifiers and algorithm tags that
//! every other crate in the workspace depends on.
//!
//! # Key Types
//!
//! - [`VersionId`] -- `v1`, `v2`, … (optionally zero-padded) version identifiers
//! - [`RevisionId`] -- `r1`, `r2`, … identifiers for staged mutable-HEAD edits
//! - [`DigestAlgorithm`] -- named digest algorithms and the inventory allow-list
//! - [`OcflVersion`] / [`InventoryType`] -- declaration strings for the layout

pub mod digest;
pub mod error;
pub mod ocfl;
pub mod revision;
pub mod version;

pub use digest::DigestAlgorithm;
pub use error::TypeError;
pub use ocfl::{InventoryType, OcflVersion};
pub use revision::RevisionId;
pub use version::VersionId;
