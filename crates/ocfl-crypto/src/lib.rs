//! Digest computation and fixity verification for the OCFL storage engine.
//!
//! Every content path recorded in an inventory is identified by the
//! lowercase hex digest of its bytes. This crate computes those digests for
//! each supported [`DigestAlgorithm`](ocfl_types::DigestAlgorithm) and checks
//! bytes against previously recorded values while they stream past.
//!
//! All digest operations wrap the RustCrypto `sha1`/`sha2` crates.

pub mod error;
pub mod fixity;
pub mod hasher;

pub use error::{DigestError, DigestResult};
pub use fixity::{check_file, FixityCheckReader};
pub use hasher::{digest_bytes, digest_file, digest_reader, digests_match, DigestHasher};
