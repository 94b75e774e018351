use ocfl_crypto::DigestError;
use ocfl_inventory::InventoryError;
use ocfl_lock::LockError;
use ocfl_types::TypeError;

use crate::cloud::CloudError;

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The object changed since the caller loaded it: another writer won.
    #[error("out of sync: {0}")]
    OutOfSync(String),

    /// Recomputed digest disagrees with the recorded digest.
    #[error("fixity check failed: {0}")]
    FixityMismatch(String),

    /// A required sidecar, declaration or inventory is missing or unreadable.
    #[error("corrupt object: {0}")]
    CorruptObject(String),

    /// The per-object write lock could not be acquired.
    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("not found: {0}")]
    NotFound(String),

    /// Digest algorithm, content directory or repository layout is invalid.
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),

    /// The storage is not initialized, already closed, or the object is in
    /// a state that does not permit the operation.
    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error(transparent)]
    Inventory(InventoryError),

    #[error(transparent)]
    Cloud(#[from] CloudError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<InventoryError> for StorageError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::InvalidConfiguration(msg) => StorageError::ConfigurationInvalid(msg),
            InventoryError::NotFound(msg) => StorageError::NotFound(msg),
            InventoryError::CorruptSidecar(msg) => StorageError::CorruptObject(msg),
            e @ InventoryError::SidecarMismatch { .. } => {
                StorageError::FixityMismatch(e.to_string())
            }
            InventoryError::Io(e) => StorageError::Io(e),
            InventoryError::Digest(e) => e.into(),
            other => StorageError::Inventory(other),
        }
    }
}

impl From<DigestError> for StorageError {
    fn from(err: DigestError) -> Self {
        match err {
            e @ DigestError::FixityMismatch { .. } => StorageError::FixityMismatch(e.to_string()),
            DigestError::Io(e) => StorageError::Io(e),
        }
    }
}

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;
    use ocfl_types::DigestAlgorithm;

    #[test]
    fn sidecar_problems_map_to_taxonomy() {
        let mismatch: StorageError = InventoryError::SidecarMismatch {
            expected: "aa".into(),
            actual: "bb".into(),
        }
        .into();
        assert!(matches!(mismatch, StorageError::FixityMismatch(_)));

        let corrupt: StorageError = InventoryError::CorruptSidecar("empty".into()).into();
        assert!(matches!(corrupt, StorageError::CorruptObject(_)));
    }

    #[test]
    fn digest_mismatch_maps_to_fixity() {
        let err: StorageError = DigestError::FixityMismatch {
            algorithm: DigestAlgorithm::Sha256,
            expected: "aa".into(),
            actual: "bb".into(),
        }
        .into();
        assert!(matches!(err, StorageError::FixityMismatch(ref m) if m.contains("aa")));
    }

    #[test]
    fn configuration_errors_keep_their_kind() {
        let err: StorageError = InventoryError::InvalidConfiguration("bad dir".into()).into();
        assert!(matches!(err, StorageError::ConfigurationInvalid(_)));
    }
}
