use ocfl_crypto::DigestError;
use ocfl_types::TypeError;

/// Errors from inventory construction, lookup and (de)serialization.
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    /// Object id, digest algorithm or content directory failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The inventory violates a structural invariant.
    #[error("invalid inventory: {0}")]
    InvalidInventory(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The sidecar file is empty or cannot be parsed.
    #[error("corrupt sidecar: {0}")]
    CorruptSidecar(String),

    /// The inventory bytes do not hash to the digest its sidecar records.
    #[error("inventory digest mismatch: sidecar records {expected}, computed {actual}")]
    SidecarMismatch { expected: String, actual: String },

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Digest(#[from] DigestError),
}

/// Result alias for inventory operations.
pub type InventoryResult<T> = Result<T, InventoryError>;
