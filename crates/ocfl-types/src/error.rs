use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid version id: {0}")]
    InvalidVersionId(String),

    #[error("invalid revision id: {0}")]
    InvalidRevisionId(String),

    #[error("unknown digest algorithm: {0}")]
    UnknownDigestAlgorithm(String),

    #[error("unknown ocfl version: {0}")]
    UnknownOcflVersion(String),

    /// Successor/predecessor would leave the representable range.
    #[error("{id} has no {direction} identifier")]
    OutOfRange { id: String, direction: &'static str },
}
