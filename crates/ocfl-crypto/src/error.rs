use std::io;

use ocfl_types::DigestAlgorithm;

/// Errors from digest computation and fixity checks.
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("{algorithm} fixity mismatch: expected {expected}, computed {actual}")]
    FixityMismatch {
        algorithm: DigestAlgorithm,
        expected: String,
        actual: String,
    },

    #[error("I/O error: {0}")]
    Io(io::Error),
}

impl From<io::Error> for DigestError {
    /// Unwraps a `DigestError` that travelled through an `io::Read` boundary.
    fn from(err: io::Error) -> Self {
        if err
            .get_ref()
            .is_some_and(|inner| inner.is::<DigestError>())
        {
            if let Some(inner) = err.into_inner() {
                if let Ok(digest_err) = inner.downcast::<DigestError>() {
                    return *digest_err;
                }
            }
            return DigestError::Io(io::Error::other("fixity error lost in conversion"));
        }
        DigestError::Io(err)
    }
}

impl From<DigestError> for io::Error {
    fn from(err: DigestError) -> Self {
        match err {
            DigestError::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

/// Convenience result type for digest operations.
pub type DigestResult<T> = Result<T, DigestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixity_error_survives_io_round_trip() {
        let original = DigestError::FixityMismatch {
            algorithm: DigestAlgorithm::Sha256,
            expected: "aa".into(),
            actual: "bb".into(),
        };
        let io_err: io::Error = original.into();
        assert_eq!(io_err.kind(), io::ErrorKind::InvalidData);

        match DigestError::from(io_err) {
            DigestError::FixityMismatch { expected, actual, .. } => {
                assert_eq!(expected, "aa");
                assert_eq!(actual, "bb");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn plain_io_error_stays_io() {
        let err = DigestError::from(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(matches!(err, DigestError::Io(e) if e.kind() == io::ErrorKind::NotFound));
    }
}
