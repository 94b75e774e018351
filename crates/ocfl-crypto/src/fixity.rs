use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use ocfl_types::DigestAlgorithm;

use crate::error::{DigestError, DigestResult};
use crate::hasher::{digests_match, DigestHasher};

/// A reader that digests every byte it yields and compares the result with
/// an expected digest.
///
/// The comparison happens automatically when the wrapped reader reports EOF:
/// a mismatch surfaces as an [`io::ErrorKind::InvalidData`] error wrapping a
/// [`DigestError::FixityMismatch`]. Callers that stop reading early can call
/// [`FixityCheckReader::check_fixity`], which drains the rest of the stream
/// first.
pub struct FixityCheckReader<R> {
    inner: R,
    expected: String,
    hasher: Option<DigestHasher>,
    algorithm: DigestAlgorithm,
    actual: Option<String>,
}

impl<R: Read> FixityCheckReader<R> {
    pub fn new(inner: R, algorithm: DigestAlgorithm, expected: impl Into<String>) -> Self {
        Self {
            inner,
            expected: expected.into().to_ascii_lowercase(),
            hasher: Some(DigestHasher::new(algorithm)),
            algorithm,
            actual: None,
        }
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    pub fn expected_digest(&self) -> &str {
        &self.expected
    }

    /// The computed digest, available once the stream reached EOF.
    pub fn actual_digest(&self) -> Option<&str> {
        self.actual.as_deref()
    }

    /// Drain the remaining bytes and compare the computed digest.
    pub fn check_fixity(&mut self) -> DigestResult<()> {
        if self.actual.is_none() {
            io::copy(self, &mut io::sink())?;
        }
        self.compare()
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn compare(&self) -> DigestResult<()> {
        match &self.actual {
            Some(actual) if digests_match(actual, &self.expected) => Ok(()),
            Some(actual) => Err(DigestError::FixityMismatch {
                algorithm: self.algorithm,
                expected: self.expected.clone(),
                actual: actual.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl<R: Read> Read for FixityCheckReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            if let Some(hasher) = self.hasher.as_mut() {
                hasher.update(&buf[..n]);
            }
        } else if !buf.is_empty() {
            if let Some(hasher) = self.hasher.take() {
                self.actual = Some(hasher.finalize_hex());
                self.compare()?;
            }
        }
        Ok(n)
    }
}

impl<R> std::fmt::Debug for FixityCheckReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixityCheckReader")
            .field("algorithm", &self.algorithm)
            .field("expected", &self.expected)
            .field("actual", &self.actual)
            .finish()
    }
}

/// Verify that the file at `path` hashes to `expected`.
pub fn check_file(path: &Path, algorithm: DigestAlgorithm, expected: &str) -> DigestResult<()> {
    let file = BufReader::new(File::open(path)?);
    FixityCheckReader::new(file, algorithm, expected).check_fixity()
}
