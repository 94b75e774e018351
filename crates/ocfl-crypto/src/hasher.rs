use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use ocfl_types::DigestAlgorithm;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

use crate::error::DigestResult;

const BUFFER_SIZE: usize = 64 * 1024;

/// Streaming hasher for one [`DigestAlgorithm`].
///
/// Implements [`io::Write`] so it can be the sink of [`io::copy`].
#[derive(Clone)]
pub enum DigestHasher {
    Sha1(Sha1),
    Sha256(Sha256),
    Sha512(Sha512),
}

impl DigestHasher {
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        match algorithm {
            DigestAlgorithm::Sha1 => Self::Sha1(Sha1::new()),
            DigestAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
            DigestAlgorithm::Sha512 => Self::Sha512(Sha512::new()),
        }
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        match self {
            Self::Sha1(_) => DigestAlgorithm::Sha1,
            Self::Sha256(_) => DigestAlgorithm::Sha256,
            Self::Sha512(_) => DigestAlgorithm::Sha512,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha1(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
        }
    }

    /// Consume the hasher and return the lowercase hex digest.
    pub fn finalize_hex(self) -> String {
        match self {
            Self::Sha1(h) => hex::encode(h.finalize()),
            Self::Sha256(h) => hex::encode(h.finalize()),
            Self::Sha512(h) => hex::encode(h.finalize()),
        }
    }
}

impl Write for DigestHasher {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for DigestHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DigestHasher").field(&self.algorithm()).finish()
    }
}

/// Hex digest of an in-memory buffer.
pub fn digest_bytes(algorithm: DigestAlgorithm, data: &[u8]) -> String {
    let mut hasher = DigestHasher::new(algorithm);
    hasher.update(data);
    hasher.finalize_hex()
}

/// Hex digest of everything readable from `reader`.
pub fn digest_reader<R: Read>(algorithm: DigestAlgorithm, reader: &mut R) -> io::Result<String> {
    let mut hasher = DigestHasher::new(algorithm);
    io::copy(reader, &mut hasher)?;
    Ok(hasher.finalize_hex())
}

/// Hex digest of a file's contents.
pub fn digest_file(algorithm: DigestAlgorithm, path: &Path) -> DigestResult<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
    Ok(digest_reader(algorithm, &mut reader)?)
}

/// Case-insensitive comparison of two hex digests.
pub fn digests_match(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}
