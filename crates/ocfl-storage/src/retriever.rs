use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ocfl_crypto::{DigestError, FixityCheckReader};
use ocfl_inventory::Inventory;
use ocfl_types::{DigestAlgorithm, VersionId};

use crate::cloud::CloudClient;
use crate::error::{StorageError, StorageResult};
use crate::parallel::Interrupt;

const COPY_CHUNK: usize = 64 * 1024;

enum Source {
    Local(PathBuf),
    Cloud {
        client: Arc<dyn CloudClient>,
        key: String,
    },
}

/// Lazy handle to one content file of an object version.
///
/// Nothing is opened until [`FileRetriever::retrieve`] is called. Every
/// stream it returns verifies the bytes against the manifest digest as they
/// are read.
pub struct FileRetriever {
    source: Source,
    algorithm: DigestAlgorithm,
    digest: String,
}

impl FileRetriever {
    pub fn local(
        path: impl Into<PathBuf>,
        algorithm: DigestAlgorithm,
        digest: impl Into<String>,
    ) -> Self {
        Self {
            source: Source::Local(path.into()),
            algorithm,
            digest: digest.into(),
        }
    }

    pub fn cloud(
        client: Arc<dyn CloudClient>,
        key: impl Into<String>,
        algorithm: DigestAlgorithm,
        digest: impl Into<String>,
    ) -> Self {
        Self {
            source: Source::Cloud {
                client,
                key: key.into(),
            },
            algorithm,
            digest: digest.into(),
        }
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Open a fresh fixity-checked stream over the content.
    ///
    /// Reading to EOF fails with [`io::ErrorKind::InvalidData`] if the
    /// content does not match its digest.
    pub fn retrieve(&self) -> StorageResult<FixityCheckReader<Box<dyn Read + Send>>> {
        let inner: Box<dyn Read + Send> = match &self.source {
            Source::Local(path) => Box::new(BufReader::new(File::open(path)?)),
            Source::Cloud { client, key } => client.download_stream(key)?,
        };
        Ok(FixityCheckReader::new(inner, self.algorithm, self.digest.as_str()))
    }

    /// Read the whole content into memory, verifying it.
    pub fn read_to_vec(&self) -> StorageResult<Vec<u8>> {
        let mut reader = self.retrieve()?;
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).map_err(DigestError::from)?;
        Ok(bytes)
    }
}

impl std::fmt::Debug for FileRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let location = match &self.source {
            Source::Local(path) => path.display().to_string(),
            Source::Cloud { key, .. } => key.clone(),
        };
        f.debug_struct("FileRetriever")
            .field("location", &location)
            .field("algorithm", &self.algorithm)
            .field("digest", &self.digest)
            .finish()
    }
}

/// Stream `reader` into a new file at `dest`, verifying the bytes against
/// `digest` on the way.
///
/// The copy stops between chunks once `interrupt` is raised. Parent
/// directories are created. The file is left in place on failure; callers
/// decide whether to remove it.
pub(crate) fn copy_verified<R: Read>(
    reader: R,
    dest: &Path,
    algorithm: DigestAlgorithm,
    digest: &str,
    interrupt: &Interrupt,
) -> Result<(), DigestError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut checked = FixityCheckReader::new(reader, algorithm, digest);
    let mut out = BufWriter::new(File::create(dest)?);
    let mut buf = vec![0u8; COPY_CHUNK];
    loop {
        if interrupt.is_raised() {
            return Err(io::Error::other(format!(
                "copy to {} interrupted",
                dest.display()
            ))
            .into());
        }
        let n = match checked.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        out.write_all(&buf[..n])?;
    }
    out.flush()?;
    checked.check_fixity()
}

/// One file of a version: logical path, digest and the content path holding it.
pub(crate) struct VersionFile {
    pub logical_path: String,
    pub digest: String,
    pub content_path: String,
}

/// Resolve every logical path of `version_id` to its content path.
pub(crate) fn version_files(
    inventory: &Inventory,
    version_id: VersionId,
) -> StorageResult<Vec<VersionFile>> {
    let version = inventory.ensure_version(version_id)?;
    version
        .state()
        .iter()
        .map(|(logical_path, digest)| {
            let content_path = inventory.content_path(digest).ok_or_else(|| {
                StorageError::CorruptObject(format!(
                    "object {} version {version_id}: {logical_path} references digest {digest} missing from the manifest",
                    inventory.id()
                ))
            })?;
            Ok(VersionFile {
                logical_path: logical_path.to_string(),
                digest: digest.to_string(),
                content_path: content_path.to_string(),
            })
        })
        .collect()
}

/// Where a logical path lands under `dest`. Paths that could escape `dest`
/// are rejected.
pub(crate) fn logical_target(dest: &Path, logical_path: &str) -> StorageResult<PathBuf> {
    let mut target = dest.to_path_buf();
    for segment in logical_path.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
            return Err(StorageError::CorruptObject(format!(
                "logical path {logical_path} is not a safe relative path"
            )));
        }
        target.push(segment);
    }
    Ok(target)
}

/// Attach the logical path and object id to a fixity failure.
pub(crate) fn describe_fixity_failure(
    err: DigestError,
    object_id: &str,
    logical_path: &str,
) -> StorageError {
    match err {
        DigestError::FixityMismatch {
            algorithm,
            expected,
            actual,
        } => StorageError::FixityMismatch(format!(
            "file {logical_path} in object {object_id}: expected {algorithm} digest {expected}, got {actual}"
        )),
        DigestError::Io(e) => StorageError::Io(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::InMemoryCloudClient;
    use ocfl_crypto::digest_bytes;

    const ALG: DigestAlgorithm = DigestAlgorithm::Sha256;

    #[test]
    fn local_retriever_verifies_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"hello").unwrap();

        let good = FileRetriever::local(&path, ALG, digest_bytes(ALG, b"hello"));
        assert_eq!(good.read_to_vec().unwrap(), b"hello");

        let bad = FileRetriever::local(&path, ALG, digest_bytes(ALG, b"other"));
        assert!(matches!(bad.read_to_vec(), Err(StorageError::FixityMismatch(_))));
    }

    #[test]
    fn cloud_retriever_is_lazy() {
        let client = Arc::new(InMemoryCloudClient::new());
        let retriever = FileRetriever::cloud(client.clone(), "k", ALG, digest_bytes(ALG, b"late"));
        client.put("k", "late");
        assert_eq!(retriever.read_to_vec().unwrap(), b"late");
        assert_eq!(retriever.digest(), digest_bytes(ALG, b"late"));
    }

    #[test]
    fn missing_local_file_is_io_error() {
        let retriever = FileRetriever::local("/definitely/not/here", ALG, "00");
        assert!(matches!(retriever.retrieve(), Err(StorageError::Io(_))));
    }

    #[test]
    fn logical_targets_stay_inside_dest() {
        let dest = Path::new("/tmp/out");
        assert_eq!(logical_target(dest, "a/b.txt").unwrap(), dest.join("a").join("b.txt"));
        for bad in ["../x", "a//b", "/abs", "a/./b", "", "a\\..\\b"] {
            assert!(logical_target(dest, bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn copy_verified_writes_and_checks() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested/out.txt");
        let interrupt = Interrupt::new();
        copy_verified(&b"data"[..], &dest, ALG, &digest_bytes(ALG, b"data"), &interrupt).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"data");

        let err = copy_verified(&b"data"[..], &dest, ALG, &digest_bytes(ALG, b"nope"), &interrupt)
            .unwrap_err();
        let described = describe_fixity_failure(err, "o1", "dir/out.txt");
        assert!(matches!(
            described,
            StorageError::FixityMismatch(ref m) if m.contains("dir/out.txt")
        ));
    }

    /// Endless zeros that raise `interrupt` after the first read.
    struct RaisingReader {
        interrupt: Interrupt,
        reads: usize,
    }

    impl Read for RaisingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads += 1;
            self.interrupt.raise();
            buf.fill(0);
            Ok(buf.len())
        }
    }

    #[test]
    fn copy_verified_stops_when_interrupted() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("big.bin");
        let interrupt = Interrupt::new();
        let mut reader = RaisingReader {
            interrupt: interrupt.clone(),
            reads: 0,
        };

        let err = copy_verified(&mut reader, &dest, ALG, "00", &interrupt).unwrap_err();
        assert!(matches!(err, DigestError::Io(_)));
        assert_eq!(reader.reads, 1);

        let raised = Interrupt::new();
        raised.raise();
        let err = copy_verified(&b"data"[..], &dest, ALG, "00", &raised).unwrap_err();
        assert!(matches!(err, DigestError::Io(_)));
    }
}
