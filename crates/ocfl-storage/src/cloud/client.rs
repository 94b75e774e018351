use std::io::Read;
use std::path::Path;

use tracing::warn;

/// Errors from a blob-store transport.
#[derive(Debug, thiserror::Error)]
pub enum CloudError {
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The backend rejected or failed the request.
    #[error("cloud backend error: {0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CloudResult<T> = Result<T, CloudError>;

/// One object returned by a listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListedObject {
    /// Full key, relative to the client's prefix.
    pub key: String,
    /// The part of the key after the listed path and its separator.
    pub key_suffix: String,
}

/// Result of [`CloudClient::list`] or [`CloudClient::list_directory`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListResult {
    pub objects: Vec<ListedObject>,
    /// Immediate sub-"directories" (common prefixes), without trailing `/`.
    /// Always empty for recursive listings.
    pub directories: Vec<String>,
}

impl ListResult {
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.directories.is_empty()
    }
}

/// Blocking transport to a key/value blob store.
///
/// Keys are `/`-separated and relative to whatever bucket and prefix the
/// client was configured with. "Directories" exist only as common key
/// prefixes. Implementations must be safe to call from many worker threads.
pub trait CloudClient: Send + Sync {
    fn upload_file(&self, src: &Path, dst_key: &str) -> CloudResult<()>;

    fn upload_bytes(&self, dst_key: &str, bytes: &[u8], content_type: &str) -> CloudResult<()>;

    /// Open a stream over an object. Missing key → [`CloudError::KeyNotFound`].
    fn download_stream(&self, src_key: &str) -> CloudResult<Box<dyn Read + Send>>;

    fn download_file(&self, src_key: &str, dst: &Path) -> CloudResult<()>;

    fn download_string(&self, src_key: &str) -> CloudResult<String>;

    /// Server-side copy.
    fn copy_object(&self, src_key: &str, dst_key: &str) -> CloudResult<()>;

    /// Every object under `prefix/`, recursively.
    fn list(&self, prefix: &str) -> CloudResult<ListResult>;

    /// Objects directly under `path/` plus its immediate sub-directories.
    fn list_directory(&self, path: &str) -> CloudResult<ListResult>;

    /// Delete every object under `path/`. Deleting nothing is not an error.
    fn delete_path(&self, path: &str) -> CloudResult<()>;

    /// Delete the given keys. Missing keys are ignored.
    fn delete_objects(&self, keys: &[String]) -> CloudResult<()>;

    /// [`CloudClient::delete_objects`], logging instead of returning failures.
    /// Used for compensation after another error.
    fn safe_delete_objects(&self, keys: &[String]) {
        if keys.is_empty() {
            return;
        }
        if let Err(e) = self.delete_objects(keys) {
            warn!(count = keys.len(), error = %e, "failed to delete objects during cleanup");
        }
    }
}
