use std::collections::BTreeMap;
use std::path::Path;

use ocfl_inventory::Inventory;
use ocfl_types::VersionId;

use crate::error::StorageResult;
use crate::retriever::FileRetriever;

/// Lazy iterator over the ids of every object in a repository.
pub type ObjectIdIter<'a> = Box<dyn Iterator<Item = StorageResult<String>> + 'a>;

/// Persistence engine for OCFL objects.
///
/// All implementations must satisfy these invariants:
/// - A stored version is never modified. A new version becomes visible only
///   when the object-root inventory is replaced, which is the last step of a
///   commit.
/// - A failed commit leaves the previously visible head intact.
/// - Every byte read back is verified against its manifest digest.
/// - Writers hold the object's lock (see `ocfl-lock`) around mutating calls.
///   The storage still re-validates that the version it is asked to write
///   does not exist yet, and reports [`crate::StorageError::OutOfSync`] when
///   it does.
/// - Every operation except [`OcflStorage::initialize_storage`] and
///   [`OcflStorage::close`] fails with [`crate::StorageError::IllegalState`]
///   unless the storage is initialized and not closed.
pub trait OcflStorage: Send + Sync {
    /// Create or validate the storage root. Idempotent.
    fn initialize_storage(&self) -> StorageResult<()>;

    /// The current inventory of an object, or `None` if it does not exist.
    ///
    /// While a mutable HEAD is active the staged inventory is returned.
    fn load_inventory(&self, object_id: &str) -> StorageResult<Option<Inventory>>;

    /// Commit the head version of `inventory` from `staging_dir`.
    ///
    /// `staging_dir` holds `inventory.json`, its sidecar and the new content
    /// under the content directory. If `inventory` has a mutable HEAD, the
    /// content is staged as the next revision instead of a new version.
    fn store_new_version(&self, inventory: &Inventory, staging_dir: &Path) -> StorageResult<()>;

    /// Lazy, fixity-checked handles to every file of a version, by logical path.
    fn get_object_streams(
        &self,
        inventory: &Inventory,
        version_id: VersionId,
    ) -> StorageResult<BTreeMap<String, FileRetriever>>;

    /// Write every file of a version under `dest`, verifying each one.
    fn reconstruct_object_version(
        &self,
        inventory: &Inventory,
        version_id: VersionId,
        dest: &Path,
    ) -> StorageResult<()>;

    /// Copy one content file to `dest`, verifying it. `dest` is removed on failure.
    fn retrieve_file(&self, inventory: &Inventory, digest: &str, dest: &Path) -> StorageResult<()>;

    /// Permanently delete an object. Purging a missing object succeeds.
    fn purge_object(&self, object_id: &str) -> StorageResult<()>;

    /// Turn the active mutable HEAD of `old` into the ordinary version
    /// described by `new`, whose inventory is in `staging_dir`.
    fn commit_mutable_head(
        &self,
        old: &Inventory,
        new: &Inventory,
        staging_dir: &Path,
    ) -> StorageResult<()>;

    /// Discard an object's mutable HEAD, if any.
    fn purge_mutable_head(&self, object_id: &str) -> StorageResult<()>;

    fn contains_object(&self, object_id: &str) -> StorageResult<bool>;

    /// Storage-root-relative path of an object's root.
    fn object_root_path(&self, object_id: &str) -> StorageResult<String>;

    /// Every object id in the repository, in no particular order.
    fn list_object_ids(&self) -> StorageResult<ObjectIdIter<'_>>;

    /// Release resources. Later operations fail with `IllegalState`.
    fn close(&self);
}
