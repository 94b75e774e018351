use std::fs;
use std::io;
use std::path::Path;

use ocfl_crypto::check_file;
use ocfl_inventory::{Inventory, ObjectPaths};
use tracing::{debug, error, info};

use super::files::{install_inventory, is_dir, join_rel, move_directory_contents, remove_path};
use super::FileSystemOcflStorage;
use crate::declarations::Namaste;
use crate::error::{StorageError, StorageResult};
use crate::retriever::describe_fixity_failure;

impl FileSystemOcflStorage {
    pub(super) fn store_immutable_version(
        &self,
        inventory: &Inventory,
        staging_dir: &Path,
    ) -> StorageResult<()> {
        let object_id = inventory.id();
        let version = inventory.head();
        let root = self.object_root(inventory.object_root_path());
        debug!(object_id, version = %version, "storing new version");

        if is_dir(&join_rel(&root, ObjectPaths::MUTABLE_HEAD_DIR))? {
            return Err(StorageError::IllegalState(format!(
                "object {object_id} has an active mutable HEAD; commit or purge it before adding a version"
            )));
        }

        let first_version = inventory.versions().len() == 1;
        if first_version {
            fs::create_dir_all(&root)?;
            let namaste = Namaste::object_root(inventory.inventory_type().ocfl_version());
            fs::write(root.join(&namaste.file_name), &namaste.content)?;
        }

        let version_dir = root.join(version.to_string());
        match fs::create_dir(&version_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(StorageError::OutOfSync(format!(
                    "object {object_id} version {version} already exists"
                )));
            }
            Err(e) => return Err(e.into()),
        }

        let result = move_directory_contents(staging_dir, &version_dir)
            .map_err(StorageError::from)
            .and_then(|()| self.verify_fixity(inventory, &root, &version.to_string()))
            .and_then(|()| {
                install_inventory(&version_dir, &root, inventory.digest_algorithm())
                    .map_err(StorageError::from)
            });

        match result {
            Ok(()) => {
                info!(object_id, version = %version, "committed version");
                Ok(())
            }
            Err(e) => {
                debug!(object_id, version = %version, error = %e, "commit failed, rolling back");
                self.rollback_version(inventory, &root, &version_dir, first_version);
                Err(e)
            }
        }
    }

    /// Re-hash every content file under `prefix/` and compare it with the
    /// manifest.
    pub(super) fn verify_fixity(
        &self,
        inventory: &Inventory,
        root: &Path,
        prefix: &str,
    ) -> StorageResult<()> {
        let items: Vec<(String, String)> = inventory
            .content_paths_under_prefix(prefix)
            .into_iter()
            .collect();
        let root = root.to_path_buf();
        let object_id = inventory.id().to_string();
        let algorithm = inventory.digest_algorithm();
        self.parallel.collection(items, move |(content_path, digest), _| {
            check_file(&join_rel(&root, &content_path), algorithm, &digest)
                .map_err(|e| describe_fixity_failure(e, &object_id, &content_path))
        })
    }

    /// Undo a failed commit: drop the new version directory and put the
    /// previous head's inventory back at the object root. Failures are
    /// logged, never returned.
    pub(super) fn rollback_version(
        &self,
        inventory: &Inventory,
        root: &Path,
        version_dir: &Path,
        first_version: bool,
    ) {
        let object_id = inventory.id();
        let version = inventory.head();

        if let Err(e) = remove_path(version_dir) {
            error!(
                object_id,
                version = %version,
                error = %e,
                "failed to remove version directory during rollback"
            );
        }

        if first_version {
            if let Err(e) = remove_path(root) {
                error!(object_id, error = %e, "failed to remove object root during rollback");
            }
            return;
        }

        match version.previous() {
            Ok(previous) => {
                let previous_dir = root.join(previous.to_string());
                if let Err(e) =
                    install_inventory(&previous_dir, root, inventory.digest_algorithm())
                {
                    error!(
                        object_id,
                        version = %previous,
                        error = %e,
                        "failed to restore object root inventory during rollback"
                    );
                }
            }
            Err(e) => error!(object_id, error = %e, "no previous version to restore"),
        }
    }
}
