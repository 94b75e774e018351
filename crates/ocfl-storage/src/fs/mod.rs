//! Filesystem backend.
//!
//! Each object lives in its own directory under the storage root. A version
//! is staged by moving the staging directory's entries into a freshly
//! created `v<N>/` directory; the version becomes visible when its inventory
//! is copied over the object-root inventory.

mod commit;
mod files;
mod mutable;
mod scan;

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ocfl_inventory::{
    read_inventory_with_sidecar, Inventory, InventoryContext, InventoryMapper, JsonInventoryMapper,
    ObjectPaths,
};
use ocfl_types::{OcflVersion, VersionId};
use tracing::{debug, info, warn};

use crate::config::StorageConfig;
use crate::declarations::{
    check_layout_document, check_object_location, check_root_declaration, layout_document,
    spec_file_content, spec_file_name, Namaste, DEPOSIT_DIR, LAYOUT_FILE,
};
use crate::error::{StorageError, StorageResult};
use crate::layout::{map_object_root, ObjectIdPathMapper};
use crate::lifecycle::Lifecycle;
use crate::parallel::{Interrupt, ParallelProcess};
use crate::retriever::{
    copy_verified, describe_fixity_failure, logical_target, version_files, FileRetriever,
};
use crate::traits::{ObjectIdIter, OcflStorage};

pub(crate) use self::files::{join_rel, remove_path};
use self::files::{is_dir, remove_dir_if_empty};
use self::scan::{read_object_id, ObjectIds, ObjectRoots};

/// [`OcflStorage`] on a local or mounted filesystem.
pub struct FileSystemOcflStorage {
    root: PathBuf,
    ocfl_version: OcflVersion,
    path_mapper: Arc<dyn ObjectIdPathMapper>,
    inventory_mapper: Arc<dyn InventoryMapper>,
    parallel: ParallelProcess,
    lifecycle: Lifecycle,
}

impl FileSystemOcflStorage {
    /// Create a storage rooted at `root`. Nothing touches the disk until
    /// [`OcflStorage::initialize_storage`].
    pub fn new(
        root: impl Into<PathBuf>,
        path_mapper: Arc<dyn ObjectIdPathMapper>,
        config: &StorageConfig,
    ) -> StorageResult<Self> {
        config.validate()?;
        Ok(Self {
            root: root.into(),
            ocfl_version: config.ocfl.ocfl_version(),
            path_mapper,
            inventory_mapper: Arc::new(JsonInventoryMapper::default()),
            parallel: ParallelProcess::new(config.worker_threads)?,
            lifecycle: Lifecycle::new("filesystem"),
        })
    }

    /// Replace the default `serde_json` inventory codec.
    pub fn with_inventory_mapper(mut self, mapper: Arc<dyn InventoryMapper>) -> Self {
        self.inventory_mapper = mapper;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn rel_path(&self, object_id: &str) -> StorageResult<String> {
        map_object_root(self.path_mapper.as_ref(), object_id)
    }

    fn object_root(&self, object_root_path: &str) -> PathBuf {
        join_rel(&self.root, object_root_path)
    }

    fn initialize_root(&self) -> StorageResult<()> {
        if self.root.exists() && !is_dir(&self.root)? {
            return Err(StorageError::ConfigurationInvalid(format!(
                "storage root {} is not a directory",
                self.root.display()
            )));
        }
        fs::create_dir_all(&self.root)?;

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }

        if names.is_empty() {
            let namaste = Namaste::storage_root(self.ocfl_version);
            fs::write(self.root.join(&namaste.file_name), &namaste.content)?;
            fs::write(
                self.root.join(spec_file_name(self.ocfl_version)),
                spec_file_content(self.ocfl_version),
            )?;
            fs::write(
                self.root.join(LAYOUT_FILE),
                layout_document(self.path_mapper.as_ref())?,
            )?;
            info!(root = %self.root.display(), "created storage root");
        } else {
            check_root_declaration(names.iter().map(String::as_str), self.ocfl_version)?;
            match fs::read(self.root.join(LAYOUT_FILE)) {
                Ok(bytes) => check_layout_document(&bytes, self.path_mapper.as_ref())?,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    warn!(root = %self.root.display(), "storage root has no layout document");
                }
                Err(e) => return Err(e.into()),
            }
            self.check_sample_object()?;
        }

        fs::create_dir_all(self.root.join(DEPOSIT_DIR))?;
        Ok(())
    }

    /// The first object found must live where the configured layout puts it.
    fn check_sample_object(&self) -> StorageResult<()> {
        let Some(found) = ObjectRoots::new(&self.root, self.ocfl_version).next() else {
            return Ok(());
        };
        let (path, rel) = found?;
        let object_id = read_object_id(self.inventory_mapper.as_ref(), &path)?;
        check_object_location(self.path_mapper.as_ref(), &object_id, &rel)
    }

    fn load_root_inventory(
        &self,
        object_id: &str,
        rel: &str,
        root: &Path,
    ) -> StorageResult<Inventory> {
        let inventory = read_inventory_with_sidecar(
            self.inventory_mapper.as_ref(),
            root,
            InventoryContext::new(rel),
        )?
        .ok_or_else(|| {
            StorageError::CorruptObject(format!("object root {rel} has no inventory"))
        })?;
        if inventory.id() != object_id {
            return Err(StorageError::CorruptObject(format!(
                "object root {rel} holds object {}, expected {object_id}",
                inventory.id()
            )));
        }
        Ok(inventory)
    }
}

impl OcflStorage for FileSystemOcflStorage {
    fn initialize_storage(&self) -> StorageResult<()> {
        self.lifecycle.initialize(|| self.initialize_root())
    }

    fn load_inventory(&self, object_id: &str) -> StorageResult<Option<Inventory>> {
        self.lifecycle.ensure_open()?;
        let rel = self.rel_path(object_id)?;
        let root = self.object_root(&rel);
        if !is_dir(&root)? {
            return Ok(None);
        }
        debug!(object_id, root = %rel, "loading inventory");

        if let Some(inventory) = self.load_mutable_head_inventory(&rel, &root)? {
            return Ok(Some(inventory));
        }
        self.load_root_inventory(object_id, &rel, &root).map(Some)
    }

    fn store_new_version(&self, inventory: &Inventory, staging_dir: &Path) -> StorageResult<()> {
        self.lifecycle.ensure_open()?;
        if inventory.has_mutable_head() {
            self.store_mutable_head_revision(inventory, staging_dir)
        } else {
            self.store_immutable_version(inventory, staging_dir)
        }
    }

    fn get_object_streams(
        &self,
        inventory: &Inventory,
        version_id: VersionId,
    ) -> StorageResult<BTreeMap<String, FileRetriever>> {
        self.lifecycle.ensure_open()?;
        let root = self.object_root(inventory.object_root_path());
        let algorithm = inventory.digest_algorithm();
        Ok(version_files(inventory, version_id)?
            .into_iter()
            .map(|file| {
                let retriever = FileRetriever::local(
                    join_rel(&root, &file.content_path),
                    algorithm,
                    file.digest,
                );
                (file.logical_path, retriever)
            })
            .collect())
    }

    fn reconstruct_object_version(
        &self,
        inventory: &Inventory,
        version_id: VersionId,
        dest: &Path,
    ) -> StorageResult<()> {
        self.lifecycle.ensure_open()?;
        let files = version_files(inventory, version_id)?;
        debug!(
            object_id = inventory.id(),
            version = %version_id,
            files = files.len(),
            "reconstructing version"
        );

        let root = self.object_root(inventory.object_root_path());
        let object_id = inventory.id().to_string();
        let algorithm = inventory.digest_algorithm();
        let dest = dest.to_path_buf();
        fs::create_dir_all(&dest)?;
        self.parallel.collection(files, move |file, interrupt| {
            let target = logical_target(&dest, &file.logical_path)?;
            let src = File::open(join_rel(&root, &file.content_path))?;
            copy_verified(BufReader::new(src), &target, algorithm, &file.digest, interrupt)
                .map_err(|e| describe_fixity_failure(e, &object_id, &file.logical_path))
        })
    }

    fn retrieve_file(&self, inventory: &Inventory, digest: &str, dest: &Path) -> StorageResult<()> {
        self.lifecycle.ensure_open()?;
        let content_path = inventory.content_path(digest).ok_or_else(|| {
            StorageError::NotFound(format!(
                "digest {digest} is not in the manifest of object {}",
                inventory.id()
            ))
        })?;
        let src = join_rel(&self.object_root(inventory.object_root_path()), content_path);

        let result = File::open(&src).map_err(StorageError::from).and_then(|file| {
            copy_verified(
                BufReader::new(file),
                dest,
                inventory.digest_algorithm(),
                digest,
                &Interrupt::new(),
            )
            .map_err(|e| describe_fixity_failure(e, inventory.id(), content_path))
        });
        if result.is_err() {
            if let Err(e) = remove_path(dest) {
                warn!(dest = %dest.display(), error = %e, "failed to remove partial file");
            }
        }
        result
    }

    fn purge_object(&self, object_id: &str) -> StorageResult<()> {
        self.lifecycle.ensure_open()?;
        let root = self.object_root(&self.rel_path(object_id)?);
        remove_path(&root)?;
        info!(object_id, "purged object");
        Ok(())
    }

    fn commit_mutable_head(
        &self,
        old: &Inventory,
        new: &Inventory,
        staging_dir: &Path,
    ) -> StorageResult<()> {
        self.lifecycle.ensure_open()?;
        self.commit_staged_head(old, new, staging_dir)
    }

    fn purge_mutable_head(&self, object_id: &str) -> StorageResult<()> {
        self.lifecycle.ensure_open()?;
        let root = self.object_root(&self.rel_path(object_id)?);
        remove_path(&join_rel(&root, ObjectPaths::MUTABLE_HEAD_EXT_DIR))?;
        remove_dir_if_empty(&root.join(ObjectPaths::EXTENSIONS_DIR));
        info!(object_id, "purged mutable HEAD");
        Ok(())
    }

    fn contains_object(&self, object_id: &str) -> StorageResult<bool> {
        self.lifecycle.ensure_open()?;
        Ok(is_dir(&self.object_root(&self.rel_path(object_id)?))?)
    }

    fn object_root_path(&self, object_id: &str) -> StorageResult<String> {
        self.lifecycle.ensure_open()?;
        self.rel_path(object_id)
    }

    fn list_object_ids(&self) -> StorageResult<ObjectIdIter<'_>> {
        self.lifecycle.ensure_open()?;
        Ok(Box::new(ObjectIds::new(
            ObjectRoots::new(&self.root, self.ocfl_version),
            Arc::clone(&self.inventory_mapper),
        )))
    }

    fn close(&self) {
        if self.lifecycle.close() {
            self.parallel.shutdown();
        }
    }
}

impl std::fmt::Debug for FileSystemOcflStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSystemOcflStorage")
            .field("root", &self.root)
            .field("ocfl_version", &self.ocfl_version)
            .field("parallel", &self.parallel)
            .finish()
    }
}
