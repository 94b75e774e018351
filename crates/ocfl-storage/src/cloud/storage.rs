use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ocfl_crypto::check_file;
use ocfl_inventory::{
    join_path, parse_sidecar, verify_inventory_digest, Inventory, InventoryContext,
    InventoryDocument, InventoryMapper, JsonInventoryMapper, ObjectPaths,
};
use ocfl_types::{DigestAlgorithm, OcflVersion, RevisionId, VersionId};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use super::client::{CloudClient, CloudError};
use super::scan::{download_bytes, read_object_id, ObjectIds, ObjectRoots};
use crate::config::StorageConfig;
use crate::declarations::{
    check_layout_document, check_object_location, check_root_declaration, layout_document,
    spec_file_content, spec_file_name, Namaste, LAYOUT_FILE,
};
use crate::error::{StorageError, StorageResult};
use crate::fs::join_rel;
use crate::layout::{map_object_root, ObjectIdPathMapper};
use crate::lifecycle::Lifecycle;
use crate::parallel::{Interrupt, ParallelProcess};
use crate::retriever::{
    copy_verified, describe_fixity_failure, logical_target, version_files, FileRetriever,
};
use crate::traits::{ObjectIdIter, OcflStorage};

const TEXT_PLAIN: &str = "text/plain; charset=UTF-8";
const APPLICATION_JSON: &str = "application/json";

/// [`OcflStorage`] on a blob store reached through a [`CloudClient`].
///
/// Blob stores have no atomic directory creation, so a commit is ordered to
/// keep readers safe: content first, then the versioned inventory, then the
/// object-root inventory. Failures delete what the failed call uploaded.
/// Concurrent writers must be serialized by an object lock.
pub struct CloudOcflStorage {
    client: Arc<dyn CloudClient>,
    ocfl_version: OcflVersion,
    path_mapper: Arc<dyn ObjectIdPathMapper>,
    inventory_mapper: Arc<dyn InventoryMapper>,
    parallel: ParallelProcess,
    lifecycle: Lifecycle,
}

impl CloudOcflStorage {
    pub fn new(
        client: Arc<dyn CloudClient>,
        path_mapper: Arc<dyn ObjectIdPathMapper>,
        config: &StorageConfig,
    ) -> StorageResult<Self> {
        config.validate()?;
        Ok(Self {
            client,
            ocfl_version: config.ocfl.ocfl_version(),
            path_mapper,
            inventory_mapper: Arc::new(JsonInventoryMapper::default()),
            parallel: ParallelProcess::new(config.worker_threads)?,
            lifecycle: Lifecycle::new("cloud"),
        })
    }

    pub fn with_inventory_mapper(mut self, mapper: Arc<dyn InventoryMapper>) -> Self {
        self.inventory_mapper = mapper;
        self
    }

    pub fn client(&self) -> &Arc<dyn CloudClient> {
        &self.client
    }

    fn rel_path(&self, object_id: &str) -> StorageResult<String> {
        map_object_root(self.path_mapper.as_ref(), object_id)
    }

    // ----------------------------------------------------------------------
    // Initialization
    // ----------------------------------------------------------------------

    fn initialize_root(&self) -> StorageResult<()> {
        let listing = self.client.list_directory("")?;
        if listing.is_empty() {
            let namaste = Namaste::storage_root(self.ocfl_version);
            self.client
                .upload_bytes(&namaste.file_name, namaste.content.as_bytes(), TEXT_PLAIN)?;
            self.client.upload_bytes(
                &spec_file_name(self.ocfl_version),
                spec_file_content(self.ocfl_version).as_bytes(),
                TEXT_PLAIN,
            )?;
            self.client.upload_bytes(
                LAYOUT_FILE,
                &layout_document(self.path_mapper.as_ref())?,
                APPLICATION_JSON,
            )?;
            info!("created cloud storage root");
            return Ok(());
        }

        check_root_declaration(
            listing.objects.iter().map(|o| o.key_suffix.as_str()),
            self.ocfl_version,
        )?;
        match download_bytes(self.client.as_ref(), LAYOUT_FILE) {
            Ok(bytes) => check_layout_document(&bytes, self.path_mapper.as_ref())?,
            Err(CloudError::KeyNotFound(_)) => warn!("cloud storage root has no layout document"),
            Err(e) => return Err(e.into()),
        }

        if let Some(found) = ObjectRoots::new(Arc::clone(&self.client), self.ocfl_version).next() {
            let rel = found?;
            let object_id =
                read_object_id(self.client.as_ref(), self.inventory_mapper.as_ref(), &rel)?;
            check_object_location(self.path_mapper.as_ref(), &object_id, &rel)?;
        }
        Ok(())
    }

    // ----------------------------------------------------------------------
    // Inventory reads
    // ----------------------------------------------------------------------

    /// Download the inventory under `dir` and verify it against its sidecar.
    /// `None` when there is no inventory.
    fn read_verified_document(&self, dir: &str) -> StorageResult<Option<InventoryDocument>> {
        let bytes = match download_bytes(
            self.client.as_ref(),
            &join_path(dir, ObjectPaths::INVENTORY_FILE),
        ) {
            Ok(bytes) => bytes,
            Err(CloudError::KeyNotFound(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let document = self.inventory_mapper.read_document(&bytes)?;
        let algorithm = document.digest_algorithm;
        let sidecar_key = join_path(dir, &ObjectPaths::sidecar_name(algorithm));
        let sidecar = self.download_sidecar(&sidecar_key)?;
        verify_inventory_digest(&bytes, algorithm, &sidecar)?;
        Ok(Some(document))
    }

    fn download_sidecar(&self, key: &str) -> StorageResult<String> {
        match self.client.download_string(key) {
            Ok(text) => Ok(parse_sidecar(&text)?),
            Err(CloudError::KeyNotFound(_)) => Err(StorageError::CorruptObject(format!(
                "missing inventory sidecar {key}"
            ))),
            Err(e) => Err(e.into()),
        }
    }

    fn latest_revision(&self, object_root: &str) -> StorageResult<Option<RevisionId>> {
        let listing = self
            .client
            .list_directory(&join_path(object_root, ObjectPaths::MUTABLE_HEAD_REVISIONS_DIR))?;
        let mut latest = None;
        for object in &listing.objects {
            match object.key_suffix.parse::<RevisionId>() {
                Ok(revision) => latest = latest.max(Some(revision)),
                Err(_) => warn!(key = %object.key, "ignoring unexpected revision marker"),
            }
        }
        Ok(latest)
    }

    fn ensure_root_unchanged(
        &self,
        object_root: &str,
        algorithm: DigestAlgorithm,
    ) -> StorageResult<()> {
        let backup = join_path(object_root, &ObjectPaths::root_sidecar_backup(algorithm));
        let saved = self.download_sidecar(&backup)?;
        let current =
            self.download_sidecar(&join_path(object_root, &ObjectPaths::sidecar_name(algorithm)))?;
        if saved != current {
            return Err(StorageError::OutOfSync(format!(
                "object root {object_root} changed since its mutable HEAD was created"
            )));
        }
        Ok(())
    }

    fn load_mutable_head_inventory(&self, object_root: &str) -> StorageResult<Option<Inventory>> {
        let head = join_path(object_root, ObjectPaths::MUTABLE_HEAD_DIR);
        let Some(document) = self.read_verified_document(&head)? else {
            return Ok(None);
        };
        let revision = self.latest_revision(object_root)?.ok_or_else(|| {
            StorageError::CorruptObject(format!(
                "mutable HEAD of {object_root} has no revision markers"
            ))
        })?;
        let inventory = document.hydrate(InventoryContext::mutable_head(object_root, revision))?;
        self.ensure_root_unchanged(object_root, inventory.digest_algorithm())?;
        Ok(Some(inventory))
    }

    // ----------------------------------------------------------------------
    // Commit building blocks
    // ----------------------------------------------------------------------

    fn ensure_no_mutable_head(&self, inventory: &Inventory) -> StorageResult<()> {
        let head = join_path(inventory.object_root_path(), ObjectPaths::MUTABLE_HEAD_DIR);
        if !self.client.list_directory(&head)?.objects.is_empty() {
            return Err(StorageError::IllegalState(format!(
                "object {} has an active mutable HEAD; commit or purge it before adding a version",
                inventory.id()
            )));
        }
        Ok(())
    }

    fn ensure_version_does_not_exist(
        &self,
        inventory: &Inventory,
        version: VersionId,
    ) -> StorageResult<()> {
        let path = join_path(inventory.object_root_path(), &version.to_string());
        if !self.client.list(&path)?.objects.is_empty() {
            return Err(StorageError::OutOfSync(format!(
                "object {} version {version} already exists",
                inventory.id()
            )));
        }
        Ok(())
    }

    /// Verify and upload every content file under `prefix/` from the staging
    /// directory. `staged_base` is the content-path prefix that the staging
    /// directory stands in for. On failure the uploaded keys are deleted.
    fn upload_content(
        &self,
        inventory: &Inventory,
        staging_dir: &Path,
        prefix: &str,
        staged_base: &str,
    ) -> StorageResult<Vec<String>> {
        let strip = format!("{}/", staged_base.trim_end_matches('/'));
        let mut items: Vec<(PathBuf, String, String, String)> = Vec::new();
        for (content_path, digest) in inventory.content_paths_under_prefix(prefix) {
            let staged = content_path.strip_prefix(&strip).ok_or_else(|| {
                StorageError::IllegalState(format!(
                    "content path {content_path} is not under {staged_base}"
                ))
            })?;
            items.push((
                join_rel(staging_dir, staged),
                join_path(inventory.object_root_path(), &content_path),
                digest,
                content_path.clone(),
            ));
        }
        debug!(object_id = inventory.id(), files = items.len(), "uploading content");

        let uploaded = Arc::new(Mutex::new(Vec::new()));
        let client = Arc::clone(&self.client);
        let object_id = inventory.id().to_string();
        let algorithm = inventory.digest_algorithm();
        let tracker = Arc::clone(&uploaded);
        let result = self.parallel.collection(items, move |(file, key, digest, content_path), _| {
            check_file(&file, algorithm, &digest)
                .map_err(|e| describe_fixity_failure(e, &object_id, &content_path))?;
            client.upload_file(&file, &key)?;
            tracker.lock().push(key);
            Ok(())
        });

        let uploaded = std::mem::take(&mut *uploaded.lock());
        if let Err(e) = result {
            self.client.safe_delete_objects(&uploaded);
            return Err(e);
        }
        Ok(uploaded)
    }

    /// Upload the inventory and sidecar from `staging_dir` into the head
    /// version directory, then copy them over the object-root inventory.
    fn store_inventory_with_rollback(
        &self,
        inventory: &Inventory,
        staging_dir: &Path,
    ) -> StorageResult<()> {
        let root = inventory.object_root_path();
        let version_path = join_path(root, &inventory.head().to_string());
        let names = [
            ObjectPaths::INVENTORY_FILE.to_string(),
            ObjectPaths::sidecar_name(inventory.digest_algorithm()),
        ];
        let versioned: Vec<String> = names.iter().map(|n| join_path(&version_path, n)).collect();

        for (name, key) in names.iter().zip(&versioned) {
            if let Err(e) = self.client.upload_file(&staging_dir.join(name), key) {
                self.client.safe_delete_objects(&versioned);
                return Err(e.into());
            }
        }

        for (name, key) in names.iter().zip(&versioned) {
            if let Err(e) = self.client.copy_object(key, &join_path(root, name)) {
                self.rollback_root_inventory(inventory);
                self.client.safe_delete_objects(&versioned);
                return Err(e.into());
            }
        }
        Ok(())
    }

    /// Point the object root back at the version before `inventory`'s head,
    /// or remove the root inventory when there is none.
    fn rollback_root_inventory(&self, inventory: &Inventory) {
        let root = inventory.object_root_path();
        let names = [
            ObjectPaths::INVENTORY_FILE.to_string(),
            ObjectPaths::sidecar_name(inventory.digest_algorithm()),
        ];
        match inventory.head().previous() {
            Ok(previous) if inventory.versions().len() > 1 => {
                let previous_path = join_path(root, &previous.to_string());
                for name in &names {
                    if let Err(e) = self
                        .client
                        .copy_object(&join_path(&previous_path, name), &join_path(root, name))
                    {
                        error!(
                            object_id = inventory.id(),
                            version = %previous,
                            error = %e,
                            "failed to restore object root inventory during rollback"
                        );
                    }
                }
            }
            _ => {
                let keys: Vec<String> = names.iter().map(|n| join_path(root, n)).collect();
                self.client.safe_delete_objects(&keys);
            }
        }
    }

    // ----------------------------------------------------------------------
    // Commits
    // ----------------------------------------------------------------------

    fn store_immutable_version(
        &self,
        inventory: &Inventory,
        staging_dir: &Path,
    ) -> StorageResult<()> {
        let object_id = inventory.id();
        let version = inventory.head();
        debug!(object_id, version = %version, "storing new version");

        self.ensure_no_mutable_head(inventory)?;
        self.ensure_version_does_not_exist(inventory, version)?;

        let mut namaste_keys = Vec::new();
        if inventory.versions().len() == 1 {
            let namaste = Namaste::object_root(inventory.inventory_type().ocfl_version());
            let key = join_path(inventory.object_root_path(), &namaste.file_name);
            self.client
                .upload_bytes(&key, namaste.content.as_bytes(), TEXT_PLAIN)?;
            namaste_keys.push(key);
        }

        let version_prefix = version.to_string();
        let content_keys =
            match self.upload_content(inventory, staging_dir, &version_prefix, &version_prefix) {
                Ok(keys) => keys,
                Err(e) => {
                    self.client.safe_delete_objects(&namaste_keys);
                    return Err(e);
                }
            };

        if let Err(e) = self.store_inventory_with_rollback(inventory, staging_dir) {
            self.client.safe_delete_objects(&content_keys);
            self.client.safe_delete_objects(&namaste_keys);
            return Err(e);
        }
        info!(object_id, version = %version, "committed version");
        Ok(())
    }

    fn store_mutable_head_revision(
        &self,
        inventory: &Inventory,
        staging_dir: &Path,
    ) -> StorageResult<()> {
        let object_id = inventory.id();
        let root = inventory.object_root_path();
        let revision = inventory.revision_id().ok_or_else(|| {
            StorageError::IllegalState(format!("inventory of {object_id} has no revision id"))
        })?;
        debug!(object_id, revision = %revision, "staging mutable HEAD revision");

        let root_listing = self.client.list_directory(root)?;
        if !root_listing
            .objects
            .iter()
            .any(|o| o.key_suffix == ObjectPaths::INVENTORY_FILE)
        {
            return Err(StorageError::IllegalState(format!(
                "object {object_id} needs a committed version before it can have a mutable HEAD"
            )));
        }
        if let Some(latest) = self.latest_revision(root)? {
            if latest >= revision {
                return Err(StorageError::OutOfSync(format!(
                    "object {object_id} mutable HEAD is already at {latest}, cannot write {revision}"
                )));
            }
        }

        let mut cleanup = Vec::new();
        if let Err(e) = self.stage_revision(inventory, revision, staging_dir, &mut cleanup) {
            self.client.safe_delete_objects(&cleanup);
            return Err(e);
        }

        self.prune_head_content(inventory);
        info!(object_id, revision = %revision, "staged mutable HEAD revision");
        Ok(())
    }

    fn stage_revision(
        &self,
        inventory: &Inventory,
        revision: RevisionId,
        staging_dir: &Path,
        cleanup: &mut Vec<String>,
    ) -> StorageResult<()> {
        let root = inventory.object_root_path();
        let algorithm = inventory.digest_algorithm();

        let extension = join_path(root, ObjectPaths::MUTABLE_HEAD_EXT_DIR);
        if self.client.list_directory(&extension)?.objects.is_empty() {
            let backup = join_path(root, &ObjectPaths::root_sidecar_backup(algorithm));
            self.client
                .copy_object(&join_path(root, &ObjectPaths::sidecar_name(algorithm)), &backup)?;
            cleanup.push(backup);
        } else {
            self.ensure_root_unchanged(root, algorithm)?;
        }

        let marker = join_path(root, &ObjectPaths::revision_marker(revision));
        self.client
            .upload_bytes(&marker, revision.to_string().as_bytes(), TEXT_PLAIN)?;
        cleanup.push(marker);

        let prefix =
            ObjectPaths::mutable_head_revision_dir(inventory.resolve_content_directory(), revision);
        let keys =
            self.upload_content(inventory, staging_dir, &prefix, ObjectPaths::MUTABLE_HEAD_DIR)?;
        cleanup.extend(keys);

        let head = join_path(root, ObjectPaths::MUTABLE_HEAD_DIR);
        for name in [
            ObjectPaths::INVENTORY_FILE.to_string(),
            ObjectPaths::sidecar_name(algorithm),
        ] {
            self.client
                .upload_file(&staging_dir.join(&name), &join_path(&head, &name))?;
        }
        Ok(())
    }

    /// Delete mutable HEAD content objects the inventory no longer references.
    fn prune_head_content(&self, inventory: &Inventory) {
        let root = inventory.object_root_path();
        let content_root = join_path(
            root,
            &ObjectPaths::mutable_head_content_dir(inventory.resolve_content_directory()),
        );
        let listing = match self.client.list(&content_root) {
            Ok(listing) => listing,
            Err(e) => {
                warn!(
                    object_id = inventory.id(),
                    error = %e,
                    "failed to list head content for pruning"
                );
                return;
            }
        };
        let root_prefix = format!("{}/", root.trim_end_matches('/'));
        let stale: Vec<String> = listing
            .objects
            .into_iter()
            .filter(|o| {
                let content_path = o.key.strip_prefix(&root_prefix).unwrap_or(&o.key);
                inventory.digest_for_content_path(content_path).is_none()
            })
            .map(|o| o.key)
            .collect();
        if !stale.is_empty() {
            debug!(object_id = inventory.id(), count = stale.len(), "pruning head content");
            self.client.safe_delete_objects(&stale);
        }
    }

    fn commit_staged_head(
        &self,
        old: &Inventory,
        new: &Inventory,
        staging_dir: &Path,
    ) -> StorageResult<()> {
        let object_id = new.id();
        let root = new.object_root_path();
        let version = new.head();
        debug!(object_id, version = %version, "committing mutable HEAD");

        self.ensure_root_unchanged(root, old.digest_algorithm())?;
        let head = join_path(root, ObjectPaths::MUTABLE_HEAD_DIR);
        if self.client.list_directory(&head)?.objects.is_empty() {
            return Err(StorageError::OutOfSync(format!(
                "object {object_id} has no mutable HEAD to commit"
            )));
        }
        self.ensure_version_does_not_exist(new, version)?;

        let mut copies = Vec::new();
        for (content_path, digest) in new.content_paths_under_prefix(&version.to_string()) {
            let source = ObjectPaths::version_to_mutable_head(&content_path, version)
                .filter(|head_path| old.digest_for_content_path(head_path).is_some())
                .or_else(|| old.content_path(&digest).map(str::to_string))
                .ok_or_else(|| {
                    StorageError::CorruptObject(format!(
                        "object {object_id} has no staged content for {content_path}"
                    ))
                })?;
            copies.push((join_path(root, &source), join_path(root, &content_path)));
        }

        let copied = Arc::new(Mutex::new(Vec::new()));
        let client = Arc::clone(&self.client);
        let tracker = Arc::clone(&copied);
        let result = self.parallel.collection(copies, move |(src, dst): (String, String), _| {
            client.copy_object(&src, &dst)?;
            tracker.lock().push(dst);
            Ok(())
        });
        let copied = std::mem::take(&mut *copied.lock());
        if let Err(e) = result.and_then(|()| self.store_inventory_with_rollback(new, staging_dir)) {
            self.client.safe_delete_objects(&copied);
            return Err(e);
        }

        let extension = join_path(root, ObjectPaths::MUTABLE_HEAD_EXT_DIR);
        if let Err(e) = self.client.delete_path(&extension) {
            error!(object_id, error = %e, "failed to remove mutable HEAD after commit");
            match self.client.list(&extension) {
                Ok(listing) => {
                    let leftovers: Vec<String> =
                        listing.objects.into_iter().map(|o| o.key).collect();
                    self.client.safe_delete_objects(&leftovers);
                }
                Err(e) => warn!(object_id, error = %e, "failed to list mutable HEAD leftovers"),
            }
        }
        info!(object_id, version = %version, "committed mutable HEAD");
        Ok(())
    }
}

impl OcflStorage for CloudOcflStorage {
    fn initialize_storage(&self) -> StorageResult<()> {
        self.lifecycle.initialize(|| self.initialize_root())
    }

    fn load_inventory(&self, object_id: &str) -> StorageResult<Option<Inventory>> {
        self.lifecycle.ensure_open()?;
        let root = self.rel_path(object_id)?;
        debug!(object_id, root = %root, "loading inventory");

        if let Some(inventory) = self.load_mutable_head_inventory(&root)? {
            return Ok(Some(inventory));
        }
        let Some(document) = self.read_verified_document(&root)? else {
            return Ok(None);
        };
        let inventory = document.hydrate(InventoryContext::new(root.as_str()))?;
        if inventory.id() != object_id {
            return Err(StorageError::CorruptObject(format!(
                "object root {root} holds object {}, expected {object_id}",
                inventory.id()
            )));
        }
        Ok(Some(inventory))
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
        let algorithm = inventory.digest_algorithm();
        Ok(version_files(inventory, version_id)?
            .into_iter()
            .map(|file| {
                let key = join_path(inventory.object_root_path(), &file.content_path);
                let retriever =
                    FileRetriever::cloud(Arc::clone(&self.client), key, algorithm, file.digest);
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

        let client = Arc::clone(&self.client);
        let root = inventory.object_root_path().to_string();
        let object_id = inventory.id().to_string();
        let algorithm = inventory.digest_algorithm();
        let dest = dest.to_path_buf();
        std::fs::create_dir_all(&dest)?;
        self.parallel.collection(files, move |file, interrupt| {
            let target = logical_target(&dest, &file.logical_path)?;
            let stream = client.download_stream(&join_path(&root, &file.content_path))?;
            copy_verified(stream, &target, algorithm, &file.digest, interrupt)
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
        let key = join_path(inventory.object_root_path(), content_path);

        let result = self
            .client
            .download_stream(&key)
            .map_err(StorageError::from)
            .and_then(|stream| {
                copy_verified(stream, dest, inventory.digest_algorithm(), digest, &Interrupt::new())
                    .map_err(|e| describe_fixity_failure(e, inventory.id(), content_path))
            });
        if result.is_err() {
            if let Err(e) = crate::fs::remove_path(dest) {
                warn!(dest = %dest.display(), error = %e, "failed to remove partial file");
            }
        }
        result
    }

    fn purge_object(&self, object_id: &str) -> StorageResult<()> {
        self.lifecycle.ensure_open()?;
        self.client.delete_path(&self.rel_path(object_id)?)?;
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
        let root = self.rel_path(object_id)?;
        self.client
            .delete_path(&join_path(&root, ObjectPaths::MUTABLE_HEAD_EXT_DIR))?;
        info!(object_id, "purged mutable HEAD");
        Ok(())
    }

    fn contains_object(&self, object_id: &str) -> StorageResult<bool> {
        self.lifecycle.ensure_open()?;
        let listing = self.client.list_directory(&self.rel_path(object_id)?)?;
        Ok(!listing.objects.is_empty())
    }

    fn object_root_path(&self, object_id: &str) -> StorageResult<String> {
        self.lifecycle.ensure_open()?;
        self.rel_path(object_id)
    }

    fn list_object_ids(&self) -> StorageResult<ObjectIdIter<'_>> {
        self.lifecycle.ensure_open()?;
        Ok(Box::new(ObjectIds::new(
            Arc::clone(&self.client),
            Arc::clone(&self.inventory_mapper),
            self.ocfl_version,
        )))
    }

    fn close(&self) {
        if self.lifecycle.close() {
            self.parallel.shutdown();
        }
    }
}

impl std::fmt::Debug for CloudOcflStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudOcflStorage")
            .field("ocfl_version", &self.ocfl_version)
            .field("parallel", &self.parallel)
            .finish()
    }
}
