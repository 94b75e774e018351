use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use ocfl_inventory::{
    parse_sidecar, read_inventory_with_sidecar, read_sidecar_digest, Inventory, InventoryContext,
    ObjectPaths,
};
use ocfl_types::{DigestAlgorithm, RevisionId};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use super::files::{
    install_inventory, is_dir, join_rel, move_path, relative_slash_path, remove_dir_if_empty,
    remove_path,
};
use super::FileSystemOcflStorage;
use crate::error::{StorageError, StorageResult};

/// Absolute paths of one object's mutable HEAD extension.
struct HeadPaths {
    root: PathBuf,
    extension: PathBuf,
    head: PathBuf,
    revisions: PathBuf,
}

impl HeadPaths {
    fn new(root: PathBuf) -> Self {
        Self {
            extension: join_rel(&root, ObjectPaths::MUTABLE_HEAD_EXT_DIR),
            head: join_rel(&root, ObjectPaths::MUTABLE_HEAD_DIR),
            revisions: join_rel(&root, ObjectPaths::MUTABLE_HEAD_REVISIONS_DIR),
            root,
        }
    }

    fn root_sidecar_backup(&self, algorithm: DigestAlgorithm) -> PathBuf {
        join_rel(&self.root, &ObjectPaths::root_sidecar_backup(algorithm))
    }
}

/// Highest revision marker in `dir`, or `None` when there are none.
fn latest_revision(dir: &Path) -> StorageResult<Option<RevisionId>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut latest = None;
    for entry in entries {
        let name = entry?.file_name();
        match name.to_str().map(str::parse::<RevisionId>) {
            Some(Ok(revision)) => latest = latest.max(Some(revision)),
            _ => warn!(
                dir = %dir.display(),
                entry = ?name,
                "ignoring unexpected entry in revisions directory"
            ),
        }
    }
    Ok(latest)
}

/// The object root inventory must still be the one the mutable HEAD was
/// started from.
fn ensure_root_unchanged(paths: &HeadPaths, algorithm: DigestAlgorithm) -> StorageResult<()> {
    let backup = paths.root_sidecar_backup(algorithm);
    let saved = fs::read_to_string(&backup).map_err(|e| {
        StorageError::CorruptObject(format!("cannot read {}: {e}", backup.display()))
    })?;
    let saved = parse_sidecar(&saved)?;
    let current = read_sidecar_digest(&paths.root, algorithm)?;
    if saved != current {
        return Err(StorageError::OutOfSync(format!(
            "object root {} changed since its mutable HEAD was created",
            paths.root.display()
        )));
    }
    Ok(())
}

impl FileSystemOcflStorage {
    pub(super) fn load_mutable_head_inventory(
        &self,
        rel: &str,
        root: &Path,
    ) -> StorageResult<Option<Inventory>> {
        let paths = HeadPaths::new(root.to_path_buf());
        if !paths.head.join(ObjectPaths::INVENTORY_FILE).is_file() {
            return Ok(None);
        }
        let revision = latest_revision(&paths.revisions)?.ok_or_else(|| {
            StorageError::CorruptObject(format!("mutable HEAD of {rel} has no revision markers"))
        })?;
        let Some(inventory) = read_inventory_with_sidecar(
            self.inventory_mapper.as_ref(),
            &paths.head,
            InventoryContext::mutable_head(rel, revision),
        )?
        else {
            return Ok(None);
        };
        ensure_root_unchanged(&paths, inventory.digest_algorithm())?;
        Ok(Some(inventory))
    }

    pub(super) fn store_mutable_head_revision(
        &self,
        inventory: &Inventory,
        staging_dir: &Path,
    ) -> StorageResult<()> {
        let object_id = inventory.id();
        let revision = inventory.revision_id().ok_or_else(|| {
            StorageError::IllegalState(format!("inventory of {object_id} has no revision id"))
        })?;
        let paths = HeadPaths::new(self.object_root(inventory.object_root_path()));
        debug!(object_id, revision = %revision, "staging mutable HEAD revision");

        if !paths.root.join(ObjectPaths::INVENTORY_FILE).is_file() {
            return Err(StorageError::IllegalState(format!(
                "object {object_id} needs a committed version before it can have a mutable HEAD"
            )));
        }
        if let Some(latest) = latest_revision(&paths.revisions)? {
            if latest >= revision {
                return Err(StorageError::OutOfSync(format!(
                    "object {object_id} mutable HEAD is already at {latest}, cannot write {revision}"
                )));
            }
        }

        let created_extension = !is_dir(&paths.extension)?;
        let mut created = Vec::new();
        let result = self.stage_revision(
            inventory,
            revision,
            staging_dir,
            &paths,
            created_extension,
            &mut created,
        );

        if let Err(e) = result {
            let cleanup = if created_extension {
                vec![paths.extension.clone()]
            } else {
                created
            };
            for path in cleanup {
                if let Err(cleanup_err) = remove_path(&path) {
                    error!(
                        object_id,
                        path = %path.display(),
                        error = %cleanup_err,
                        "failed to clean up after mutable HEAD failure"
                    );
                }
            }
            if created_extension {
                remove_dir_if_empty(&paths.root.join(ObjectPaths::EXTENSIONS_DIR));
            }
            return Err(e);
        }

        self.prune_head_content(inventory, &paths);
        info!(object_id, revision = %revision, "staged mutable HEAD revision");
        Ok(())
    }

    fn stage_revision(
        &self,
        inventory: &Inventory,
        revision: RevisionId,
        staging_dir: &Path,
        paths: &HeadPaths,
        created_extension: bool,
        created: &mut Vec<PathBuf>,
    ) -> StorageResult<()> {
        let algorithm = inventory.digest_algorithm();
        if created_extension {
            fs::create_dir_all(&paths.revisions)?;
            fs::copy(
                paths.root.join(ObjectPaths::sidecar_name(algorithm)),
                paths.root_sidecar_backup(algorithm),
            )?;
        } else {
            ensure_root_unchanged(paths, algorithm)?;
            fs::create_dir_all(&paths.revisions)?;
        }

        let marker = paths.revisions.join(revision.to_string());
        match OpenOptions::new().write(true).create_new(true).open(&marker) {
            Ok(mut file) => {
                created.push(marker);
                file.write_all(revision.to_string().as_bytes())?;
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(StorageError::OutOfSync(format!(
                    "object {} revision {revision} already exists",
                    inventory.id()
                )));
            }
            Err(e) => return Err(e.into()),
        }

        let content_dir = inventory.resolve_content_directory();
        let revision_content = ObjectPaths::mutable_head_revision_dir(content_dir, revision);
        let staged = join_rel(staging_dir, &format!("{content_dir}/{revision}"));
        if is_dir(&staged)? {
            let target = join_rel(&paths.root, &revision_content);
            if target.exists() {
                return Err(StorageError::OutOfSync(format!(
                    "object {} already has content for revision {revision}",
                    inventory.id()
                )));
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            created.push(target.clone());
            move_path(&staged, &target)?;
        }

        self.verify_fixity(inventory, &paths.root, &revision_content)?;
        fs::create_dir_all(&paths.head)?;
        install_inventory(staging_dir, &paths.head, algorithm)?;
        Ok(())
    }

    /// Delete mutable HEAD content files the inventory no longer references.
    fn prune_head_content(&self, inventory: &Inventory, paths: &HeadPaths) {
        let content_root = join_rel(
            &paths.root,
            &ObjectPaths::mutable_head_content_dir(inventory.resolve_content_directory()),
        );
        for entry in WalkDir::new(&content_root).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(content_path) = relative_slash_path(&paths.root, entry.path()) else {
                continue;
            };
            if inventory.digest_for_content_path(&content_path).is_some() {
                continue;
            }
            match fs::remove_file(entry.path()) {
                Ok(()) => debug!(
                    object_id = inventory.id(),
                    path = %content_path,
                    "pruned head content"
                ),
                Err(e) => warn!(
                    object_id = inventory.id(),
                    path = %content_path,
                    error = %e,
                    "failed to prune head content"
                ),
            }
        }
    }

    pub(super) fn commit_staged_head(
        &self,
        old: &Inventory,
        new: &Inventory,
        staging_dir: &Path,
    ) -> StorageResult<()> {
        let object_id = new.id();
        let version = new.head();
        let paths = HeadPaths::new(self.object_root(new.object_root_path()));
        debug!(object_id, version = %version, "committing mutable HEAD");

        if !paths.head.join(ObjectPaths::INVENTORY_FILE).is_file() {
            return Err(StorageError::OutOfSync(format!(
                "object {object_id} has no mutable HEAD to commit"
            )));
        }
        ensure_root_unchanged(&paths, old.digest_algorithm())?;

        let version_dir = paths.root.join(version.to_string());
        match fs::create_dir(&version_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(StorageError::OutOfSync(format!(
                    "object {object_id} version {version} already exists"
                )));
            }
            Err(e) => return Err(e.into()),
        }

        if let Err(e) = self.install_head_version(old, new, staging_dir, &paths, &version_dir) {
            self.rollback_version(new, &paths.root, &version_dir, false);
            return Err(e);
        }

        if let Err(e) = remove_path(&paths.extension) {
            error!(object_id, error = %e, "failed to remove mutable HEAD after commit");
        }
        remove_dir_if_empty(&paths.root.join(ObjectPaths::EXTENSIONS_DIR));
        info!(object_id, version = %version, "committed mutable HEAD");
        Ok(())
    }

    /// Copy head content into the new version directory, then publish the
    /// inventory. The head area is left untouched.
    fn install_head_version(
        &self,
        old: &Inventory,
        new: &Inventory,
        staging_dir: &Path,
        paths: &HeadPaths,
        version_dir: &Path,
    ) -> StorageResult<()> {
        let version = new.head();
        let mut copies = Vec::new();
        for (content_path, digest) in new.content_paths_under_prefix(&version.to_string()) {
            let source = ObjectPaths::version_to_mutable_head(&content_path, version)
                .filter(|head_path| old.digest_for_content_path(head_path).is_some())
                .or_else(|| old.content_path(&digest).map(str::to_string))
                .ok_or_else(|| {
                    StorageError::CorruptObject(format!(
                        "object {} has no staged content for {content_path}",
                        new.id()
                    ))
                })?;
            copies.push((join_rel(&paths.root, &source), join_rel(&paths.root, &content_path)));
        }

        self.parallel.collection(copies, |(src, dst): (PathBuf, PathBuf), _| {
            if let Some(parent) = dst.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&src, &dst)?;
            Ok(())
        })?;

        self.verify_fixity(new, &paths.root, &version.to_string())?;
        install_inventory(staging_dir, version_dir, new.digest_algorithm())?;
        install_inventory(version_dir, &paths.root, new.digest_algorithm())?;
        Ok(())
    }
}
