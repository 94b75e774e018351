use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ocfl_inventory::{InventoryMapper, ObjectPaths};
use ocfl_types::OcflVersion;
use walkdir::WalkDir;

use super::files::relative_slash_path;
use crate::declarations::{Namaste, DEPOSIT_DIR};
use crate::error::{StorageError, StorageResult};

/// Walks a storage root yielding each object root as
/// `(absolute path, storage-root-relative path)`.
///
/// `deposit/` and every `extensions/` directory are skipped, and the walk
/// does not descend into object roots.
pub(crate) struct ObjectRoots {
    root: PathBuf,
    marker: String,
    walker: walkdir::IntoIter,
}

impl ObjectRoots {
    pub(crate) fn new(root: &Path, version: OcflVersion) -> Self {
        Self {
            root: root.to_path_buf(),
            marker: Namaste::object_root(version).file_name,
            walker: WalkDir::new(root).min_depth(1).into_iter(),
        }
    }
}

impl Iterator for ObjectRoots {
    type Item = StorageResult<(PathBuf, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(StorageError::Io(e.into()))),
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            let name = entry.file_name();
            if (entry.depth() == 1 && name == DEPOSIT_DIR) || name == ObjectPaths::EXTENSIONS_DIR {
                self.walker.skip_current_dir();
                continue;
            }
            if entry.path().join(&self.marker).is_file() {
                self.walker.skip_current_dir();
                let Some(rel) = relative_slash_path(&self.root, entry.path()) else {
                    return Some(Err(StorageError::CorruptObject(format!(
                        "object root {} is not a UTF-8 path",
                        entry.path().display()
                    ))));
                };
                return Some(Ok((entry.into_path(), rel)));
            }
        }
    }
}

/// Read the id recorded in an object root's inventory.
pub(crate) fn read_object_id(
    mapper: &dyn InventoryMapper,
    object_root: &Path,
) -> StorageResult<String> {
    let path = object_root.join(ObjectPaths::INVENTORY_FILE);
    let bytes = fs::read(&path).map_err(|e| {
        StorageError::CorruptObject(format!("cannot read {}: {e}", path.display()))
    })?;
    Ok(mapper.read_document(&bytes)?.id)
}

/// [`ObjectRoots`] mapped to object ids.
pub(crate) struct ObjectIds {
    roots: ObjectRoots,
    mapper: Arc<dyn InventoryMapper>,
}

impl ObjectIds {
    pub(crate) fn new(roots: ObjectRoots, mapper: Arc<dyn InventoryMapper>) -> Self {
        Self { roots, mapper }
    }
}

impl Iterator for ObjectIds {
    type Item = StorageResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let (path, _) = match self.roots.next()? {
            Ok(found) => found,
            Err(e) => return Some(Err(e)),
        };
        Some(read_object_id(self.mapper.as_ref(), &path))
    }
}
