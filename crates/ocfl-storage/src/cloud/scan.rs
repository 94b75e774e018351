use std::io::Read;
use std::sync::Arc;

use ocfl_inventory::{join_path, InventoryMapper, ObjectPaths};
use ocfl_types::OcflVersion;

use super::client::{CloudClient, CloudError};
use crate::declarations::{Namaste, DEPOSIT_DIR};
use crate::error::{StorageError, StorageResult};

/// Depth-first walk over key prefixes yielding each object root path.
///
/// A prefix is an object root when it directly contains the object
/// declaration. The walk does not descend into object roots or into
/// `extensions` prefixes.
pub(crate) struct ObjectRoots {
    client: Arc<dyn CloudClient>,
    marker: String,
    pending: Vec<String>,
}

impl ObjectRoots {
    pub(crate) fn new(client: Arc<dyn CloudClient>, version: OcflVersion) -> Self {
        Self {
            client,
            marker: Namaste::object_root(version).file_name,
            pending: vec![String::new()],
        }
    }
}

impl Iterator for ObjectRoots {
    type Item = StorageResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let dir = self.pending.pop()?;
            let listing = match self.client.list_directory(&dir) {
                Ok(listing) => listing,
                Err(e) => return Some(Err(e.into())),
            };
            if listing.objects.iter().any(|o| o.key_suffix == self.marker) {
                return Some(Ok(dir));
            }
            let top_level = dir.is_empty();
            for child in listing.directories.into_iter().rev() {
                let name = child.rsplit('/').next().unwrap_or(child.as_str());
                if name == ObjectPaths::EXTENSIONS_DIR || (top_level && name == DEPOSIT_DIR) {
                    continue;
                }
                self.pending.push(child);
            }
        }
    }
}

pub(crate) fn download_bytes(client: &dyn CloudClient, key: &str) -> Result<Vec<u8>, CloudError> {
    let mut bytes = Vec::new();
    client.download_stream(key)?.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Read the id recorded in the inventory at `object_root`.
pub(crate) fn read_object_id(
    client: &dyn CloudClient,
    mapper: &dyn InventoryMapper,
    object_root: &str,
) -> StorageResult<String> {
    let key = join_path(object_root, ObjectPaths::INVENTORY_FILE);
    let bytes = download_bytes(client, &key).map_err(|e| match e {
        CloudError::KeyNotFound(_) => {
            StorageError::CorruptObject(format!("object root {object_root} has no inventory"))
        }
        other => other.into(),
    })?;
    Ok(mapper.read_document(&bytes)?.id)
}

/// [`ObjectRoots`] mapped to object ids.
pub(crate) struct ObjectIds {
    roots: ObjectRoots,
    client: Arc<dyn CloudClient>,
    mapper: Arc<dyn InventoryMapper>,
}

impl ObjectIds {
    pub(crate) fn new(
        client: Arc<dyn CloudClient>,
        mapper: Arc<dyn InventoryMapper>,
        version: OcflVersion,
    ) -> Self {
        Self {
            roots: ObjectRoots::new(Arc::clone(&client), version),
            client,
            mapper,
        }
    }
}

impl Iterator for ObjectIds {
    type Item = StorageResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let root = match self.roots.next()? {
            Ok(root) => root,
            Err(e) => return Some(Err(e)),
        };
        Some(read_object_id(self.client.as_ref(), self.mapper.as_ref(), &root))
    }
}
