use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::{InventoryError, InventoryResult};

/// Bidirectional index between digests and the paths that carry them.
///
/// Used for both manifests (digest to content paths) and version states
/// (digest to logical paths). A path belongs to exactly one digest; a digest
/// may be shared by any number of paths. Digests are stored lowercase and
/// looked up case-insensitively.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathBiMap {
    id_to_paths: HashMap<String, BTreeSet<String>>,
    path_to_id: HashMap<String, String>,
}

impl PathBiMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a digest → paths map, rejecting paths listed under two digests.
    pub fn from_id_map<I, P>(map: I) -> InventoryResult<Self>
    where
        I: IntoIterator<Item = (String, P)>,
        P: IntoIterator<Item = String>,
    {
        let mut bimap = Self::new();
        for (id, paths) in map {
            for path in paths {
                bimap.insert(&id, &path)?;
            }
        }
        Ok(bimap)
    }

    /// Associate `path` with `id`.
    ///
    /// Re-inserting an existing pair is a no-op; moving a path to a different
    /// digest is an error.
    pub fn insert(&mut self, id: &str, path: &str) -> InventoryResult<()> {
        let id = id.to_ascii_lowercase();
        if let Some(existing) = self.path_to_id.get(path) {
            if *existing == id {
                return Ok(());
            }
            return Err(InventoryError::InvalidInventory(format!(
                "path {path} is mapped to both {existing} and {id}"
            )));
        }
        self.path_to_id.insert(path.to_string(), id.clone());
        self.id_to_paths.entry(id).or_default().insert(path.to_string());
        Ok(())
    }

    /// Remove a path, returning the digest it was mapped to.
    pub fn remove_path(&mut self, path: &str) -> Option<String> {
        let id = self.path_to_id.remove(path)?;
        if let Some(paths) = self.id_to_paths.get_mut(&id) {
            paths.remove(path);
            if paths.is_empty() {
                self.id_to_paths.remove(&id);
            }
        }
        Some(id)
    }

    /// Remove a digest and every path mapped to it.
    pub fn remove_id(&mut self, id: &str) -> Option<BTreeSet<String>> {
        let paths = self.id_to_paths.remove(&id.to_ascii_lowercase())?;
        for path in &paths {
            self.path_to_id.remove(path);
        }
        Some(paths)
    }

    pub fn id_for_path(&self, path: &str) -> Option<&str> {
        self.path_to_id.get(path).map(String::as_str)
    }

    pub fn paths_for_id(&self, id: &str) -> Option<&BTreeSet<String>> {
        self.id_to_paths.get(&id.to_ascii_lowercase())
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.id_to_paths.contains_key(&id.to_ascii_lowercase())
    }

    pub fn contains_path(&self, path: &str) -> bool {
        self.path_to_id.contains_key(path)
    }

    /// All digests, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.id_to_paths.keys().map(String::as_str)
    }

    /// All `(path, digest)` pairs, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.path_to_id.iter().map(|(p, id)| (p.as_str(), id.as_str()))
    }

    /// Sorted digest → paths view, as written to the wire.
    pub fn to_id_map(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.id_to_paths
            .iter()
            .map(|(id, paths)| (id.clone(), paths.clone()))
            .collect()
    }

    /// Number of paths.
    pub fn len(&self) -> usize {
        self.path_to_id.len()
    }

    /// Number of distinct digests.
    pub fn id_count(&self) -> usize {
        self.id_to_paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path_to_id.is_empty()
    }
}
