use std::collections::{BTreeMap, BTreeSet};

use ocfl_types::{DigestAlgorithm, InventoryType, RevisionId, VersionId};

use crate::bimap::PathBiMap;
use crate::config::{validate_content_directory, validate_digest_algorithm, OcflConfig};
use crate::error::{InventoryError, InventoryResult};
use crate::paths::{join_path, ObjectPaths};
use crate::version::Version;

/// The immutable description of one OCFL object at a point in time.
///
/// Instances are only created through [`InventoryBuilder::build`],
/// [`Inventory::stub`] or by hydrating an
/// [`InventoryDocument`](crate::InventoryDocument), all of which validate
/// every invariant. A new inventory is built for each version.
///
/// While a mutable HEAD is active, `head` names the version the staged edit
/// will become and `revision_id` tells successive edits apart.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inventory {
    pub(crate) id: String,
    pub(crate) inventory_type: InventoryType,
    pub(crate) digest_algorithm: DigestAlgorithm,
    pub(crate) head: VersionId,
    pub(crate) content_directory: Option<String>,
    pub(crate) fixity: BTreeMap<DigestAlgorithm, PathBiMap>,
    /// Fixity blocks for algorithms with no digest provider, keyed by the
    /// recorded algorithm name. Carried from version to version untouched.
    pub(crate) opaque_fixity: BTreeMap<String, PathBiMap>,
    pub(crate) manifest: PathBiMap,
    pub(crate) versions: BTreeMap<VersionId, Version>,
    pub(crate) mutable_head: bool,
    pub(crate) revision_id: Option<RevisionId>,
    pub(crate) object_root_path: String,
}

impl Inventory {
    /// An inventory for an object that has no versions yet. Never persisted.
    pub fn stub(
        id: impl Into<String>,
        config: &OcflConfig,
        object_root_path: impl Into<String>,
    ) -> InventoryResult<Self> {
        InventoryBuilder::new()
            .id(id)
            .inventory_type(config.ocfl_version().inventory_type())
            .digest_algorithm(config.default_digest_algorithm())
            .content_directory(config.default_content_directory())
            .object_root_path(object_root_path)
            .build()
    }

    pub fn builder() -> InventoryBuilder {
        InventoryBuilder::new()
    }

    /// A builder seeded with every field of this inventory.
    pub fn to_builder(&self) -> InventoryBuilder {
        InventoryBuilder::from_inventory(self)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn inventory_type(&self) -> InventoryType {
        self.inventory_type
    }

    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.digest_algorithm
    }

    pub fn head(&self) -> VersionId {
        self.head
    }

    /// The content directory as recorded, which may be unset.
    pub fn content_directory(&self) -> Option<&str> {
        self.content_directory.as_deref()
    }

    /// The content directory, falling back to `content`.
    pub fn resolve_content_directory(&self) -> &str {
        self.content_directory
            .as_deref()
            .unwrap_or(ObjectPaths::DEFAULT_CONTENT_DIRECTORY)
    }

    pub fn manifest(&self) -> &PathBiMap {
        &self.manifest
    }

    pub fn fixity(&self) -> &BTreeMap<DigestAlgorithm, PathBiMap> {
        &self.fixity
    }

    /// Fixity blocks whose algorithm this crate cannot compute, e.g. `md5`.
    pub fn opaque_fixity(&self) -> &BTreeMap<String, PathBiMap> {
        &self.opaque_fixity
    }

    pub fn versions(&self) -> &BTreeMap<VersionId, Version> {
        &self.versions
    }

    pub fn version(&self, version_id: VersionId) -> Option<&Version> {
        self.versions.get(&version_id)
    }

    /// The version named by `head`, absent for stubs.
    pub fn head_version(&self) -> Option<&Version> {
        self.versions.get(&self.head)
    }

    /// Look up a version, failing with `NotFound` when it does not exist.
    pub fn ensure_version(&self, version_id: VersionId) -> InventoryResult<&Version> {
        self.versions.get(&version_id).ok_or_else(|| {
            InventoryError::NotFound(format!("object {} has no version {version_id}", self.id))
        })
    }

    pub fn has_mutable_head(&self) -> bool {
        self.mutable_head
    }

    pub fn revision_id(&self) -> Option<RevisionId> {
        self.revision_id
    }

    /// Path from the storage root to the object root.
    pub fn object_root_path(&self) -> &str {
        &self.object_root_path
    }

    /// `true` for stubs of objects that do not exist yet.
    pub fn is_stub(&self) -> bool {
        self.versions.is_empty()
    }

    /// The id the next committed version receives. While a mutable HEAD is
    /// active this is the current head.
    pub fn next_version_id(&self) -> InventoryResult<VersionId> {
        if self.mutable_head {
            return Ok(self.head);
        }
        Ok(self.head.next()?)
    }

    /// `r1` when no mutable HEAD is active, else the successor of the current revision.
    pub fn next_revision_id(&self) -> InventoryResult<RevisionId> {
        match self.revision_id {
            None => Ok(RevisionId::R1),
            Some(revision) => Ok(revision.next()?),
        }
    }

    pub fn manifest_contains(&self, digest: &str) -> bool {
        self.manifest.contains_id(digest)
    }

    pub fn digest_for_content_path(&self, content_path: &str) -> Option<&str> {
        self.manifest.id_for_path(content_path)
    }

    pub fn content_paths(&self, digest: &str) -> Option<&BTreeSet<String>> {
        self.manifest.paths_for_id(digest)
    }

    /// The first content path carrying `digest`.
    pub fn content_path(&self, digest: &str) -> Option<&str> {
        self.manifest
            .paths_for_id(digest)
            .and_then(|paths| paths.iter().next())
            .map(String::as_str)
    }

    /// Supplementary digests recorded for `content_path`, keyed by algorithm.
    pub fn fixity_for_content_path(&self, content_path: &str) -> BTreeMap<DigestAlgorithm, &str> {
        self.fixity
            .iter()
            .filter_map(|(alg, map)| map.id_for_path(content_path).map(|d| (*alg, d)))
            .collect()
    }

    /// Digests with at least one content path under `prefix/`.
    pub fn digests_under_prefix(&self, prefix: &str) -> BTreeSet<String> {
        let prefix = format!("{}/", prefix.trim_end_matches('/'));
        self.manifest
            .iter()
            .filter(|(path, _)| path.starts_with(&prefix))
            .map(|(_, digest)| digest.to_string())
            .collect()
    }

    /// Content paths under `prefix/`, each with its digest.
    pub fn content_paths_under_prefix(&self, prefix: &str) -> BTreeMap<String, String> {
        let prefix = format!("{}/", prefix.trim_end_matches('/'));
        self.manifest
            .iter()
            .filter(|(path, _)| path.starts_with(&prefix))
            .map(|(path, digest)| (path.to_string(), digest.to_string()))
            .collect()
    }

    /// Storage-root-relative path of the first content path for `digest`.
    pub fn storage_path(&self, digest: &str) -> Option<String> {
        self.content_path(digest)
            .map(|content_path| join_path(&self.object_root_path, content_path))
    }

    /// Fold an active mutable HEAD into an ordinary inventory whose head
    /// version owns the staged content.
    ///
    /// Content paths under `extensions/0005-mutable-head/head/` are rewritten
    /// to the head version directory.
    pub fn to_committed(&self) -> InventoryResult<Inventory> {
        if !self.mutable_head {
            return Err(InventoryError::InvalidInventory(format!(
                "object {} has no active mutable HEAD",
                self.id
            )));
        }

        let rebase = |map: &PathBiMap| -> InventoryResult<PathBiMap> {
            let mut rebased = PathBiMap::new();
            for (path, digest) in map.iter() {
                let path = ObjectPaths::mutable_head_to_version(path, self.head)
                    .unwrap_or_else(|| path.to_string());
                rebased.insert(digest, &path)?;
            }
            Ok(rebased)
        };

        let mut builder = self.to_builder();
        builder.manifest = rebase(&self.manifest)?;
        builder.fixity = self
            .fixity
            .iter()
            .map(|(alg, map)| Ok((*alg, rebase(map)?)))
            .collect::<InventoryResult<_>>()?;
        builder.opaque_fixity = self
            .opaque_fixity
            .iter()
            .map(|(name, map)| Ok((name.clone(), rebase(map)?)))
            .collect::<InventoryResult<_>>()?;
        builder.clear_mutable_head().build()
    }

    fn validate(&self) -> InventoryResult<()> {
        if self.id.trim().is_empty() {
            return Err(InventoryError::InvalidConfiguration(
                "object id cannot be blank".into(),
            ));
        }
        validate_digest_algorithm(self.digest_algorithm)?;
        if let Some(dir) = &self.content_directory {
            validate_content_directory(dir)?;
        }
        if self.object_root_path.trim().is_empty() {
            return Err(InventoryError::InvalidConfiguration(format!(
                "object root path of {} cannot be blank",
                self.id
            )));
        }

        for (position, version_id) in self.versions.keys().enumerate() {
            if version_id.number() != position as u64 + 1 {
                return Err(InventoryError::InvalidInventory(format!(
                    "version ids of {} are not contiguous from v1: found {version_id} at position {}",
                    self.id,
                    position + 1
                )));
            }
        }
        match self.versions.keys().next_back() {
            Some(max) if *max != self.head => {
                return Err(InventoryError::InvalidInventory(format!(
                    "head of {} is {} but the latest version is {max}",
                    self.id, self.head
                )));
            }
            None if self.head.number() != 0 => {
                return Err(InventoryError::InvalidInventory(format!(
                    "head of {} is {} but it has no versions",
                    self.id, self.head
                )));
            }
            _ => {}
        }

        for (version_id, version) in &self.versions {
            if let Some(digest) = version.state().ids().find(|d| !self.manifest.contains_id(d)) {
                return Err(InventoryError::InvalidInventory(format!(
                    "{} {version_id} references {digest} which is not in the manifest",
                    self.id
                )));
            }
        }
        if let Some(digest) = self
            .manifest
            .ids()
            .find(|d| !self.versions.values().any(|v| v.state().contains_id(d)))
        {
            return Err(InventoryError::InvalidInventory(format!(
                "manifest digest {digest} of {} is not referenced by any version",
                self.id
            )));
        }

        if self.mutable_head != self.revision_id.is_some() {
            return Err(InventoryError::InvalidInventory(format!(
                "mutable HEAD of {} must carry exactly one revision id",
                self.id
            )));
        }
        if self.mutable_head && self.versions.is_empty() {
            return Err(InventoryError::InvalidInventory(format!(
                "mutable HEAD of {} requires a version",
                self.id
            )));
        }
        Ok(())
    }
}

/// Builds validated [`Inventory`] values, either from scratch or from an
/// existing inventory.
#[derive(Clone, Debug)]
pub struct InventoryBuilder {
    id: String,
    inventory_type: InventoryType,
    digest_algorithm: DigestAlgorithm,
    content_directory: Option<String>,
    fixity: BTreeMap<DigestAlgorithm, PathBiMap>,
    opaque_fixity: BTreeMap<String, PathBiMap>,
    manifest: PathBiMap,
    versions: BTreeMap<VersionId, Version>,
    mutable_head: bool,
    revision_id: Option<RevisionId>,
    object_root_path: String,
}

impl Default for InventoryBuilder {
    fn default() -> Self {
        Self {
            id: String::new(),
            inventory_type: InventoryType::default(),
            digest_algorithm: DigestAlgorithm::Sha512,
            content_directory: None,
            fixity: BTreeMap::new(),
            opaque_fixity: BTreeMap::new(),
            manifest: PathBiMap::new(),
            versions: BTreeMap::new(),
            mutable_head: false,
            revision_id: None,
            object_root_path: String::new(),
        }
    }
}

impl InventoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_inventory(inventory: &Inventory) -> Self {
        Self {
            id: inventory.id.clone(),
            inventory_type: inventory.inventory_type,
            digest_algorithm: inventory.digest_algorithm,
            content_directory: inventory.content_directory.clone(),
            fixity: inventory.fixity.clone(),
            opaque_fixity: inventory.opaque_fixity.clone(),
            manifest: inventory.manifest.clone(),
            versions: inventory.versions.clone(),
            mutable_head: inventory.mutable_head,
            revision_id: inventory.revision_id,
            object_root_path: inventory.object_root_path.clone(),
        }
    }

    pub fn id(&mut self, id: impl Into<String>) -> &mut Self {
        self.id = id.into();
        self
    }

    pub fn inventory_type(&mut self, inventory_type: InventoryType) -> &mut Self {
        self.inventory_type = inventory_type;
        self
    }

    pub fn digest_algorithm(&mut self, algorithm: DigestAlgorithm) -> &mut Self {
        self.digest_algorithm = algorithm;
        self
    }

    pub fn content_directory(&mut self, content_directory: impl Into<String>) -> &mut Self {
        self.content_directory = Some(content_directory.into());
        self
    }

    pub fn object_root_path(&mut self, path: impl Into<String>) -> &mut Self {
        self.object_root_path = path.into();
        self
    }

    pub fn add_file_to_manifest(
        &mut self,
        digest: &str,
        content_path: &str,
    ) -> InventoryResult<&mut Self> {
        self.manifest.insert(digest, content_path)?;
        Ok(self)
    }

    pub fn add_fixity(
        &mut self,
        algorithm: DigestAlgorithm,
        digest: &str,
        content_path: &str,
    ) -> InventoryResult<&mut Self> {
        self.fixity
            .entry(algorithm)
            .or_default()
            .insert(digest, content_path)?;
        Ok(self)
    }

    /// Record a digest from an algorithm with no digest provider. The name
    /// is kept as written, lowercased.
    pub fn add_opaque_fixity(
        &mut self,
        algorithm: &str,
        digest: &str,
        content_path: &str,
    ) -> InventoryResult<&mut Self> {
        self.opaque_fixity
            .entry(algorithm.to_ascii_lowercase())
            .or_default()
            .insert(digest, content_path)?;
        Ok(self)
    }

    /// Drop a content path from the manifest and every fixity block.
    pub fn remove_content_path(&mut self, content_path: &str) -> Option<String> {
        self.remove_fixity_path(content_path);
        self.prune_empty_fixity();
        self.manifest.remove_path(content_path)
    }

    fn remove_fixity_path(&mut self, content_path: &str) {
        for map in self.fixity.values_mut() {
            map.remove_path(content_path);
        }
        for map in self.opaque_fixity.values_mut() {
            map.remove_path(content_path);
        }
    }

    fn prune_empty_fixity(&mut self) {
        self.fixity.retain(|_, map| !map.is_empty());
        self.opaque_fixity.retain(|_, map| !map.is_empty());
    }

    /// Drop manifest entries no version references, returning their content paths.
    pub fn remove_unreferenced_content(&mut self) -> Vec<String> {
        let unreferenced: Vec<String> = self
            .manifest
            .ids()
            .filter(|d| !self.versions.values().any(|v| v.state().contains_id(d)))
            .map(str::to_string)
            .collect();

        let mut removed = Vec::new();
        for digest in unreferenced {
            if let Some(paths) = self.manifest.remove_id(&digest) {
                for path in paths {
                    self.remove_fixity_path(&path);
                    removed.push(path);
                }
            }
        }
        self.prune_empty_fixity();
        removed
    }

    /// Insert or replace a version. The head follows the latest version.
    pub fn put_version(&mut self, version_id: VersionId, version: Version) -> &mut Self {
        self.versions.insert(version_id, version);
        self
    }

    /// Mark the inventory as a mutable HEAD at `revision`.
    pub fn mutable_head(&mut self, revision: RevisionId) -> &mut Self {
        self.mutable_head = true;
        self.revision_id = Some(revision);
        self
    }

    pub fn clear_mutable_head(&mut self) -> &mut Self {
        self.mutable_head = false;
        self.revision_id = None;
        self
    }

    pub fn manifest(&self) -> &PathBiMap {
        &self.manifest
    }

    pub fn versions(&self) -> &BTreeMap<VersionId, Version> {
        &self.versions
    }

    pub fn build(&self) -> InventoryResult<Inventory> {
        let head = self
            .versions
            .keys()
            .next_back()
            .copied()
            .unwrap_or(VersionId::new(0));
        self.build_with_head(head)
    }

    /// Build with an explicit head, used when hydrating wire documents whose
    /// `head` must be checked rather than derived.
    pub(crate) fn build_with_head(&self, head: VersionId) -> InventoryResult<Inventory> {
        let inventory = Inventory {
            id: self.id.clone(),
            inventory_type: self.inventory_type,
            digest_algorithm: self.digest_algorithm,
            head,
            content_directory: self.content_directory.clone(),
            fixity: self.fixity.clone(),
            opaque_fixity: self.opaque_fixity.clone(),
            manifest: self.manifest.clone(),
            versions: self.versions.clone(),
            mutable_head: self.mutable_head,
            revision_id: self.revision_id,
            object_root_path: self.object_root_path.clone(),
        };
        inventory.validate()?;
        Ok(inventory)
    }
}
