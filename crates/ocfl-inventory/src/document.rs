use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use ocfl_types::{DigestAlgorithm, InventoryType, RevisionId, VersionId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bimap::PathBiMap;
use crate::error::{InventoryError, InventoryResult};
use crate::inventory::{Inventory, InventoryBuilder};
use crate::version::{User, Version};

/// The serialized form of an inventory, exactly as it appears in
/// `inventory.json`.
///
/// A document carries no storage context. It becomes an [`Inventory`] only
/// through [`InventoryDocument::hydrate`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryDocument {
    pub id: String,
    #[serde(rename = "type")]
    pub inventory_type: InventoryType,
    pub digest_algorithm: DigestAlgorithm,
    pub head: VersionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_directory: Option<String>,
    /// Keyed by algorithm name. Blocks for algorithms without a digest
    /// provider hydrate into [`Inventory::opaque_fixity`] and are written
    /// back unchanged.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fixity: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
    pub manifest: BTreeMap<String, BTreeSet<String>>,
    pub versions: BTreeMap<VersionId, VersionDocument>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDocument {
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    pub state: BTreeMap<String, BTreeSet<String>>,
}

/// Storage facts attached to a document when it is hydrated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InventoryContext {
    pub object_root_path: String,
    pub mutable_head: bool,
    pub revision_id: Option<RevisionId>,
}

impl InventoryContext {
    /// Context for an inventory read from the object root or a version directory.
    pub fn new(object_root_path: impl Into<String>) -> Self {
        Self {
            object_root_path: object_root_path.into(),
            mutable_head: false,
            revision_id: None,
        }
    }

    /// Context for an inventory read from the mutable HEAD area.
    pub fn mutable_head(object_root_path: impl Into<String>, revision_id: RevisionId) -> Self {
        Self {
            object_root_path: object_root_path.into(),
            mutable_head: true,
            revision_id: Some(revision_id),
        }
    }
}

impl InventoryDocument {
    /// Validate the document and combine it with its storage context.
    pub fn hydrate(self, context: InventoryContext) -> InventoryResult<Inventory> {
        if context.mutable_head != context.revision_id.is_some() {
            return Err(InventoryError::InvalidInventory(format!(
                "mutable HEAD context for {} must carry exactly one revision id",
                self.id
            )));
        }

        let mut builder = InventoryBuilder::new();
        builder
            .id(self.id.clone())
            .inventory_type(self.inventory_type)
            .digest_algorithm(self.digest_algorithm)
            .object_root_path(context.object_root_path);
        if let Some(dir) = self.content_directory {
            builder.content_directory(dir);
        }
        if let Some(revision) = context.revision_id {
            builder.mutable_head(revision);
        }

        for (digest, paths) in &self.manifest {
            for path in paths {
                builder.add_file_to_manifest(digest, path)?;
            }
        }

        for (name, entries) in &self.fixity {
            let algorithm = name.parse::<DigestAlgorithm>().ok();
            if algorithm.is_none() {
                debug!(object_id = %self.id, algorithm = %name, "keeping opaque fixity block");
            }
            for (digest, paths) in entries {
                for path in paths {
                    match algorithm {
                        Some(algorithm) => builder.add_fixity(algorithm, digest, path)?,
                        None => builder.add_opaque_fixity(name, digest, path)?,
                    };
                }
            }
        }

        for (version_id, version) in self.versions {
            builder.put_version(version_id, version.into_version()?);
        }

        builder.build_with_head(self.head)
    }
}

impl VersionDocument {
    fn into_version(self) -> InventoryResult<Version> {
        let state = PathBiMap::from_id_map(self.state)?;
        Ok(Version::new(self.created, self.message, self.user, state))
    }
}

impl From<&Version> for VersionDocument {
    fn from(version: &Version) -> Self {
        Self {
            created: version.created(),
            message: version.message().map(str::to_string),
            user: version.user().cloned(),
            state: version.state().to_id_map(),
        }
    }
}

impl From<&Inventory> for InventoryDocument {
    fn from(inventory: &Inventory) -> Self {
        Self {
            id: inventory.id().to_string(),
            inventory_type: inventory.inventory_type(),
            digest_algorithm: inventory.digest_algorithm(),
            head: inventory.head(),
            content_directory: inventory.content_directory().map(str::to_string),
            fixity: inventory
                .fixity()
                .iter()
                .map(|(alg, map)| (alg.ocfl_name().to_string(), map.to_id_map()))
                .chain(
                    inventory
                        .opaque_fixity()
                        .iter()
                        .map(|(name, map)| (name.clone(), map.to_id_map())),
                )
                .collect(),
            manifest: inventory.manifest().to_id_map(),
            versions: inventory
                .versions()
                .iter()
                .map(|(id, version)| (*id, VersionDocument::from(version)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
      "id": "o1",
      "type": "https://ocfl.io/1.0/spec/#inventory",
      "digestAlgorithm": "sha512",
      "head": "v2",
      "fixity": {
        "md5": { "0cc1": ["v1/content/a.txt"] },
        "sha1": { "AB12": ["v1/content/a.txt"] }
      },
      "manifest": {
        "AAAA": ["v1/content/a.txt"],
        "bbbb": ["v2/content/b.txt"]
      },
      "versions": {
        "v1": {
          "created": "2024-01-02T03:04:05Z",
          "message": "first",
          "user": { "name": "Ada", "address": "mailto:ada@example.org" },
          "state": { "aaaa": ["a.txt"] }
        },
        "v2": {
          "created": "2024-01-03T03:04:05Z",
          "state": { "aaaa": ["a.txt"], "bbbb": ["b.txt", "copy.txt"] }
        }
      }
    }"#;

    fn document() -> InventoryDocument {
        serde_json::from_str(DOC).unwrap()
    }

    #[test]
    fn hydrate_attaches_context() {
        let inv = document().hydrate(InventoryContext::new("ab/o1")).unwrap();
        assert_eq!(inv.id(), "o1");
        assert_eq!(inv.head(), VersionId::new(2));
        assert_eq!(inv.object_root_path(), "ab/o1");
        assert!(!inv.has_mutable_head());
        assert_eq!(inv.content_directory(), None);
        assert_eq!(inv.version(VersionId::V1).unwrap().message(), Some("first"));
    }

    #[test]
    fn hydrate_normalizes_digest_case() {
        let inv = document().hydrate(InventoryContext::new("o1")).unwrap();
        assert_eq!(inv.digest_for_content_path("v1/content/a.txt"), Some("aaaa"));
        let fixity = inv.fixity_for_content_path("v1/content/a.txt");
        assert_eq!(fixity.get(&DigestAlgorithm::Sha1), Some(&"ab12"));
    }

    #[test]
    fn unsupported_fixity_algorithm_is_kept_opaque() {
        let inv = document().hydrate(InventoryContext::new("o1")).unwrap();
        assert_eq!(inv.fixity().len(), 1);
        assert_eq!(
            inv.opaque_fixity()["md5"].id_for_path("v1/content/a.txt"),
            Some("0cc1")
        );
    }

    #[test]
    fn opaque_fixity_is_written_back() {
        let inv = document().hydrate(InventoryContext::new("o1")).unwrap();
        let rewritten = InventoryDocument::from(&inv);
        assert_eq!(rewritten.fixity.keys().collect::<Vec<_>>(), vec!["md5", "sha1"]);
        assert_eq!(rewritten.fixity["md5"], document().fixity["md5"]);
    }

    #[test]
    fn hydrate_rejects_wrong_head() {
        let mut doc = document();
        doc.head = VersionId::V1;
        let err = doc.hydrate(InventoryContext::new("o1")).unwrap_err();
        assert!(matches!(err, InventoryError::InvalidInventory(_)));
    }

    #[test]
    fn mutable_head_context_sets_revision() {
        let inv = document()
            .hydrate(InventoryContext::mutable_head("o1", RevisionId::R1))
            .unwrap();
        assert!(inv.has_mutable_head());
        assert_eq!(inv.revision_id(), Some(RevisionId::R1));
    }

    #[test]
    fn document_from_inventory_matches_source() {
        let inv = document().hydrate(InventoryContext::new("o1")).unwrap();
        let doc = InventoryDocument::from(&inv);
        assert_eq!(doc.head, VersionId::new(2));
        assert!(doc.fixity.contains_key("sha1"));
        assert_eq!(doc.versions[&VersionId::new(2)].state["bbbb"].len(), 2);
        assert_eq!(doc.manifest.keys().collect::<Vec<_>>(), vec!["aaaa", "bbbb"]);
    }
}
