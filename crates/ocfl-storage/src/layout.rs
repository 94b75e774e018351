//! Object id → object root path strategies.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use ocfl_crypto::digest_bytes;
use ocfl_types::DigestAlgorithm;
use serde_json::{json, Value};

use crate::error::{StorageError, StorageResult};

/// Maps object ids to storage-root-relative object root paths.
///
/// The mapping must be deterministic and injective, and the returned path
/// must be `/`-separated, non-empty, with no leading or trailing separator.
/// Blank ids are rejected with [`StorageError::ConfigurationInvalid`].
pub trait ObjectIdPathMapper: Send + Sync {
    fn map(&self, object_id: &str) -> StorageResult<String>;

    /// The document written to `ocfl_layout.json` when a repository is
    /// created. An existing repository is only opened by a mapper that
    /// describes itself identically.
    fn describe_layout(&self) -> BTreeMap<String, Value>;
}

/// Map `object_id` to its object root, refusing ids that would resolve to
/// the storage root itself.
pub fn map_object_root(mapper: &dyn ObjectIdPathMapper, object_id: &str) -> StorageResult<String> {
    let path = mapper.map(object_id)?;
    if path.split('/').all(|segment| segment.is_empty() || segment == ".") {
        return Err(StorageError::ConfigurationInvalid(format!(
            "object id {object_id:?} maps to the storage root"
        )));
    }
    Ok(path)
}

fn ensure_object_id(object_id: &str) -> StorageResult<()> {
    if object_id.trim().is_empty() {
        return Err(StorageError::ConfigurationInvalid(format!(
            "object id {object_id:?} is blank"
        )));
    }
    Ok(())
}

/// One directory per object, named by the percent-encoded object id.
///
/// Bytes outside `[A-Za-z0-9_-]` are encoded as `%xx`, so distinct ids never
/// collide and no id escapes the storage root.
#[derive(Clone, Copy, Debug, Default)]
pub struct FlatLayout;

impl FlatLayout {
    pub const EXTENSION: &'static str = "0002-flat-direct-storage-layout";

    pub fn new() -> Self {
        Self
    }
}

impl ObjectIdPathMapper for FlatLayout {
    fn map(&self, object_id: &str) -> StorageResult<String> {
        ensure_object_id(object_id)?;
        Ok(percent_encode(object_id))
    }

    fn describe_layout(&self) -> BTreeMap<String, Value> {
        BTreeMap::from([
            ("extension".to_string(), json!(Self::EXTENSION)),
            (
                "description".to_string(),
                json!("Object roots are percent-encoded object ids directly under the storage root"),
            ),
        ])
    }
}

/// Hash the object id and fan out by leading digest characters:
/// `a3f/9c0/12b/<full digest>` for three tuples of three.
#[derive(Clone, Copy, Debug)]
pub struct HashedNTupleLayout {
    algorithm: DigestAlgorithm,
    tuple_size: usize,
    number_of_tuples: usize,
}

impl HashedNTupleLayout {
    pub const EXTENSION: &'static str = "0004-hashed-n-tuple-storage-layout";

    /// Fan-out of `number_of_tuples` directories of `tuple_size` hex
    /// characters each. Tuples may not consume more than the digest.
    pub fn new(
        algorithm: DigestAlgorithm,
        tuple_size: usize,
        number_of_tuples: usize,
    ) -> StorageResult<Self> {
        if tuple_size == 0 || number_of_tuples == 0 {
            return Err(StorageError::ConfigurationInvalid(
                "tuple size and number of tuples must be positive".into(),
            ));
        }
        if tuple_size * number_of_tuples > algorithm.hex_len() {
            return Err(StorageError::ConfigurationInvalid(format!(
                "{number_of_tuples} tuples of {tuple_size} exceed a {algorithm} digest"
            )));
        }
        Ok(Self {
            algorithm,
            tuple_size,
            number_of_tuples,
        })
    }
}

impl Default for HashedNTupleLayout {
    fn default() -> Self {
        Self {
            algorithm: DigestAlgorithm::Sha256,
            tuple_size: 3,
            number_of_tuples: 3,
        }
    }
}

impl ObjectIdPathMapper for HashedNTupleLayout {
    fn map(&self, object_id: &str) -> StorageResult<String> {
        ensure_object_id(object_id)?;
        let digest = digest_bytes(self.algorithm, object_id.as_bytes());
        let mut path = String::with_capacity(digest.len() * 2);
        for i in 0..self.number_of_tuples {
            let start = i * self.tuple_size;
            path.push_str(&digest[start..start + self.tuple_size]);
            path.push('/');
        }
        path.push_str(&digest);
        Ok(path)
    }

    fn describe_layout(&self) -> BTreeMap<String, Value> {
        BTreeMap::from([
            ("extension".to_string(), json!(Self::EXTENSION)),
            (
                "description".to_string(),
                json!(format!(
                    "Object roots are {} digests of object ids fanned out by {} tuples of {} characters",
                    self.algorithm, self.number_of_tuples, self.tuple_size
                )),
            ),
        ])
    }
}

fn percent_encode(id: &str) -> String {
    let mut encoded = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            encoded.push(byte as char);
        } else {
            let _ = write!(encoded, "%{byte:02x}");
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn flat_keeps_safe_ids() {
        assert_eq!(FlatLayout.map("o1").unwrap(), "o1");
        assert_eq!(FlatLayout.map("my_object-7").unwrap(), "my_object-7");
    }

    #[test]
    fn flat_encodes_separators_and_dots() {
        assert_eq!(FlatLayout.map("info:fedora/obj").unwrap(), "info%3afedora%2fobj");
        assert_eq!(FlatLayout.map("..").unwrap(), "%2e%2e");
        assert_eq!(FlatLayout.map("é").unwrap(), "%c3%a9");
    }

    #[test]
    fn blank_ids_are_rejected() {
        for id in ["", " ", "\t\n"] {
            assert!(matches!(FlatLayout.map(id), Err(StorageError::ConfigurationInvalid(_))));
            assert!(matches!(
                HashedNTupleLayout::default().map(id),
                Err(StorageError::ConfigurationInvalid(_))
            ));
        }
    }

    struct RootMapper;

    impl ObjectIdPathMapper for RootMapper {
        fn map(&self, _object_id: &str) -> StorageResult<String> {
            Ok("./".into())
        }

        fn describe_layout(&self) -> BTreeMap<String, Value> {
            BTreeMap::new()
        }
    }

    #[test]
    fn object_root_never_resolves_to_storage_root() {
        assert!(matches!(
            map_object_root(&RootMapper, "o1"),
            Err(StorageError::ConfigurationInvalid(_))
        ));
        assert_eq!(map_object_root(&FlatLayout, "o1").unwrap(), "o1");
    }

    #[test]
    fn hashed_layout_fans_out_by_digest() {
        let layout = HashedNTupleLayout::default();
        let digest = digest_bytes(DigestAlgorithm::Sha256, b"o1");
        let path = layout.map("o1").unwrap();
        assert_eq!(
            path,
            format!("{}/{}/{}/{digest}", &digest[0..3], &digest[3..6], &digest[6..9])
        );
    }

    #[test]
    fn hashed_layout_rejects_oversized_tuples() {
        assert!(HashedNTupleLayout::new(DigestAlgorithm::Sha256, 0, 3).is_err());
        assert!(HashedNTupleLayout::new(DigestAlgorithm::Sha256, 33, 2).is_err());
        assert!(HashedNTupleLayout::new(DigestAlgorithm::Sha256, 32, 2).is_ok());
    }

    #[test]
    fn layouts_describe_themselves_differently() {
        assert_ne!(FlatLayout.describe_layout(), HashedNTupleLayout::default().describe_layout());
        assert_eq!(
            FlatLayout.describe_layout()["extension"],
            json!("0002-flat-direct-storage-layout")
        );
    }

    proptest! {
        #[test]
        fn flat_is_injective(a in "\\PC{1,12}", b in "\\PC{1,12}") {
            prop_assume!(a != b && !a.trim().is_empty() && !b.trim().is_empty());
            prop_assert_ne!(FlatLayout.map(&a).ok(), FlatLayout.map(&b).ok());
        }

        #[test]
        fn flat_output_is_one_safe_segment(id in "\\PC{1,24}") {
            prop_assume!(!id.trim().is_empty());
            let path = FlatLayout.map(&id).unwrap();
            prop_assert!(!path.contains('/'));
            prop_assert!(path.bytes().all(|b| b.is_ascii_alphanumeric() || b"%-_".contains(&b)));
        }
    }
}
