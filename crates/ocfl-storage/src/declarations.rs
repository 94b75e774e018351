//! Storage-root and object-root conformance declarations.

use std::collections::BTreeMap;

use ocfl_types::OcflVersion;
use serde_json::Value;

use crate::error::{StorageError, StorageResult};
use crate::layout::ObjectIdPathMapper;

pub const LAYOUT_FILE: &str = "ocfl_layout.json";
pub const DEPOSIT_DIR: &str = "deposit";

/// A `0=<value>` declaration file and its body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Namaste {
    pub file_name: String,
    pub content: String,
}

impl Namaste {
    fn new(value: &str) -> Self {
        Self {
            file_name: format!("0={value}"),
            content: format!("{value}\n"),
        }
    }

    /// `0=ocfl_1.0` at the storage root.
    pub fn storage_root(version: OcflVersion) -> Self {
        Self::new(version.root_declaration())
    }

    /// `0=ocfl_object_1.0` at each object root.
    pub fn object_root(version: OcflVersion) -> Self {
        Self::new(version.object_declaration())
    }
}

/// `ocfl_1.0.txt`
pub fn spec_file_name(version: OcflVersion) -> String {
    format!("{}.txt", version.root_declaration())
}

pub fn spec_file_content(version: OcflVersion) -> String {
    format!(
        "This directory is an OCFL storage root conforming to {version}.\n\
         The specification is published at https://ocfl.io/{}/spec/\n",
        version.root_declaration().trim_start_matches("ocfl_")
    )
}

/// Serialized `ocfl_layout.json` for `mapper`.
pub fn layout_document(mapper: &dyn ObjectIdPathMapper) -> StorageResult<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(&mapper.describe_layout())?)
}

/// Compare a stored layout document with the one `mapper` would write.
pub fn check_layout_document(bytes: &[u8], mapper: &dyn ObjectIdPathMapper) -> StorageResult<()> {
    let stored: BTreeMap<String, Value> = serde_json::from_slice(bytes).map_err(|e| {
        StorageError::ConfigurationInvalid(format!("unreadable {LAYOUT_FILE}: {e}"))
    })?;
    let expected = mapper.describe_layout();
    if stored.get("extension") != expected.get("extension") {
        return Err(StorageError::ConfigurationInvalid(format!(
            "storage root uses layout {}, configured layout is {}",
            stored.get("extension").unwrap_or(&Value::Null),
            expected.get("extension").unwrap_or(&Value::Null)
        )));
    }
    Ok(())
}

/// Check that a storage root declares `version`, given the names of the
/// `0=` files found there.
pub fn check_root_declaration<'a, I>(names: I, version: OcflVersion) -> StorageResult<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let expected = Namaste::storage_root(version).file_name;
    let found: Vec<&str> = names.into_iter().filter(|n| n.starts_with("0=")).collect();
    if found.contains(&expected.as_str()) {
        return Ok(());
    }
    if found.is_empty() {
        return Err(StorageError::ConfigurationInvalid(
            "storage root is not empty and has no OCFL declaration".into(),
        ));
    }
    Err(StorageError::ConfigurationInvalid(format!(
        "storage root declares {}, expected {expected}",
        found.join(", ")
    )))
}

/// Check that an object found at `actual` is where `mapper` would put it.
pub fn check_object_location(
    mapper: &dyn ObjectIdPathMapper,
    object_id: &str,
    actual: &str,
) -> StorageResult<()> {
    let expected = mapper.map(object_id)?;
    if expected != actual {
        return Err(StorageError::ConfigurationInvalid(format!(
            "object {object_id} is stored at {actual}, but the configured layout maps it to {expected}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{FlatLayout, HashedNTupleLayout};

    #[test]
    fn namaste_files() {
        let root = Namaste::storage_root(OcflVersion::Ocfl1_0);
        assert_eq!(root.file_name, "0=ocfl_1.0");
        assert_eq!(root.content, "ocfl_1.0\n");
        let object = Namaste::object_root(OcflVersion::Ocfl1_0);
        assert_eq!(object.file_name, "0=ocfl_object_1.0");
        assert_eq!(object.content, "ocfl_object_1.0\n");
        assert_eq!(spec_file_name(OcflVersion::Ocfl1_0), "ocfl_1.0.txt");
        assert!(spec_file_content(OcflVersion::Ocfl1_0).contains("https://ocfl.io/1.0/spec/"));
    }

    #[test]
    fn layout_document_roundtrip_check() {
        let doc = layout_document(&FlatLayout).unwrap();
        check_layout_document(&doc, &FlatLayout).unwrap();
        let err = check_layout_document(&doc, &HashedNTupleLayout::default()).unwrap_err();
        assert!(matches!(err, StorageError::ConfigurationInvalid(_)));
        assert!(check_layout_document(b"not json", &FlatLayout).is_err());
    }

    #[test]
    fn root_declaration_checks() {
        check_root_declaration(["0=ocfl_1.0", "ocfl_1.0.txt"], OcflVersion::Ocfl1_0).unwrap();
        assert!(check_root_declaration(["0=ocfl_2.0"], OcflVersion::Ocfl1_0).is_err());
        assert!(check_root_declaration(["random.txt"], OcflVersion::Ocfl1_0).is_err());
    }

    #[test]
    fn object_location_check() {
        check_object_location(&FlatLayout, "o1", "o1").unwrap();
        let err = check_object_location(&FlatLayout, "o1", "x/o1").unwrap_err();
        assert!(matches!(err, StorageError::ConfigurationInvalid(ref m) if m.contains("x/o1")));
    }
}
