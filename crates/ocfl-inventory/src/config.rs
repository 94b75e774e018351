use ocfl_types::{DigestAlgorithm, OcflVersion};
use serde::{Deserialize, Serialize};

use crate::error::{InventoryError, InventoryResult};
use crate::paths::ObjectPaths;

/// Defaults applied to newly created objects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcflConfig {
    ocfl_version: OcflVersion,
    default_digest_algorithm: DigestAlgorithm,
    default_content_directory: String,
}

impl Default for OcflConfig {
    fn default() -> Self {
        Self {
            ocfl_version: OcflVersion::Ocfl1_0,
            default_digest_algorithm: DigestAlgorithm::Sha512,
            default_content_directory: ObjectPaths::DEFAULT_CONTENT_DIRECTORY.to_string(),
        }
    }
}

impl OcflConfig {
    pub fn ocfl_version(&self) -> OcflVersion {
        self.ocfl_version
    }

    pub fn default_digest_algorithm(&self) -> DigestAlgorithm {
        self.default_digest_algorithm
    }

    pub fn default_content_directory(&self) -> &str {
        &self.default_content_directory
    }

    pub fn set_ocfl_version(&mut self, version: OcflVersion) -> &mut Self {
        self.ocfl_version = version;
        self
    }

    pub fn set_default_digest_algorithm(
        &mut self,
        algorithm: DigestAlgorithm,
    ) -> InventoryResult<&mut Self> {
        validate_digest_algorithm(algorithm)?;
        self.default_digest_algorithm = algorithm;
        Ok(self)
    }

    pub fn set_default_content_directory(
        &mut self,
        content_directory: impl Into<String>,
    ) -> InventoryResult<&mut Self> {
        let content_directory = content_directory.into();
        validate_content_directory(&content_directory)?;
        self.default_content_directory = content_directory;
        Ok(self)
    }

    /// Check values that may have bypassed the setters through deserialization.
    pub fn validate(&self) -> InventoryResult<()> {
        validate_digest_algorithm(self.default_digest_algorithm)?;
        validate_content_directory(&self.default_content_directory)
    }
}

pub(crate) fn validate_digest_algorithm(algorithm: DigestAlgorithm) -> InventoryResult<()> {
    if !algorithm.is_inventory_algorithm() {
        return Err(InventoryError::InvalidConfiguration(format!(
            "digest algorithm must be sha512 or sha256, got {algorithm}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_content_directory(content_directory: &str) -> InventoryResult<()> {
    if content_directory.trim().is_empty() {
        return Err(InventoryError::InvalidConfiguration(
            "content directory cannot be blank".into(),
        ));
    }
    if content_directory.contains('/') || content_directory.contains('\\') {
        return Err(InventoryError::InvalidConfiguration(format!(
            "content directory cannot contain path separators: {content_directory}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = OcflConfig::default();
        assert_eq!(config.default_digest_algorithm(), DigestAlgorithm::Sha512);
        assert_eq!(config.default_content_directory(), "content");
        config.validate().unwrap();
    }

    #[test]
    fn setters_validate() {
        let mut config = OcflConfig::default();
        assert!(config.set_default_digest_algorithm(DigestAlgorithm::Sha1).is_err());
        assert!(config.set_default_content_directory("a/b").is_err());
        assert!(config.set_default_content_directory("  ").is_err());

        config
            .set_default_digest_algorithm(DigestAlgorithm::Sha256)
            .unwrap()
            .set_default_content_directory("data")
            .unwrap();
        assert_eq!(config.default_digest_algorithm(), DigestAlgorithm::Sha256);
        assert_eq!(config.default_content_directory(), "data");
    }

    #[test]
    fn loads_partial_toml() {
        let config: OcflConfig = toml::from_str(r#"default_digest_algorithm = "sha256""#).unwrap();
        assert_eq!(config.default_digest_algorithm(), DigestAlgorithm::Sha256);
        assert_eq!(config.default_content_directory(), "content");
    }

    #[test]
    fn validate_catches_deserialized_bad_values() {
        let config: OcflConfig = toml::from_str(r#"default_digest_algorithm = "sha1""#).unwrap();
        assert!(matches!(
            config.validate(),
            Err(InventoryError::InvalidConfiguration(_))
        ));
    }
}
