use std::collections::BTreeSet;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::bimap::PathBiMap;
use crate::error::InventoryResult;

/// The person or agent that created a version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// One immutable snapshot of an object's logical state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Version {
    created: DateTime<Utc>,
    message: Option<String>,
    user: Option<User>,
    state: PathBiMap,
}

impl Version {
    pub fn new(
        created: DateTime<Utc>,
        message: Option<String>,
        user: Option<User>,
        state: PathBiMap,
    ) -> Self {
        Self {
            created,
            message,
            user,
            state,
        }
    }

    pub fn builder() -> VersionBuilder {
        VersionBuilder::default()
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Digest → logical paths for every file in this version.
    pub fn state(&self) -> &PathBiMap {
        &self.state
    }

    pub fn digest_for_path(&self, logical_path: &str) -> Option<&str> {
        self.state.id_for_path(logical_path)
    }

    pub fn paths_for_digest(&self, digest: &str) -> Option<&BTreeSet<String>> {
        self.state.paths_for_id(digest)
    }
}

/// Builder for [`Version`]. `created` defaults to now, truncated to seconds.
#[derive(Clone, Debug, Default)]
pub struct VersionBuilder {
    created: Option<DateTime<Utc>>,
    message: Option<String>,
    user: Option<User>,
    state: PathBiMap,
}

impl VersionBuilder {
    /// Start from an existing version's state and metadata.
    pub fn from_version(version: &Version) -> Self {
        Self {
            created: Some(version.created),
            message: version.message.clone(),
            user: version.user.clone(),
            state: version.state.clone(),
        }
    }

    pub fn created(&mut self, created: DateTime<Utc>) -> &mut Self {
        self.created = Some(created);
        self
    }

    pub fn message(&mut self, message: impl Into<String>) -> &mut Self {
        self.message = Some(message.into());
        self
    }

    pub fn user(&mut self, name: impl Into<String>, address: Option<String>) -> &mut Self {
        self.user = Some(User {
            name: name.into(),
            address,
        });
        self
    }

    /// Add a logical path with the given digest to the state.
    pub fn add_file(&mut self, digest: &str, logical_path: &str) -> InventoryResult<&mut Self> {
        self.state.insert(digest, logical_path)?;
        Ok(self)
    }

    /// Remove a logical path from the state.
    pub fn remove_file(&mut self, logical_path: &str) -> Option<String> {
        self.state.remove_path(logical_path)
    }

    pub fn state(&self) -> &PathBiMap {
        &self.state
    }

    pub fn build(&self) -> Version {
        Version {
            created: self
                .created
                .unwrap_or_else(|| Utc::now().trunc_subsecs(0)),
            message: self.message.clone(),
            user: self.user.clone(),
            state: self.state.clone(),
        }
    }
}
