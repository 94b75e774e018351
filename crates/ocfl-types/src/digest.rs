use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A named digest algorithm.
///
/// Only [`DigestAlgorithm::Sha512`] and [`DigestAlgorithm::Sha256`] may be used
/// as an inventory's content-addressing algorithm. The others are accepted in
/// supplementary fixity blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    Sha512,
    Sha256,
    Sha1,
}

impl DigestAlgorithm {
    /// Algorithms an inventory may use to identify content.
    pub const INVENTORY_ALGORITHMS: [Self; 2] = [Self::Sha512, Self::Sha256];

    /// The name used in inventories and sidecar file names.
    pub fn ocfl_name(&self) -> &'static str {
        match self {
            Self::Sha512 => "sha512",
            Self::Sha256 => "sha256",
            Self::Sha1 => "sha1",
        }
    }

    /// Length of the lowercase hex encoding of a digest.
    pub fn hex_len(&self) -> usize {
        match self {
            Self::Sha512 => 128,
            Self::Sha256 => 64,
            Self::Sha1 => 40,
        }
    }

    /// Returns `true` if this algorithm may be an inventory's digest algorithm.
    pub fn is_inventory_algorithm(&self) -> bool {
        Self::INVENTORY_ALGORITHMS.contains(self)
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ocfl_name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha512" | "sha-512" => Ok(Self::Sha512),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "sha1" | "sha-1" => Ok(Self::Sha1),
            _ => Err(TypeError::UnknownDigestAlgorithm(s.to_string())),
        }
    }
}
