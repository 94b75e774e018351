use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Supported versions of the OCFL layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OcflVersion {
    #[default]
    Ocfl1_0,
}

impl OcflVersion {
    /// The storage-root declaration value, e.g. `ocfl_1.0`.
    pub fn root_declaration(&self) -> &'static str {
        match self {
            Self::Ocfl1_0 => "ocfl_1.0",
        }
    }

    /// The object-root declaration value, e.g. `ocfl_object_1.0`.
    pub fn object_declaration(&self) -> &'static str {
        match self {
            Self::Ocfl1_0 => "ocfl_object_1.0",
        }
    }

    /// The inventory `type` written for this version.
    pub fn inventory_type(&self) -> InventoryType {
        match self {
            Self::Ocfl1_0 => InventoryType::Ocfl1_0,
        }
    }
}

impl fmt::Display for OcflVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.root_declaration())
    }
}

impl FromStr for OcflVersion {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ocfl_1.0" | "1.0" => Ok(Self::Ocfl1_0),
            _ => Err(TypeError::UnknownOcflVersion(s.to_string())),
        }
    }
}

impl Serialize for OcflVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OcflVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The `type` URI of an inventory document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InventoryType {
    #[default]
    #[serde(rename = "https://ocfl.io/1.0/spec/#inventory")]
    Ocfl1_0,
}

impl InventoryType {
    pub fn uri(&self) -> &'static str {
        match self {
            Self::Ocfl1_0 => "https://ocfl.io/1.0/spec/#inventory",
        }
    }

    pub fn ocfl_version(&self) -> OcflVersion {
        match self {
            Self::Ocfl1_0 => OcflVersion::Ocfl1_0,
        }
    }
}

impl fmt::Display for InventoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declarations() {
        let v = OcflVersion::default();
        assert_eq!(v.root_declaration(), "ocfl_1.0");
        assert_eq!(v.object_declaration(), "ocfl_object_1.0");
        assert_eq!(v.inventory_type().ocfl_version(), v);
    }

    #[test]
    fn inventory_type_serializes_as_uri() {
        let json = serde_json::to_string(&InventoryType::Ocfl1_0).unwrap();
        assert_eq!(json, "\"https://ocfl.io/1.0/spec/#inventory\"");
    }

    #[test]
    fn unknown_version_rejected() {
        assert!("ocfl_2.7".parse::<OcflVersion>().is_err());
    }
}
