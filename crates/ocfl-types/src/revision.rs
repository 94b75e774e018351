use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Identifier of one staged edit within an active mutable HEAD: `r1`, `r2`, …
///
/// Revision ids are never padded and start at `r1`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RevisionId(u64);

impl RevisionId {
    /// The first revision of a mutable HEAD.
    pub const R1: Self = Self(1);

    /// Create a revision id. `number` must be at least 1.
    pub fn new(number: u64) -> Result<Self, TypeError> {
        if number == 0 {
            return Err(TypeError::InvalidRevisionId("r0".into()));
        }
        Ok(Self(number))
    }

    /// The numeric component.
    pub fn number(&self) -> u64 {
        self.0
    }

    /// The revision that follows this one.
    pub fn next(&self) -> Result<Self, TypeError> {
        self.0
            .checked_add(1)
            .map(Self)
            .ok_or_else(|| TypeError::OutOfRange {
                id: self.to_string(),
                direction: "next",
            })
    }

    /// The revision that precedes this one. `r1` has no predecessor.
    pub fn previous(&self) -> Result<Self, TypeError> {
        if self.0 <= 1 {
            return Err(TypeError::OutOfRange {
                id: self.to_string(),
                direction: "previous",
            });
        }
        Ok(Self(self.0 - 1))
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

impl fmt::Debug for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RevisionId({self})")
    }
}

impl FromStr for RevisionId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let number = s
            .strip_prefix('r')
            .filter(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|d| d.parse::<u64>().ok())
            .ok_or_else(|| TypeError::InvalidRevisionId(s.to_string()))?;
        Self::new(number).map_err(|_| TypeError::InvalidRevisionId(s.to_string()))
    }
}

impl Serialize for RevisionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RevisionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
