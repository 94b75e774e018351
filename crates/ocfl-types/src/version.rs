use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Identifier of one object version: `v1`, `v2`, …
///
/// OCFL permits zero-padded identifiers (`v001`). A padded id always keeps a
/// leading zero, so width 3 runs from `v001` to `v099`. It keeps its width
/// when formatted and when stepping to a successor, and stepping past `v099`
/// is an error. Equality, ordering and hashing only look at the number, so
/// `v2` and `v002` are the same version.
///
/// `v0` is reserved for stub inventories of objects that have no versions.
#[derive(Clone, Copy)]
pub struct VersionId {
    number: u64,
    /// Total digit width when zero-padded, `0` when unpadded.
    width: usize,
}

impl VersionId {
    /// The first version of every object.
    pub const V1: Self = Self { number: 1, width: 0 };

    /// Create an unpadded version id.
    pub const fn new(number: u64) -> Self {
        Self { number, width: 0 }
    }

    /// Create a zero-padded version id with the given digit width. The
    /// number must leave room for a leading zero.
    pub fn padded(number: u64, width: usize) -> Result<Self, TypeError> {
        let id = Self { number, width };
        if !id.fits_width(number) {
            return Err(TypeError::InvalidVersionId(format!(
                "{number} does not fit in {width} zero-padded digits"
            )));
        }
        Ok(id)
    }

    fn fits_width(&self, number: u64) -> bool {
        self.width == 0 || number.to_string().len() < self.width
    }

    /// The numeric component.
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Digit width when zero-padded, `None` otherwise.
    pub fn padding(&self) -> Option<usize> {
        (self.width > 0).then_some(self.width)
    }

    /// The version that follows this one.
    pub fn next(&self) -> Result<Self, TypeError> {
        let number = self.number.checked_add(1).ok_or_else(|| TypeError::OutOfRange {
            id: self.to_string(),
            direction: "next",
        })?;
        if !self.fits_width(number) {
            return Err(TypeError::OutOfRange {
                id: self.to_string(),
                direction: "next",
            });
        }
        Ok(Self {
            number,
            width: self.width,
        })
    }

    /// The version that precedes this one. `v1` has no predecessor.
    pub fn previous(&self) -> Result<Self, TypeError> {
        if self.number <= 1 {
            return Err(TypeError::OutOfRange {
                id: self.to_string(),
                direction: "previous",
            });
        }
        Ok(Self {
            number: self.number - 1,
            width: self.width,
        })
    }
}

impl PartialEq for VersionId {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number
    }
}

impl Eq for VersionId {}

impl Hash for VersionId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.number.hash(state);
    }
}

impl PartialOrd for VersionId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number.cmp(&other.number)
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{:0width$}", self.number, width = self.width)
    }
}

impl fmt::Debug for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VersionId({self})")
    }
}

impl FromStr for VersionId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix('v')
            .filter(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()))
            .ok_or_else(|| TypeError::InvalidVersionId(s.to_string()))?;

        let number: u64 = digits
            .parse()
            .map_err(|_| TypeError::InvalidVersionId(s.to_string()))?;

        let width = if digits.len() > 1 && digits.starts_with('0') {
            digits.len()
        } else {
            0
        };

        Ok(Self { number, width })
    }
}

impl Serialize for VersionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_and_display_unpadded() {
        let id: VersionId = "v12".parse().unwrap();
        assert_eq!(id.number(), 12);
        assert_eq!(id.padding(), None);
        assert_eq!(id.to_string(), "v12");
    }

    #[test]
    fn parse_and_display_padded() {
        let id: VersionId = "v007".parse().unwrap();
        assert_eq!(id.number(), 7);
        assert_eq!(id.padding(), Some(3));
        assert_eq!(id.to_string(), "v007");
        assert_eq!(id.next().unwrap().to_string(), "v008");
    }

    #[test]
    fn padded_successor_overflow_is_an_error() {
        let id: VersionId = "v098".parse().unwrap();
        let last = id.next().unwrap();
        assert_eq!(last.to_string(), "v099");
        assert_eq!(last.padding(), Some(3));
        assert!(last.next().is_err());

        let unpadded: VersionId = "v999".parse().unwrap();
        assert_eq!(unpadded.next().unwrap().to_string(), "v1000");
    }

    #[test]
    fn padded_constructor_requires_leading_zero() {
        assert_eq!(VersionId::padded(99, 3).unwrap().to_string(), "v099");
        assert!(VersionId::padded(100, 3).is_err());
        assert!(VersionId::padded(1, 1).is_err());
    }

    #[test]
    fn rejects_malformed_ids() {
        for bad in ["", "v", "1", "V1", "v1a", "vx", "r1", "v-1"] {
            assert!(bad.parse::<VersionId>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn v1_has_no_previous() {
        assert!(VersionId::V1.previous().is_err());
        assert_eq!(VersionId::new(3).previous().unwrap(), VersionId::new(2));
    }

    #[test]
    fn padded_and_unpadded_compare_equal() {
        let padded: VersionId = "v002".parse().unwrap();
        assert_eq!(padded, VersionId::new(2));
        assert!(VersionId::new(10) > padded);
    }

    #[test]
    fn serde_uses_string_form() {
        let json = serde_json::to_string(&VersionId::new(4)).unwrap();
        assert_eq!(json, "\"v4\"");
        let parsed: VersionId = serde_json::from_str("\"v04\"").unwrap();
        assert_eq!(parsed.to_string(), "v04");
    }

    #[test]
    fn works_as_json_map_key() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(VersionId::new(2), "b");
        map.insert(VersionId::new(1), "a");
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"v1":"a","v2":"b"}"#);
    }

    proptest! {
        #[test]
        fn ordering_is_numeric(a in 1u64..1_000_000, b in 1u64..1_000_000) {
            let va: VersionId = format!("v{a}").parse().unwrap();
            let vb: VersionId = format!("v{b}").parse().unwrap();
            prop_assert_eq!(va.cmp(&vb), a.cmp(&b));
        }

        #[test]
        fn display_parse_roundtrip(n in 1u64..u64::MAX) {
            let id = VersionId::new(n);
            let parsed: VersionId = id.to_string().parse().unwrap();
            prop_assert_eq!(parsed, id);
            prop_assert_eq!(parsed.next().unwrap().previous().unwrap(), id);
        }
    }
}
