use crate::error::{Error, Result};
use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A four-component mod or game version. The textual form may carry two to
/// four dot-separated components; missing trailing components are zero.
/// Comparison is lexicographic across all four components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version([u16; 4]);

impl Version {
    pub fn new(major: u16, minor: u16, patch: u16, build: u16) -> Self {
        Self([major, minor, patch, build])
    }

    pub fn major(&self) -> u16 {
        self.0[0]
    }

    pub fn minor(&self) -> u16 {
        self.0[1]
    }

    pub fn components(&self) -> [u16; 4] {
        self.0
    }

    /// Renders `major.minor.patch`, or all four components when
    /// `include_build` is set. The save-file header version is the only
    /// place the build number is meaningful.
    pub fn display(&self, include_build: bool) -> String {
        if include_build {
            format!("{}.{}.{}.{}", self.0[0], self.0[1], self.0[2], self.0[3])
        } else {
            format!("{}.{}.{}", self.0[0], self.0[1], self.0[2])
        }
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        let input = input.trim();
        let parts: Vec<&str> = input.split('.').collect();
        if parts.len() < 2 || parts.len() > 4 {
            return Err(Error::InvalidVersionFormat(input.to_string()));
        }
        let mut components = [0u16; 4];
        for (i, part) in parts.iter().enumerate() {
            components[i] = part
                .parse::<u16>()
                .map_err(|_| Error::InvalidVersionFormat(input.to_string()))?;
        }
        Ok(Self(components))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display(false))
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.display(false))
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct VersionVisitor;

        impl Visitor<'_> for VersionVisitor {
            type Value = Version;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a version string with 2 to 4 numeric components")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Version, E> {
                value.parse().map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_str(VersionVisitor)
    }
}

/// A comparison operator from the dependency grammar. `Any` is the absence
/// of an operator and always passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VersionOp {
    #[default]
    Any,
    Eq,
    Gt,
    GtEq,
    Lt,
    LtEq,
}

impl VersionOp {
    pub fn matches(self, ordering: Ordering) -> bool {
        match self {
            VersionOp::Any => true,
            VersionOp::Eq => ordering == Ordering::Equal,
            VersionOp::Gt => ordering == Ordering::Greater,
            VersionOp::GtEq => ordering != Ordering::Less,
            VersionOp::Lt => ordering == Ordering::Less,
            VersionOp::LtEq => ordering != Ordering::Greater,
        }
    }
}

impl fmt::Display for VersionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VersionOp::Any => "",
            VersionOp::Eq => "=",
            VersionOp::Gt => ">",
            VersionOp::GtEq => ">=",
            VersionOp::Lt => "<",
            VersionOp::LtEq => "<=",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_and_format() {
        let cases = [
            ("1.0", "1.0.0", "1.0.0.0", [1, 0, 0, 0]),
            ("1.1.15", "1.1.15", "1.1.15.0", [1, 1, 15, 0]),
            ("2.3.4.5", "2.3.4", "2.3.4.5", [2, 3, 4, 5]),
            ("010.001.0100.0000001", "10.1.100", "10.1.100.1", [10, 1, 100, 1]),
        ];
        for (input, short, long, parts) in cases {
            let ver: Version = input.parse().unwrap();
            assert_eq!(ver, Version(parts));
            assert_eq!(ver.display(false), short);
            assert_eq!(ver.display(true), long);
        }
    }

    #[test]
    fn parse_rejects_bad_input() {
        for input in ["1", "1.2.3.4.5", "a.b", "1.-2", "70000.0", ""] {
            assert!(input.parse::<Version>().is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn ordering() {
        let v = |s: &str| s.parse::<Version>().unwrap();
        assert_eq!(v("1.3.1").cmp(&v("2.0")), Ordering::Less);
        assert_eq!(v("1.5.3").cmp(&v("1.5.2")), Ordering::Greater);
        assert_eq!(v("1.5").cmp(&v("1.5.0.0")), Ordering::Equal);
    }

    #[test]
    fn operator_matching() {
        assert!(VersionOp::Any.matches(Ordering::Less));
        assert!(VersionOp::GtEq.matches(Ordering::Equal));
        assert!(VersionOp::GtEq.matches(Ordering::Greater));
        assert!(!VersionOp::GtEq.matches(Ordering::Less));
        assert!(!VersionOp::Gt.matches(Ordering::Equal));
        assert!(VersionOp::LtEq.matches(Ordering::Equal));
        assert!(!VersionOp::Lt.matches(Ordering::Equal));
    }

    #[test]
    fn json_round_trip() {
        let ver: Version = serde_json::from_str("\"1.1.87\"").unwrap();
        assert_eq!(ver, Version([1, 1, 87, 0]));
        assert_eq!(serde_json::to_string(&ver).unwrap(), "\"1.1.87\"");
    }
}
