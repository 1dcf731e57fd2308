use crate::version::{Version, VersionOp};
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use std::fmt;

/// How a declared dependency constrains the dependent mod.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DependencyKind {
    #[default]
    Required,
    Optional,
    HiddenOptional,
    Incompatible,
    NoLoadOrder,
}

impl DependencyKind {
    fn sigil(self) -> &'static str {
        match self {
            DependencyKind::Required => "",
            DependencyKind::Optional => "? ",
            DependencyKind::HiddenOptional => "(?) ",
            DependencyKind::Incompatible => "! ",
            DependencyKind::NoLoadOrder => "~ ",
        }
    }
}

/// One edge of the dependency graph: a name, a kind sigil, and an optional
/// comparison against a version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub version: Option<Version>,
    pub kind: DependencyKind,
    pub op: VersionOp,
}

impl Dependency {
    pub fn required(name: impl Into<String>, op: VersionOp, version: Option<Version>) -> Self {
        Self {
            name: name.into(),
            version,
            kind: DependencyKind::Required,
            op,
        }
    }

    /// Parses the dependency grammar: an optional leading kind sigil
    /// (`!`, `?`, `(?)`, `~`), a name, an optional trailing comparison
    /// operator, and an optional version. Whitespace around the operator is
    /// not significant: `"flib>=0.10"` and `"flib >= 0.10"` are equivalent.
    pub fn parse(input: &str) -> Self {
        let mut rest = input.trim();

        let kind = if let Some(stripped) = rest.strip_prefix("(?)") {
            rest = stripped;
            DependencyKind::HiddenOptional
        } else if let Some(stripped) = rest.strip_prefix('!') {
            rest = stripped;
            DependencyKind::Incompatible
        } else if let Some(stripped) = rest.strip_prefix('?') {
            rest = stripped;
            DependencyKind::Optional
        } else if let Some(stripped) = rest.strip_prefix('~') {
            rest = stripped;
            DependencyKind::NoLoadOrder
        } else {
            DependencyKind::Required
        };
        rest = rest.trim();

        // A trailing run of digits and dots is only a version if it is
        // preceded by whitespace or an operator character. A name may itself
        // end in digits and dots.
        let mut version = None;
        let tail_start = rest
            .rfind(|c: char| !c.is_ascii_digit() && c != '.')
            .map(|i| i + c_len(rest, i));
        if let Some(start) = tail_start {
            if start < rest.len() {
                if let Some(sep) = rest[..start].chars().next_back() {
                    if sep.is_whitespace() || matches!(sep, '<' | '>' | '=') {
                        if let Ok(parsed) = rest[start..].parse::<Version>() {
                            version = Some(parsed);
                            rest = rest[..start].trim_end();
                        }
                    }
                }
            }
        }

        let mut op = VersionOp::Any;
        for (token, candidate) in [
            ("<=", VersionOp::LtEq),
            (">=", VersionOp::GtEq),
            ("<", VersionOp::Lt),
            (">", VersionOp::Gt),
            ("=", VersionOp::Eq),
        ] {
            if let Some(stripped) = rest.strip_suffix(token) {
                op = candidate;
                rest = stripped.trim_end();
                break;
            }
        }

        Self {
            name: rest.trim().to_string(),
            version,
            kind,
            op,
        }
    }

    /// Tests a candidate version against this constraint. A `None` candidate
    /// always passes (an unconstrained candidate is assumed compatible), an
    /// `Incompatible` dependency never passes, and a missing required
    /// version compares as equal.
    pub fn test(&self, candidate: Option<&Version>) -> bool {
        let Some(candidate) = candidate else {
            return true;
        };
        if self.kind == DependencyKind::Incompatible {
            return false;
        }
        match &self.version {
            None => self.op.matches(std::cmp::Ordering::Equal),
            Some(required) => self.op.matches(candidate.cmp(required)),
        }
    }
}

// Byte offset just past the char starting at `i`.
fn c_len(s: &str, i: usize) -> usize {
    s[i..].chars().next().map_or(0, char::len_utf8)
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.sigil(), self.name)?;
        if self.op != VersionOp::Any {
            write!(f, " {}", self.op)?;
        }
        if let Some(version) = &self.version {
            write!(f, " {version}")?;
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for Dependency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DependencyVisitor;

        impl Visitor<'_> for DependencyVisitor {
            type Value = Dependency;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a dependency string")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Dependency, E> {
                Ok(Dependency::parse(value))
            }
        }

        deserializer.deserialize_str(DependencyVisitor)
    }
}
