use crate::version::Version;
use std::fmt;

/// A loose reference to a mod: a name plus an optional version. `None` means
/// any version is acceptable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModIdent {
    pub name: String,
    pub version: Option<Version>,
}

impl ModIdent {
    pub fn new(name: impl Into<String>, version: Option<Version>) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// Parses `name`, `name_version`, or `name_version.zip`. The trailing
    /// token is only treated as a version if it parses as one; otherwise the
    /// whole input is the name.
    pub fn parse(input: &str) -> Self {
        let input = input.strip_suffix(".zip").unwrap_or(input);
        if let Some((name, tail)) = input.rsplit_once('_') {
            if let Ok(version) = tail.parse::<Version>() {
                return Self::new(name, Some(version));
            }
        }
        Self::new(input, None)
    }
}

impl fmt::Display for ModIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{} {}", self.name, version),
            None => f.write_str(&self.name),
        }
    }
}
