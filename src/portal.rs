use crate::dependency::Dependency;
use crate::error::{Error, Result};
use crate::version::Version;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const USER_AGENT: &str = concat!("gearsmith/", env!("CARGO_PKG_VERSION"));

/// Registry information for one mod.
#[derive(Debug, Clone, Deserialize)]
pub struct PortalModInfo {
    pub name: String,
    #[serde(default)]
    pub title: String,
    /// Sorted oldest-first by the registry.
    pub releases: Vec<PortalRelease>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortalRelease {
    pub version: Version,
    pub download_url: String,
    pub file_name: String,
    pub info_json: PortalReleaseInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PortalReleaseInfo {
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

impl PortalRelease {
    /// A remote release is compatible with the installed base game if it
    /// declares no dependency on `base`, or if its declared base major/minor
    /// matches the installed one and its version constraint passes.
    pub fn compatible_with_base(&self, base_version: Option<&Version>) -> bool {
        let Some(base_version) = base_version else {
            return true;
        };
        for dep in &self.info_json.dependencies {
            if dep.name != "base" {
                continue;
            }
            return match &dep.version {
                None => true,
                Some(required) => {
                    required.major() == base_version.major()
                        && required.minor() == base_version.minor()
                        && dep.test(Some(base_version))
                }
            };
        }
        true
    }
}

/// Read-only client for the remote mod registry. Responses are cached per
/// run, keyed by mod name. Download and upload flows are out of scope; the
/// resolver only needs release metadata.
pub struct Portal {
    server: String,
    base_version: Option<Version>,
    cache: HashMap<String, PortalModInfo>,
    agent: ureq::Agent,
}

impl Portal {
    pub fn new(server: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(Duration::from_secs(10))
            .timeout_write(Duration::from_secs(10))
            .build();
        Self {
            server: server.into(),
            base_version: None,
            cache: HashMap::new(),
            agent,
        }
    }

    pub fn set_base_version(&mut self, version: Version) {
        self.base_version = Some(version);
    }

    pub fn base_version(&self) -> Option<&Version> {
        self.base_version.as_ref()
    }

    /// `GET <server>/api/mods/<name>/full`, served from the cache when the
    /// mod was already looked up during this run.
    pub fn mod_info(&mut self, name: &str) -> Result<&PortalModInfo> {
        if !self.cache.contains_key(name) {
            let url = format!("{}/api/mods/{}/full", self.server, name);
            let response = self
                .agent
                .get(&url)
                .set("User-Agent", USER_AGENT)
                .call()
                .map_err(|err| match err {
                    ureq::Error::Status(404, _) => Error::ModNotFoundPortal(name.to_string()),
                    other => Error::from(other),
                })?;
            let info: PortalModInfo = response.into_json()?;
            self.cache.insert(name.to_string(), info);
        }
        Ok(&self.cache[name])
    }

    /// The newest registry release that satisfies the dependency and is
    /// compatible with the installed base version.
    pub fn matching_release(&mut self, dep: &Dependency) -> Result<PortalRelease> {
        let base_version = self.base_version;
        let info = self.mod_info(&dep.name)?;
        info.releases
            .iter()
            .rev()
            .find(|release| {
                dep.test(Some(&release.version))
                    && release.compatible_with_base(base_version.as_ref())
            })
            .cloned()
            .ok_or_else(|| Error::NoCompatibleRelease(dep.name.clone()))
    }

    /// Seeds the cache without going over the network. Used by tests.
    #[cfg(test)]
    pub(crate) fn seed(&mut self, info: PortalModInfo) {
        self.cache.insert(info.name.clone(), info);
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn portal_release(version: &str, deps: &[&str]) -> PortalRelease {
        PortalRelease {
            version: version.parse().unwrap(),
            download_url: format!("download/{version}"),
            file_name: format!("mod_{version}.zip"),
            info_json: PortalReleaseInfo {
                dependencies: deps.iter().map(|dep| Dependency::parse(dep)).collect(),
            },
        }
    }

    pub fn portal_mod(name: &str, releases: Vec<PortalRelease>) -> PortalModInfo {
        PortalModInfo {
            name: name.to_string(),
            title: name.to_string(),
            releases,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_registry_response() {
        let body = r#"{
            "name": "flib",
            "title": "Factorio Library",
            "releases": [
                {
                    "version": "0.1.0",
                    "download_url": "/download/flib/abc",
                    "file_name": "flib_0.1.0.zip",
                    "info_json": {"dependencies": ["base >= 0.18"]}
                },
                {
                    "version": "0.12.9",
                    "download_url": "/download/flib/def",
                    "file_name": "flib_0.12.9.zip",
                    "info_json": {"dependencies": ["base >= 1.1"]}
                }
            ]
        }"#;
        let info: PortalModInfo = serde_json::from_str(body).unwrap();
        assert_eq!(info.name, "flib");
        assert_eq!(info.releases.len(), 2);
        assert_eq!(info.releases[1].version, "0.12.9".parse().unwrap());
        assert_eq!(info.releases[1].info_json.dependencies[0].name, "base");
    }

    #[test]
    fn matching_release_prefers_newest_compatible() {
        let mut portal = Portal::new("http://unused.invalid");
        portal.set_base_version("1.1.87".parse().unwrap());
        portal.seed(portal_mod(
            "flib",
            vec![
                portal_release("0.1.0", &["base >= 0.18"]),
                portal_release("0.12.9", &["base >= 1.1"]),
                portal_release("0.13.0", &["base >= 2.0"]),
            ],
        ));

        let release = portal
            .matching_release(&Dependency::parse("flib"))
            .unwrap();
        // 0.13.0 requires base 2.x, which does not match the installed 1.1.
        assert_eq!(release.version, "0.12.9".parse().unwrap());
    }

    #[test]
    fn base_compatibility_rules() {
        let base: Version = "1.1.87".parse().unwrap();
        assert!(portal_release("1.0.0", &[]).compatible_with_base(Some(&base)));
        assert!(portal_release("1.0.0", &["base"]).compatible_with_base(Some(&base)));
        assert!(portal_release("1.0.0", &["base >= 1.1"]).compatible_with_base(Some(&base)));
        assert!(!portal_release("1.0.0", &["base >= 1.0"]).compatible_with_base(Some(&base)));
        assert!(!portal_release("1.0.0", &["base >= 2.0"]).compatible_with_base(Some(&base)));
        assert!(portal_release("1.0.0", &["base >= 2.0"]).compatible_with_base(None));
    }

    #[test]
    fn no_satisfying_release_is_an_error() {
        let mut portal = Portal::new("http://unused.invalid");
        portal.seed(portal_mod("flib", vec![portal_release("0.1.0", &[])]));
        let err = portal
            .matching_release(&Dependency::parse("flib >= 1.0"))
            .unwrap_err();
        assert!(matches!(err, Error::NoCompatibleRelease(name) if name == "flib"));
    }
}
