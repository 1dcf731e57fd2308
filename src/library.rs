use crate::dependency::Dependency;
use crate::error::{Error, Result};
use crate::ident::ModIdent;
use crate::version::{Version, VersionOp};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Reserved filenames inside a mods directory that are never mod entries.
pub const MOD_LIST_NAME: &str = "mod-list.json";
pub const MOD_SETTINGS_NAME: &str = "mod-settings.dat";

/// The `info.json` fields the manager consumes.
#[derive(Debug, Deserialize)]
struct InfoJson {
    name: String,
    version: Version,
    #[serde(default)]
    dependencies: Vec<Dependency>,
}

/// One concrete version of a mod on disk, either a zip file or an unpacked
/// directory. Immutable after the index scan.
#[derive(Debug, Clone)]
pub struct Release {
    pub name: String,
    pub version: Version,
    pub dependencies: Vec<Dependency>,
    pub path: PathBuf,
    pub is_internal: bool,
}

impl Release {
    /// Reads one mod entry: `<path>/info.json` for a directory or symlink,
    /// or the single-nested `<root>/info.json` entry of a zip file. The
    /// filename-derived identity must agree with the `info.json` identity.
    pub fn from_path(path: &Path, is_internal: bool) -> Result<Self> {
        let metadata = std::fs::metadata(path)?;
        let info: InfoJson = if metadata.is_dir() {
            let file = File::open(path.join("info.json"))?;
            serde_json::from_reader(file)?
        } else {
            read_zip_info_json(path)?
        };

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ident = ModIdent::parse(&filename);
        if ident.name == info.name && ident.version.is_some_and(|v| v != info.version) {
            return Err(Error::InvalidReleaseFilename(filename));
        }

        Ok(Self {
            name: info.name,
            version: info.version,
            dependencies: info.dependencies,
            path: path.to_path_buf(),
            is_internal,
        })
    }

    pub fn ident(&self) -> ModIdent {
        ModIdent::new(self.name.clone(), Some(self.version))
    }
}

fn read_zip_info_json(path: &Path) -> Result<InfoJson> {
    let mut archive = ZipArchive::new(File::open(path)?)?;
    let entry_name = archive
        .file_names()
        .find(|name| {
            let mut parts = name.split('/');
            parts.next().is_some()
                && parts.next() == Some("info.json")
                && parts.next().is_none()
        })
        .map(ToString::to_string)
        .ok_or_else(|| {
            Error::InvalidReleaseFilename(path.to_string_lossy().into_owned())
        })?;
    let mut entry = archive.by_name(&entry_name)?;
    let mut contents = String::new();
    entry.read_to_string(&mut contents)?;
    Ok(serde_json::from_str(&contents)?)
}

/// All known releases of one mod, sorted ascending by version, plus the
/// enabled state the manager mutates. `enabled: None` means disabled.
#[derive(Debug)]
pub struct Mod {
    pub name: String,
    pub enabled: Option<Version>,
    pub is_internal: bool,
    releases: Vec<Release>,
}

impl Mod {
    pub fn releases(&self) -> &[Release] {
        &self.releases
    }

    pub fn latest_release(&self) -> &Release {
        // An indexed mod always has at least one release.
        self.releases.last().expect("mod with no releases")
    }

    /// The release for an exact version, or the newest when unspecified.
    pub fn release_for(&self, version: Option<&Version>) -> Option<&Release> {
        match version {
            None => Some(self.latest_release()),
            Some(version) => self.matching_release(&Dependency::required(
                self.name.clone(),
                VersionOp::Eq,
                Some(*version),
            )),
        }
    }

    /// Newest-first scan for the first release satisfying the constraint:
    /// among multiple satisfying releases, the highest version wins.
    pub fn matching_release(&self, dep: &Dependency) -> Option<&Release> {
        self.releases
            .iter()
            .rev()
            .find(|release| dep.test(Some(&release.version)))
    }
}

/// The name → releases map built from one scan of the mods directory and the
/// game's internal mods directory.
#[derive(Debug, Default)]
pub struct ModIndex {
    mods: HashMap<String, Mod>,
}

impl ModIndex {
    /// Scans both directories non-recursively. Internal entries must be
    /// `info.json`-bearing directories; anything else there is skipped. In
    /// the mods directory every entry other than the two reserved files must
    /// be a valid release.
    pub fn scan(mods_dir: &Path, internal_dir: &Path) -> Result<Self> {
        let mut index = Self::default();

        for entry in std::fs::read_dir(internal_dir)? {
            let entry = entry?;
            let path = entry.path();
            let filename = entry.file_name().to_string_lossy().into_owned();
            if filename == "core" || !path.is_dir() {
                continue;
            }
            // Not every directory in there is a mod.
            if !path.join("info.json").is_file() {
                continue;
            }
            index.add_release(Release::from_path(&path, true)?);
        }

        for entry in std::fs::read_dir(mods_dir)? {
            let entry = entry?;
            let filename = entry.file_name().to_string_lossy().into_owned();
            if filename == MOD_LIST_NAME || filename == MOD_SETTINGS_NAME {
                continue;
            }
            index.add_release(Release::from_path(&entry.path(), false)?);
        }

        Ok(index)
    }

    pub fn add_release(&mut self, release: Release) {
        let entry = self
            .mods
            .entry(release.name.clone())
            .or_insert_with(|| Mod {
                name: release.name.clone(),
                enabled: None,
                is_internal: release.is_internal,
                releases: Vec::new(),
            });
        entry.releases.push(release);
        entry.releases.sort_by(|a, b| a.version.cmp(&b.version));
    }

    pub fn get(&self, name: &str) -> Option<&Mod> {
        self.mods.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Mod> {
        self.mods.get_mut(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mod> {
        self.mods.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Mod> {
        self.mods.values_mut()
    }

    pub fn len(&self) -> usize {
        self.mods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mods.is_empty()
    }
}
