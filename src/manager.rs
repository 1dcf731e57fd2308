use crate::error::{Error, Result};
use crate::ident::ModIdent;
use crate::library::{Mod, ModIndex, MOD_LIST_NAME, MOD_SETTINGS_NAME};
use crate::portal::Portal;
use crate::property_tree::{ModSettings, PropertyTree};
use crate::resolver::{Resolution, Resolver};
use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Explicit construction parameters; there is no process-global state.
#[derive(Debug, Clone)]
pub struct ManagerOptions {
    pub game_dir: PathBuf,
    pub mods_dir: PathBuf,
    pub portal_url: String,
    /// When unset, [`Manager::save`] is a no-op.
    pub persist: bool,
}

/// The on-disk `mod-list.json` document.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ModListJson {
    mods: Vec<ModListJsonMod>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ModListJsonMod {
    name: String,
    enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<Version>,
    #[serde(skip)]
    is_internal: bool,
}

/// Owns the enabled/disabled state for a mods directory and persists it.
///
/// A game directory is considered valid if its internal mods directory
/// carries `base/info.json`. Internal mods are auto-enabled at construction;
/// `mod-list.json` and `mod-settings.dat` are then applied on top when they
/// exist.
pub struct Manager {
    index: ModIndex,
    portal: Portal,
    settings: Option<ModSettings>,
    mod_list_path: PathBuf,
    settings_path: PathBuf,
    persist: bool,
}

impl Manager {
    pub fn new(options: ManagerOptions) -> Result<Self> {
        let internal_dir = options.game_dir.join("data");
        if !internal_dir.join("base").join("info.json").is_file() {
            return Err(Error::InvalidGameDirectory(options.game_dir));
        }
        if !options.mods_dir.is_dir() {
            return Err(Error::InvalidGameDirectory(options.mods_dir));
        }

        let index = ModIndex::scan(&options.mods_dir, &internal_dir)?;
        let mut portal = Portal::new(options.portal_url);
        if let Some(base) = index.get("base") {
            portal.set_base_version(base.latest_release().version);
        }

        let mut manager = Self {
            index,
            portal,
            settings: None,
            mod_list_path: options.mods_dir.join(MOD_LIST_NAME),
            settings_path: options.mods_dir.join(MOD_SETTINGS_NAME),
            persist: options.persist,
        };

        for entry in manager.index.iter_mut() {
            if entry.is_internal {
                entry.enabled = Some(entry.latest_release().version);
            }
        }
        manager.apply_mod_list()?;

        if manager.settings_path.is_file() {
            let bytes = std::fs::read(&manager.settings_path)?;
            manager.settings = Some(ModSettings::decode(&bytes)?);
        }

        Ok(manager)
    }

    fn apply_mod_list(&mut self) -> Result<()> {
        if !self.mod_list_path.is_file() {
            return Ok(());
        }
        let raw = std::fs::read_to_string(&self.mod_list_path)?;
        let list: ModListJson = serde_json::from_str(&raw)?;
        for entry in list.mods {
            if !entry.enabled {
                continue;
            }
            let Some(entry_mod) = self.index.get_mut(&entry.name) else {
                continue;
            };
            if let Some(release) = entry_mod.release_for(entry.version.as_ref()) {
                let version = release.version;
                entry_mod.enabled = Some(version);
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Mod> {
        self.index
            .get(name)
            .ok_or_else(|| Error::ModNotFoundLocal(name.to_string()))
    }

    /// All known mods, sorted by name, with every release.
    pub fn mods(&self) -> Vec<&Mod> {
        let mut mods: Vec<&Mod> = self.index.iter().collect();
        mods.sort_by(|a, b| a.name.cmp(&b.name));
        mods
    }

    /// Enables the release matching the identifier (newest when no version
    /// is given). Enabling the already-enabled version is a no-op returning
    /// `None`; otherwise returns the version that was applied.
    pub fn enable(&mut self, ident: &ModIdent) -> Result<Option<Version>> {
        let entry = self
            .index
            .get_mut(&ident.name)
            .ok_or_else(|| Error::ModNotFoundLocal(ident.name.clone()))?;
        let release = entry
            .release_for(ident.version.as_ref())
            .ok_or_else(|| Error::NoCompatibleRelease(ident.name.clone()))?;
        let version = release.version;
        if entry.enabled == Some(version) {
            return Ok(None);
        }
        entry.enabled = Some(version);
        Ok(Some(version))
    }

    /// Disables the mod. Internal mods stay enabled: attempting to disable
    /// one warns and is otherwise a no-op.
    pub fn disable(&mut self, name: &str) -> Result<()> {
        let entry = self
            .index
            .get_mut(name)
            .ok_or_else(|| Error::ModNotFoundLocal(name.to_string()))?;
        if entry.is_internal {
            eprintln!("Warning: {name} is a built-in mod and stays enabled");
            return Ok(());
        }
        if entry.enabled.is_none() {
            return Err(Error::ModAlreadyDisabled(name.to_string()));
        }
        entry.enabled = None;
        Ok(())
    }

    /// Disables every non-internal mod. Idempotent.
    pub fn disable_all(&mut self) {
        for entry in self.index.iter_mut() {
            if !entry.is_internal {
                entry.enabled = None;
            }
        }
    }

    /// Expands the given identifiers into the full dependency-resolved set.
    pub fn expand_dependencies(
        &mut self,
        seeds: &[ModIdent],
        allow_remote_fetch: bool,
    ) -> Resolution {
        Resolver::new(&self.index, &mut self.portal, allow_remote_fetch).expand(seeds)
    }

    /// Shallow-merges every key of the given dict into the `startup` section
    /// of the settings document, synthesizing an empty document at the base
    /// mod's version when none is loaded yet. The next save rewrites the
    /// settings file in full.
    pub fn merge_startup_settings(&mut self, input: &PropertyTree) -> Result<()> {
        let input = match input {
            PropertyTree::None => return Ok(()),
            PropertyTree::Dict(dict) => dict,
            _ => return Err(Error::MalformedSettings("startup settings must be a dict")),
        };

        let base_version = self.get("base")?.latest_release().version;
        let settings = self
            .settings
            .get_or_insert_with(|| ModSettings::empty(base_version));
        let startup = settings
            .tree
            .as_dict_mut()
            .and_then(|tree| tree.get_mut("startup"))
            .and_then(PropertyTree::as_dict_mut)
            .ok_or(Error::MalformedSettings("missing startup section"))?;
        for (key, value) in input {
            startup.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    pub fn startup_settings(&self) -> Option<&PropertyTree> {
        self.settings.as_ref().and_then(|s| s.tree.get("startup"))
    }

    /// Writes `mod-list.json` (internal mods first, then by name, then by
    /// version) and, when a settings document is loaded, rewrites
    /// `mod-settings.dat` in full. A no-op when persistence is disabled.
    pub fn save(&self) -> Result<()> {
        if !self.persist {
            return Ok(());
        }

        let mut list = ModListJson::default();
        for entry in self.index.iter() {
            list.mods.push(ModListJsonMod {
                name: entry.name.clone(),
                enabled: entry.enabled.is_some(),
                version: entry.enabled,
                is_internal: entry.is_internal,
            });
        }
        list.mods.sort_by(|a, b| {
            b.is_internal
                .cmp(&a.is_internal)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.version.cmp(&b.version))
        });

        let raw = serde_json::to_string_pretty(&list)?;
        std::fs::write(&self.mod_list_path, raw)?;

        if let Some(settings) = &self.settings {
            std::fs::write(&self.settings_path, settings.encode())?;
        }
        Ok(())
    }
}
