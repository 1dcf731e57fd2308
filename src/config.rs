use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

const DEFAULT_PORTAL_URL: &str = "https://mods.factorio.com";

/// Persistent user configuration, stored as `config.json` under the
/// platform-local data directory. Command-line flags override any of it for
/// one invocation without being written back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// The game installation directory. Empty until the user sets it.
    #[serde(default)]
    pub game_dir: PathBuf,
    /// Defaults to `<game_dir>/mods` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mods_dir: Option<PathBuf>,
    #[serde(default = "default_portal_url")]
    pub portal_url: String,
}

impl Config {
    pub fn load_or_create() -> Result<Self> {
        let base_dir = base_data_dir()?;
        fs::create_dir_all(&base_dir).context("create app data dir")?;
        let path = base_dir.join("config.json");
        if path.exists() {
            let raw = fs::read_to_string(&path).context("read config")?;
            return serde_json::from_str(&raw).context("parse config");
        }

        let config = Config {
            game_dir: PathBuf::new(),
            mods_dir: None,
            portal_url: DEFAULT_PORTAL_URL.to_string(),
        };
        config.save()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let base_dir = base_data_dir()?;
        fs::create_dir_all(&base_dir).context("create app data dir")?;
        let raw = serde_json::to_string_pretty(self).context("serialize config")?;
        fs::write(base_dir.join("config.json"), raw).context("write config")?;
        Ok(())
    }

    pub fn mods_dir(&self) -> PathBuf {
        self.mods_dir
            .clone()
            .unwrap_or_else(|| self.game_dir.join("mods"))
    }
}

fn default_portal_url() -> String {
    DEFAULT_PORTAL_URL.to_string()
}

fn base_data_dir() -> Result<PathBuf> {
    let base = BaseDirs::new().context("resolve home dir")?;
    Ok(base.data_local_dir().join("gearsmith"))
}
