//! Application configuration management.
//!
//! Holds the data directory override, the file-logging switch, and the last
//! used list filters so the CLI can pick up where it left off.
//!
//! Configuration is stored at `~/.config/dinecache/config.json`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::query::Filter;

/// Application name used for config/data directory paths
const APP_NAME: &str = "dinecache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Where the restaurant database lives. Defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,
    /// Also write logs to daily files under `<data dir>/logs`
    pub log_to_file: bool,
    pub cuisine: Option<String>,
    pub neighborhood: Option<String>,
    pub favorites_only: bool,
    pub last_restaurant_id: Option<i64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the restaurant database.
    pub fn store_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn log_dir(&self) -> Result<PathBuf> {
        Ok(self.store_dir()?.join("logs"))
    }

    pub fn cuisine_filter(&self) -> Filter {
        self.cuisine.as_deref().map(Filter::parse).unwrap_or_default()
    }

    pub fn neighborhood_filter(&self) -> Filter {
        self.neighborhood.as_deref().map(Filter::parse).unwrap_or_default()
    }

    /// Remember the filters of the last listing. `all` is stored as unset.
    pub fn remember_filters(&mut self, cuisine: &Filter, neighborhood: &Filter, favorites_only: bool) {
        self.cuisine = match cuisine {
            Filter::All => None,
            Filter::Only(value) => Some(value.clone()),
        };
        self.neighborhood = match neighborhood {
            Filter::All => None,
            Filter::Only(value) => Some(value.clone()),
        };
        self.favorites_only = favorites_only;
    }
}
