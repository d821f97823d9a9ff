//! Optional TOML settings file.
//!
//! ```toml
//! tree_style = "ascii"
//! show_types = true
//!
//! [fmt]
//! indent = 4
//! sort_keys = true
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::format::FormatOptions;
use crate::render::TreeStyle;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tree_style: Option<TreeStyle>,
    pub show_types: bool,
    pub fmt: FmtConfig,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct FmtConfig {
    pub indent: usize,
    pub sort_keys: bool,
}

impl Default for FmtConfig {
    fn default() -> Self {
        Self {
            indent: 2,
            sort_keys: false,
        }
    }
}

impl From<FmtConfig> for FormatOptions {
    fn from(fmt: FmtConfig) -> Self {
        FormatOptions {
            indent: fmt.indent,
            sort_keys: fmt.sort_keys,
        }
    }
}

/// `<config dir>/yam/config.toml`, when the platform has a config dir.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("yam").join("config.toml"))
}

/// Loads settings. An explicit path must exist and parse; the default
/// location is skipped silently when absent.
pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_path() {
            Some(path) if path.is_file() => path,
            _ => return Ok(Config::default()),
        },
    };
    load_file(&path)
}

pub fn load_file(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = from_toml(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(target: "config", file = %path.display(), ?config, "config_loaded");
    Ok(config)
}

pub fn from_toml(content: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(content)
}
