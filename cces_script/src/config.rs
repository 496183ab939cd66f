//! Optional `cces.toml` configuration.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use cces_data::Roster;
use log::debug;
use serde::Deserialize;

/// Looked up in the working directory when no config file is given.
pub const DEFAULT_CONFIG_FILE: &str = "cces.toml";
/// Manifest location, relative to the output root.
pub const DEFAULT_PATCH_FILE: &str = "./assets/data/database.json.patch";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Settings shared by every compile run. Command-line flags take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// JSON indentation width; compact output when unset.
    pub indent: Option<usize>,
    pub out_dir: Option<PathBuf>,
    pub patch_file: Option<PathBuf>,
    /// Extra roster entries, display name to internal id.
    pub characters: BTreeMap<String, String>,
}

impl Config {
    /// # Errors
    /// Returns the TOML error if `text` is not a valid configuration.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// # Errors
    /// [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("loaded config from '{}'", path.display());
        Ok(config)
    }

    /// Load `explicit` if given, else [`DEFAULT_CONFIG_FILE`] if it exists,
    /// else the defaults.
    ///
    /// # Errors
    /// [`ConfigError`] if a config file is present but unusable.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::load(fallback)
                } else {
                    Ok(Self::default())
                }
            },
        }
    }

    /// Built-in characters extended by the `[characters]` table.
    pub fn roster(&self) -> Roster {
        Roster::default().with_entries(self.characters.iter().map(|(name, id)| (name, id.clone())))
    }

    pub fn out_dir(&self) -> PathBuf {
        self.out_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn patch_file(&self) -> PathBuf {
        self.patch_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PATCH_FILE))
    }
}
