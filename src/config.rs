use serde::{Deserialize, Serialize};
use std::{
    fs::{read_to_string, write},
    path::{Path, PathBuf},
};

use crate::{codec::ParseOptions, error::LamadError};

pub const DEFAULT_CONFIG_FILE: &str = "lamad.toml";
pub const DEFAULT_OUTPUT_DIR: &str = "features";
pub const DEFAULT_EPIC_FILE_NAME: &str = "epic.md";

/// Settings read from `lamad.toml`. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LamadConfig {
    /// Root of the documentation tree that artifacts are listed from.
    pub docs_root: PathBuf,
    /// Where exported `.feature` files and the manifest are written.
    pub output_dir: PathBuf,
    /// Report skipped Gherkin lines as warnings.
    pub strict: bool,
    /// Export only features whose tags match one of these. Empty exports everything.
    pub filter_tags: Vec<String>,
    /// Markdown file names compiled as epics even without `type: epic` front matter.
    pub epic_file_names: Vec<String>,
}

impl Default for LamadConfig {
    fn default() -> Self {
        LamadConfig {
            docs_root: PathBuf::from("."),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            strict: false,
            filter_tags: Vec::new(),
            epic_file_names: vec![DEFAULT_EPIC_FILE_NAME.to_string()],
        }
    }
}

impl LamadConfig {
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            strict: self.strict,
        }
    }
}

pub trait ConfigProvider: Send + Sync {
    fn load(&self) -> Result<LamadConfig, LamadError>;
    fn store(&self, config: &LamadConfig) -> Result<(), LamadError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfigProvider {
    path: PathBuf,
}

impl TomlConfigProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TomlConfigProvider { path: path.into() }
    }

    /// `lamad.toml` inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(DEFAULT_CONFIG_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigProvider for TomlConfigProvider {
    fn load(&self) -> Result<LamadConfig, LamadError> {
        tracing::debug!("Attempting to read config from: {:?}", &self.path);
        if !self.path.exists() {
            tracing::debug!("Config file not found, using defaults.");
            return Ok(LamadConfig::default());
        }
        let content = read_to_string(&self.path)?;
        toml::from_str(&content).map_err(|e| {
            LamadError::Config(format!("{}: {}", self.path.display(), e.message()))
        })
    }

    fn store(&self, config: &LamadConfig) -> Result<(), LamadError> {
        tracing::debug!("Attempting to write config to: {:?}", &self.path);
        let toml_string = toml::to_string_pretty(config)?;
        write(&self.path, toml_string)?;
        Ok(())
    }
}
