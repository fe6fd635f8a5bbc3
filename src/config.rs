//! Configuration for dicto.
//!
//! Loads a TOML config (default `dicto.toml` in the project root). Every
//! field has a default, so an empty file is a valid config.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{DictoError, Result};

/// Default config file name, looked up in the project root.
pub const CONFIG_FILE_NAME: &str = "dicto.toml";

/// Top-level dicto configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DictoConfig {
    pub project: ProjectConfig,
    pub index: IndexConfig,
    pub rules: RulesConfig,
}

impl DictoConfig {
    /// Load configuration from the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| DictoError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| {
            DictoError::configuration(format!("{}: {}", path.display(), e))
        })
    }

    /// Save configuration to the given path.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| DictoError::configuration(e.to_string()))?;
        std::fs::write(path, content).map_err(|source| DictoError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `dicto.toml` from `root`, or return defaults rooted there if the
    /// file doesn't exist.
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE_NAME);
        let mut config = if path.exists() {
            Self::load(&path)?
        } else {
            Self::default()
        };
        if config.project.root.is_relative() {
            config.project.root = root.join(&config.project.root);
        }
        Ok(config)
    }
}

/// Where the sources live and which files count as sources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project root; indexed paths are recorded relative to it.
    pub root: PathBuf,
    /// File extensions to index.
    pub extensions: Vec<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            extensions: vec!["php".to_string()],
        }
    }
}

impl ProjectConfig {
    /// Whether a path has one of the configured extensions.
    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }
}

/// Indexing behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexConfig {
    /// Index files on the rayon pool.
    pub parallel: bool,
    /// Accept files whose syntax tree contains error nodes.
    pub tolerate_syntax_errors: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            tolerate_syntax_errors: false,
        }
    }
}

/// Rule file location.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RulesConfig {
    /// Path of the rule file, relative to the project root.
    pub path: Option<PathBuf>,
}
