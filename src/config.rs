//! Configuration for discovery requests and the command-line shell.
//!
//! Both structs are plain serde types with sensible defaults, so a TOML file
//! only needs to mention what it overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Namespace of the ecosystem vocabulary.
pub const CORE_NS: &str = "http://iot.linkeddata.es/def/core#";

/// Tunables of the discovery pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// How long the store may serve a cached result, in seconds.
    pub expiry_secs: u64,
    /// Whether store queries ask for entailment.
    pub infer: bool,
    /// Class of ecosystem resources.
    pub ecosystem_class: String,
    /// Predicate linking an ecosystem to its components.
    pub has_component: String,
    /// Class of thing description documents.
    pub description_class: String,
    /// Predicate linking a description document to the thing it describes.
    pub describes: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            expiry_secs: 300,
            infer: true,
            ecosystem_class: format!("{CORE_NS}Ecosystem"),
            has_component: format!("{CORE_NS}hasComponent"),
            description_class: format!("{CORE_NS}ThingDescription"),
            describes: format!("{CORE_NS}describes"),
        }
    }
}

impl DiscoveryConfig {
    /// Result expiry as a [`Duration`].
    pub fn expiry(&self) -> Duration {
        Duration::from_secs(self.expiry_secs)
    }
}

/// Configuration of the `thing-discovery` binary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// TOML schema for the type catalog.
    pub catalog: PathBuf,
    /// TriG (`.trig`) or Turtle (anything else) files loaded into the store.
    pub data: Vec<PathBuf>,
    /// On-disk oxigraph directory. `None` keeps everything in memory.
    pub store_dir: Option<PathBuf>,
    /// Pipeline tunables.
    pub discovery: DiscoveryConfig,
}

impl ShellConfig {
    /// Load from a TOML file. Relative paths are resolved against the file's directory.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let mut config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(base) = path.parent() {
            config.resolve_relative(base);
        }
        Ok(config)
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    fn resolve_relative(&mut self, base: &Path) {
        let rebase = |p: &mut PathBuf| {
            if p.is_relative() && !p.as_os_str().is_empty() {
                *p = base.join(&*p);
            }
        };
        rebase(&mut self.catalog);
        self.data.iter_mut().for_each(rebase);
        if let Some(dir) = self.store_dir.as_mut() {
            rebase(dir);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_core_vocabulary() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.expiry(), Duration::from_secs(300));
        assert!(config.infer);
        assert_eq!(
            config.describes,
            "http://iot.linkeddata.es/def/core#describes"
        );
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ShellConfig = toml::from_str(
            r#"
            catalog = "schema.toml"
            [discovery]
            expiry_secs = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.discovery.expiry_secs, 10);
        assert!(config.discovery.infer);
        assert!(config.data.is_empty());
    }

    #[test]
    fn save_then_load_resolves_paths() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("conf").join("shell.toml");
        let config = ShellConfig {
            catalog: PathBuf::from("schema.toml"),
            data: vec![PathBuf::from("things.trig")],
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = ShellConfig::load(&path).unwrap();
        assert_eq!(loaded.catalog, dir.path().join("conf").join("schema.toml"));
        assert_eq!(loaded.data, vec![dir.path().join("conf").join("things.trig")]);
        assert_eq!(loaded.store_dir, None);
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = ShellConfig::load(Path::new("/nonexistent/shell.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
