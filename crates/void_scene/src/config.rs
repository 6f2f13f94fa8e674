//! Scene Configuration
//!
//! # Configuration Sources (in priority order)
//!
//! 1. An explicit path passed by the caller
//! 2. Environment variable: `VOID_SCENE_CONFIG=/path/to/scene.toml`
//! 3. `scene.toml` in the working directory
//! 4. Defaults
//!
//! Individual values are then overridden by `VOID_SCENE_AUTO_LOAD`,
//! `VOID_SCENE_CACHING` and `VOID_SCENE_ASSET_ROOT`.
//!
//! # Example Config File
//!
//! ```toml
//! [scene]
//! auto_load = true
//! caching = false
//! max_frames = 600
//!
//! [assets]
//! root = "assets"
//! manifest = "assets/manifest.json"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use void_asset::AssetServerConfig;

use crate::tree::TreeOptions;

/// Environment variable naming a config file
pub const CONFIG_ENV: &str = "VOID_SCENE_CONFIG";
/// Config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "scene.toml";

const AUTO_LOAD_ENV: &str = "VOID_SCENE_AUTO_LOAD";
const CACHING_ENV: &str = "VOID_SCENE_CACHING";
const ASSET_ROOT_ENV: &str = "VOID_SCENE_ASSET_ROOT";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

/// `[scene]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSection {
    /// Start loading as soon as a tree is built
    pub auto_load: bool,
    /// Retention hint forwarded to the asset provider
    pub caching: bool,
    /// Frames to pump before giving up on a load (0 = no limit)
    pub max_frames: u32,
}

impl Default for SceneSection {
    fn default() -> Self {
        Self {
            auto_load: false,
            caching: false,
            max_frames: 600,
        }
    }
}

/// `[assets]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsSection {
    /// Base directory for declared asset paths
    pub root: String,
    /// Manifest of declared assets
    pub manifest: Option<String>,
}

impl Default for AssetsSection {
    fn default() -> Self {
        Self {
            root: "assets".to_string(),
            manifest: None,
        }
    }
}

/// Complete scene configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub scene: SceneSection,
    pub assets: AssetsSection,
    /// File the configuration was read from
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl SceneConfig {
    /// Load configuration from all sources
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => match std::env::var(CONFIG_ENV) {
                Ok(path) if !path.is_empty() => Self::load_from_file(Path::new(&path))?,
                _ => {
                    let local = Path::new(DEFAULT_CONFIG_FILE);
                    if local.exists() {
                        Self::load_from_file(local)?
                    } else {
                        log::debug!("No scene config found, using defaults");
                        Self::default()
                    }
                }
            },
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::from_toml_str(&content)?;
        config.config_path = Some(path.to_path_buf());
        log::info!("Loaded scene config from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply overrides from `lookup` (normally the process environment)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(AUTO_LOAD_ENV) {
            self.scene.auto_load = parse_flag(AUTO_LOAD_ENV, &value)?;
            log::info!("auto_load from env: {}", self.scene.auto_load);
        }

        if let Some(value) = lookup(CACHING_ENV) {
            self.scene.caching = parse_flag(CACHING_ENV, &value)?;
        }

        if let Some(root) = lookup(ASSET_ROOT_ENV) {
            if !root.is_empty() {
                log::info!("Asset root from env: {}", root);
                self.assets.root = root;
            }
        }

        Ok(())
    }

    /// Options for building a tree
    pub fn tree_options(&self) -> TreeOptions {
        TreeOptions {
            auto_load: self.scene.auto_load,
        }
    }

    /// Configuration for an [`AssetServer`](void_asset::AssetServer)
    pub fn asset_server_config(&self) -> AssetServerConfig {
        AssetServerConfig {
            asset_dir: self.assets.root.clone(),
        }
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = SceneConfig::default();
        assert!(!config.scene.auto_load);
        assert_eq!(config.scene.max_frames, 600);
        assert_eq!(config.assets.root, "assets");
        assert_eq!(config.tree_options(), TreeOptions::default());
    }

    #[test]
    fn test_parse_partial() {
        let config = SceneConfig::from_toml_str(
            r#"
            [scene]
            auto_load = true

            [assets]
            manifest = "assets/manifest.json"
            "#,
        )
        .unwrap();

        assert!(config.scene.auto_load);
        assert!(!config.scene.caching);
        assert_eq!(config.assets.root, "assets");
        assert_eq!(config.assets.manifest.as_deref(), Some("assets/manifest.json"));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            SceneConfig::from_toml_str("[scene]\nauto_load = \"maybe\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("VOID_SCENE_AUTO_LOAD", "1"),
            ("VOID_SCENE_CACHING", "yes"),
            ("VOID_SCENE_ASSET_ROOT", "/srv/assets"),
        ]
        .into_iter()
        .collect();

        let mut config = SceneConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert!(config.tree_options().auto_load);
        assert!(config.scene.caching);
        assert_eq!(config.asset_server_config().asset_dir, "/srv/assets");
    }

    #[test]
    fn test_invalid_override() {
        let mut config = SceneConfig::default();
        let result = config.apply_overrides(|key| (key == "VOID_SCENE_CACHING").then(|| "sometimes".to_string()));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            SceneConfig::load_from_file(Path::new("/nonexistent/scene.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
