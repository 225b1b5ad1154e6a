//! TOML configuration parser for tagpack.toml.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use bevy_tagpack::RegistryKey;
use thiserror::Error;

/// Parsed pack configuration: which registries to load and from which layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackConfig {
    registries: Vec<RegistryKey>,
    layers: Vec<LayerConfig>,
}

/// One content layer directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerConfig {
    /// Name reported as the source of this layer's entries
    pub name: String,
    /// Layer root, containing `data/<namespace>/tags/...`
    pub path: PathBuf,
    /// Disabled layers are skipped by the provider
    pub enabled: bool,
}

/// Raw TOML structure.
#[derive(Debug, Deserialize)]
struct RawPackConfig {
    /// Registry keys, e.g. "block" or "worldgen/biome"
    registries: Vec<String>,
    /// Layers, lowest priority first
    #[serde(default)]
    layers: Vec<RawLayer>,
}

#[derive(Debug, Deserialize)]
struct RawLayer {
    name: String,
    path: PathBuf,
    #[serde(default = "default_enabled")]
    enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Errors during config parsing.
#[derive(Debug, Error)]
pub enum PackConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid tagpack config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid tagpack config: {0}")]
    Validation(String),
}

impl PackConfig {
    /// Parse from a TOML file. Relative layer paths resolve against the
    /// file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PackConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| PackConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_str(&content)?;
        if let Some(base) = path.parent() {
            for layer in &mut config.layers {
                if layer.path.is_relative() {
                    layer.path = base.join(&layer.path);
                }
            }
        }
        Ok(config)
    }

    /// Parse from a TOML string. Layer paths are kept as written.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, PackConfigError> {
        let raw: RawPackConfig = toml::from_str(content)?;

        if raw.registries.is_empty() {
            return Err(PackConfigError::Validation(
                "at least one registry is required".into(),
            ));
        }
        let mut registries = Vec::with_capacity(raw.registries.len());
        for key in raw.registries {
            let key = RegistryKey::new(key).map_err(|e| PackConfigError::Validation(e.to_string()))?;
            if registries.contains(&key) {
                return Err(PackConfigError::Validation(format!(
                    "registry '{}' is listed more than once",
                    key
                )));
            }
            registries.push(key);
        }

        let mut names = HashSet::new();
        let mut layers = Vec::with_capacity(raw.layers.len());
        for layer in raw.layers {
            if layer.name.trim().is_empty() {
                return Err(PackConfigError::Validation("layer name cannot be empty".into()));
            }
            if !names.insert(layer.name.clone()) {
                return Err(PackConfigError::Validation(format!(
                    "layer '{}' is declared more than once",
                    layer.name
                )));
            }
            layers.push(LayerConfig {
                name: layer.name,
                path: layer.path,
                enabled: layer.enabled,
            });
        }

        Ok(Self { registries, layers })
    }

    pub fn registries(&self) -> &[RegistryKey] {
        &self.registries
    }

    /// Every declared layer, lowest priority first.
    pub fn layers(&self) -> &[LayerConfig] {
        &self.layers
    }

    /// Enabled layers, lowest priority first.
    pub fn enabled_layers(&self) -> impl Iterator<Item = &LayerConfig> {
        self.layers.iter().filter(|layer| layer.enabled)
    }
}
