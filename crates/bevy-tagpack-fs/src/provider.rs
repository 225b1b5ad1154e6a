//! Directory-backed tag documents.
//!
//! Each layer root holds documents at
//! `data/<namespace>/tags/<registry>/<path>.json`; the tag location is
//! `<namespace>:<path>`.

use std::path::{Path, PathBuf};

use bevy_tagpack::{LayerResource, RegistryKey, ResourceLocation, ResourceProvider, SourceId, TagId};
use indexmap::IndexSet;
use walkdir::WalkDir;

use crate::config::PackConfig;

const DATA_DIR: &str = "data";
const TAGS_DIR: &str = "tags";
const EXTENSION: &str = "json";

#[derive(Debug, Clone)]
struct DirectoryLayer {
    source: SourceId,
    root: PathBuf,
}

/// Reads tag documents from layer directories, lowest priority first.
#[derive(Debug, Clone, Default)]
pub struct DirectoryProvider {
    layers: Vec<DirectoryLayer>,
}

impl DirectoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider over the enabled layers of `config`, in declared order.
    pub fn from_config(config: &PackConfig) -> Self {
        let mut provider = Self::new();
        for layer in config.enabled_layers() {
            provider = provider.with_layer(&layer.name, &layer.path);
        }
        provider
    }

    /// Add a layer above all existing ones.
    pub fn with_layer(mut self, name: &str, root: impl Into<PathBuf>) -> Self {
        self.layers.push(DirectoryLayer {
            source: SourceId::new(name),
            root: root.into(),
        });
        self
    }

    #[inline]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    fn document_path(root: &Path, id: &TagId) -> PathBuf {
        root.join(DATA_DIR)
            .join(id.location().namespace())
            .join(TAGS_DIR)
            .join(id.registry().as_str())
            .join(format!("{}.{}", id.location().path(), EXTENSION))
    }
}

/// Tag locations found under one layer root, in file name order.
fn discover(root: &Path, registry: &RegistryKey, out: &mut IndexSet<ResourceLocation>) {
    let data = root.join(DATA_DIR);
    let Ok(namespaces) = std::fs::read_dir(&data) else {
        tracing::debug!("Layer {} has no data directory", root.display());
        return;
    };
    let mut namespaces: Vec<_> = namespaces
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.file_name())
        .collect();
    namespaces.sort();

    for namespace in namespaces {
        let Some(namespace) = namespace.to_str() else {
            continue;
        };
        let tags_root = data.join(namespace).join(TAGS_DIR).join(registry.as_str());
        if !tags_root.is_dir() {
            continue;
        }
        for entry in WalkDir::new(&tags_root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != EXTENSION) {
                continue;
            }
            let Some(relative) = path
                .strip_prefix(&tags_root)
                .ok()
                .and_then(|rel| rel.with_extension("").to_str().map(|s| s.replace('\\', "/")))
            else {
                continue;
            };
            match ResourceLocation::new(namespace.to_owned(), relative) {
                Ok(location) => {
                    out.insert(location);
                }
                Err(err) => tracing::warn!("Ignoring tag file {}: {}", path.display(), err),
            }
        }
    }
}

impl ResourceProvider for DirectoryProvider {
    fn list_tags(&self, registry: &RegistryKey) -> Vec<ResourceLocation> {
        let mut found = IndexSet::new();
        for layer in &self.layers {
            discover(&layer.root, registry, &mut found);
        }
        found.into_iter().collect()
    }

    fn layers_for(&self, id: &TagId) -> Vec<LayerResource> {
        self.layers
            .iter()
            .filter_map(|layer| {
                let path = Self::document_path(&layer.root, id);
                match std::fs::read(&path) {
                    Ok(bytes) => Some(LayerResource {
                        source: layer.source.clone(),
                        contents: Ok(bytes),
                    }),
                    // Layers without this document do not take part.
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
                    Err(err) => Some(LayerResource {
                        source: layer.source.clone(),
                        contents: Err(err),
                    }),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[test]
    fn discovers_nested_tags_per_registry() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "data/minecraft/tags/block/logs.json", "{}");
        write(dir.path(), "data/minecraft/tags/block/mineable/axe.json", "{}");
        write(dir.path(), "data/mymod/tags/block/ores.json", "{}");
        write(dir.path(), "data/minecraft/tags/item/logs.json", "{}");
        write(dir.path(), "data/minecraft/tags/block/readme.txt", "");

        let provider = DirectoryProvider::new().with_layer("base", dir.path());
        let found: Vec<String> = provider
            .list_tags(&RegistryKey::from_static("block"))
            .iter()
            .map(ToString::to_string)
            .collect();

        assert_eq!(
            found,
            vec!["minecraft:logs", "minecraft:mineable/axe", "mymod:ores"]
        );
    }

    #[test]
    fn missing_documents_are_not_layers() {
        let base = TempDir::new().unwrap();
        let addon = TempDir::new().unwrap();
        write(base.path(), "data/minecraft/tags/block/logs.json", r#"{"values":[]}"#);

        let provider = DirectoryProvider::new()
            .with_layer("base", base.path())
            .with_layer("addon", addon.path());
        let layers = provider.layers_for(&TagId::from_static("block", "minecraft", "logs"));

        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].source.as_str(), "base");
        assert!(layers[0].contents.is_ok());
    }
}
