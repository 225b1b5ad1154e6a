//! Filesystem layers for bevy-tagpack.
//!
//! This crate provides:
//! - Parsing `tagpack.toml` layer configuration
//! - A [`ResourceProvider`] reading tag documents from layer directories
//!
//! # Layout
//!
//! ```text
//! tagpack.toml
//! packs/vanilla/data/minecraft/tags/block/logs.json
//! packs/mymod/data/minecraft/tags/block/logs.json      ← appends or replaces
//! packs/mymod/data/mymod/tags/block/ores/copper.json   ← #mymod:ores/copper
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let config = PackConfig::from_file("tagpack.toml")?;
//! let provider = DirectoryProvider::from_config(&config);
//! let blocks = ElementRegistry::build(RegistryKey::from_static("block"), locations)?;
//! let result = load_registry(&provider, &blocks);
//! ```

mod config;
mod provider;

pub use config::{LayerConfig, PackConfig, PackConfigError};
pub use provider::DirectoryProvider;

use bevy_tagpack::{ElementRegistry, FrozenLookup, Holder, LoadResult, ResourceProvider, TagLoader};

/// Load and resolve every tag of `registry` from `provider`.
pub fn load_registry<P>(provider: &P, registry: &ElementRegistry) -> LoadResult<Holder>
where
    P: ResourceProvider + ?Sized,
{
    TagLoader::new(registry.key().clone()).load_and_build(provider, &mut FrozenLookup::new(registry))
}
