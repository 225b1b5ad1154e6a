//! Bevy integration for resolved tags.
//!
//! Provides:
//! - `TagsPlugin` — builder-pattern plugin that builds element registries,
//!   loads their tags and inserts both as resources
//! - `Resource` impls for [`ElementRegistries`] and [`Tags`]
//!
//! # Example
//!
//! ```ignore
//! use bevy::prelude::*;
//! use bevy_tagpack::bevy::*;
//! use bevy_tagpack::tag_keys;
//!
//! tag_keys! {
//!     pub mod BlockTags for "block" {
//!         LOGS = "minecraft:logs";
//!     }
//! }
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(
//!             TagsPlugin::new()
//!                 .with_registry("block", block_locations())
//!                 .with_provider(provider),
//!         )
//!         .add_systems(Update, burn_logs)
//!         .run();
//! }
//!
//! fn burn_logs(tags: Res<Tags>, blocks: Query<&Block>) {
//!     for block in &blocks {
//!         if tags.is_member(&BlockTags::LOGS, &block.0) {
//!             // ...
//!         }
//!     }
//! }
//! ```

use bevy::prelude::*;

use crate::builder::ResourceProvider;
use crate::location::{RegistryKey, ResourceLocation};
use crate::lookup::FrozenLookup;
use crate::registry::{ElementRegistries, ElementRegistry};
use crate::resolve::TagLoader;
use crate::store::Tags;

// =============================================================================
// Plugin
// =============================================================================

/// Bevy plugin for the tag system.
///
/// Use the builder pattern to configure:
///
/// ```ignore
/// App::new()
///     .add_plugins(
///         TagsPlugin::new()
///             .with_registry("item", items)
///             .with_provider(MemoryProvider::new())
///     )
/// ```
///
/// Registries are built and frozen when the plugin is added. With a
/// provider, every registry's tags are loaded and published into [`Tags`]
/// at the same time; without one, [`Tags`] starts empty and is filled by
/// [`Tags::publish`] or [`Tags::apply_sync`].
#[derive(Default)]
pub struct TagsPlugin {
    registries: Vec<(RegistryKey, Vec<ResourceLocation>)>,
    provider: Option<Box<dyn ResourceProvider + Send + Sync>>,
}

impl TagsPlugin {
    /// Create a plugin with no registries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a registry whose elements get raw ids in the given order.
    ///
    /// Invalid registry keys are logged and ignored.
    pub fn with_registry(
        mut self,
        key: &str,
        elements: impl IntoIterator<Item = ResourceLocation>,
    ) -> Self {
        match RegistryKey::new(key) {
            Ok(key) => self.registries.push((key, elements.into_iter().collect())),
            Err(err) => tracing::error!("Ignoring registry: {}", err),
        }
        self
    }

    /// Load tags from `provider` when the plugin is built.
    pub fn with_provider(mut self, provider: impl ResourceProvider + Send + Sync + 'static) -> Self {
        self.provider = Some(Box::new(provider));
        self
    }
}

impl Plugin for TagsPlugin {
    fn build(&self, app: &mut App) {
        let mut registries = ElementRegistries::new();
        for (key, elements) in &self.registries {
            match ElementRegistry::build(key.clone(), elements.iter().cloned()) {
                Ok(registry) => {
                    registries.insert(registry);
                }
                Err(err) => tracing::error!("Failed to build registry {}: {}", key, err),
            }
        }

        let mut tags = Tags::new();
        if let Some(provider) = &self.provider {
            for registry in registries.iter() {
                let loader = TagLoader::new(registry.key().clone());
                let result = loader.load_and_build(provider.as_ref(), &mut FrozenLookup::new(registry));
                tags.publish(result.tags);
            }
        }

        app.insert_resource(registries);
        app.insert_resource(tags);
    }
}

// =============================================================================
// Resource impls
// =============================================================================

impl Resource for ElementRegistries {}

impl Resource for Tags {}

// =============================================================================
// Tests
// =============================================================================
