//! Published tags — the current resolved view of every registry.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::location::{RegistryKey, TagId};
use crate::network::SyncPacket;
use crate::registry::{ElementRegistries, Holder};
use crate::resolve::ResolvedTags;

/// Current resolved tags, one shared snapshot per registry.
///
/// Snapshots are never mutated in place: a reload or a received sync packet
/// replaces a registry's snapshot wholesale, so readers holding an
/// [`Arc`] from [`Tags::snapshot`] keep a consistent view.
#[derive(Debug, Default, Clone)]
pub struct Tags {
    registries: IndexMap<RegistryKey, Arc<ResolvedTags<Holder>>>,
}

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot of `tags.registry()`.
    pub fn publish(&mut self, tags: ResolvedTags<Holder>) {
        tracing::debug!("Publishing {} tags for registry {}", tags.len(), tags.registry());
        self.registries.insert(tags.registry().clone(), Arc::new(tags));
    }

    #[inline]
    pub fn get(&self, registry: &RegistryKey) -> Option<&ResolvedTags<Holder>> {
        self.registries.get(registry).map(Arc::as_ref)
    }

    pub fn snapshot(&self, registry: &RegistryKey) -> Option<Arc<ResolvedTags<Holder>>> {
        self.registries.get(registry).cloned()
    }

    /// Elements of `tag`, or `None` if the tag is not loaded.
    pub fn elements(&self, tag: &TagId) -> Option<&[Holder]> {
        self.get(tag.registry())?.get(tag)
    }

    /// Whether `element` is a member of `tag`. Unloaded tags have no members.
    pub fn is_member(&self, tag: &TagId, element: &Holder) -> bool {
        self.get(tag.registry())
            .is_some_and(|tags| tags.contains(tag, element))
    }

    /// Replace the view of every registry named in `packet`.
    ///
    /// Ids are decoded against the local `registries`; payloads for
    /// registries that do not exist locally are skipped.
    pub fn apply_sync(&mut self, packet: &SyncPacket, registries: &ElementRegistries) {
        for (key, payload) in packet.iter() {
            match registries.get(key) {
                Some(registry) => self.publish(payload.resolve(registry)),
                None => tracing::warn!("Received tags for unknown registry {}", key),
            }
        }
    }

    pub fn registries(&self) -> impl Iterator<Item = &RegistryKey> {
        self.registries.keys()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.registries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.registries.is_empty()
    }
}
