//! Element registry — dense raw ids for registered elements, plus
//! placeholders for elements referenced before they are registered.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use thiserror::Error;

use crate::location::{RegistryKey, ResourceLocation};

/// Network-stable integer id of an element within one registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawId(pub u32);

/// Handle to a registry element.
///
/// A holder is either bound (the element is registered and has a raw id) or
/// a placeholder created by a bootstrap lookup, which becomes bound when the
/// element is registered. Clones share the binding. Equality and hashing use
/// the location only.
#[derive(Clone)]
pub struct Holder(Arc<HolderInner>);

struct HolderInner {
    location: ResourceLocation,
    raw_id: OnceLock<RawId>,
}

impl Holder {
    fn unbound(location: ResourceLocation) -> Self {
        Self(Arc::new(HolderInner {
            location,
            raw_id: OnceLock::new(),
        }))
    }

    #[inline]
    pub fn location(&self) -> &ResourceLocation {
        &self.0.location
    }

    /// Raw id, if the element has been registered.
    #[inline]
    pub fn raw_id(&self) -> Option<RawId> {
        self.0.raw_id.get().copied()
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        self.0.raw_id.get().is_some()
    }
}

impl PartialEq for Holder {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.location == other.0.location
    }
}

impl Eq for Holder {}

impl Hash for Holder {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.location.hash(state);
    }
}

impl fmt::Debug for Holder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.raw_id() {
            Some(RawId(id)) => write!(f, "Holder({} = {})", self.location(), id),
            None => write!(f, "Holder({}, unbound)", self.location()),
        }
    }
}

impl fmt::Display for Holder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.location(), f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("registry '{0}' is frozen")]
    Frozen(RegistryKey),
    #[error("registry '{registry}' has {} referenced but unregistered element(s): {}", .missing.len(), join(.missing))]
    Unbound {
        registry: RegistryKey,
        missing: Vec<ResourceLocation>,
    },
    #[error("registry '{0}' ran out of raw ids")]
    Exhausted(RegistryKey),
}

fn join(locations: &[ResourceLocation]) -> String {
    locations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Registry of elements of one kind.
///
/// Provides:
/// - Location ↔ raw id bidirectional lookup
/// - Registration in order, raw ids assigned densely from 0
/// - Placeholders for forward references while writable
/// - Freezing, after which the registry is read-only
#[derive(Debug)]
pub struct ElementRegistry {
    key: RegistryKey,
    entries: Vec<Holder>,
    by_location: HashMap<ResourceLocation, usize>,
    pending: HashMap<ResourceLocation, Holder>,
    frozen: bool,
}

impl ElementRegistry {
    pub fn new(key: RegistryKey) -> Self {
        Self {
            key,
            entries: Vec::new(),
            by_location: HashMap::new(),
            pending: HashMap::new(),
            frozen: false,
        }
    }

    /// Build a frozen registry from locations, assigning ids in order.
    pub fn build<I>(key: RegistryKey, locations: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = ResourceLocation>,
    {
        let mut registry = Self::new(key);
        for location in locations {
            registry.register(location)?;
        }
        registry.freeze()?;
        Ok(registry)
    }

    #[inline]
    pub fn key(&self) -> &RegistryKey {
        &self.key
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Registered elements in raw id order.
    pub fn entries(&self) -> &[Holder] {
        &self.entries
    }

    /// Register an element, returning its raw id.
    ///
    /// Registering an existing location is a no-op returning the existing id.
    /// A placeholder previously handed out for this location becomes bound.
    pub fn register(&mut self, location: ResourceLocation) -> Result<RawId, RegistryError> {
        if let Some(&idx) = self.by_location.get(&location) {
            return Ok(RawId(idx as u32));
        }
        if self.frozen {
            return Err(RegistryError::Frozen(self.key.clone()));
        }
        let idx = self.entries.len();
        let raw = u32::try_from(idx).map_err(|_| RegistryError::Exhausted(self.key.clone()))?;
        let raw_id = RawId(raw);

        let holder = self
            .pending
            .remove(&location)
            .unwrap_or_else(|| Holder::unbound(location.clone()));
        // Holders are only ever bound here, once per location.
        let _ = holder.0.raw_id.set(raw_id);

        self.entries.push(holder);
        self.by_location.insert(location, idx);
        Ok(raw_id)
    }

    /// Registered element at `location`.
    #[inline]
    pub fn get(&self, location: &ResourceLocation) -> Option<&Holder> {
        self.by_location.get(location).map(|&idx| &self.entries[idx])
    }

    #[inline]
    pub fn contains(&self, location: &ResourceLocation) -> bool {
        self.by_location.contains_key(location)
    }

    /// Raw id of a holder registered in this registry.
    pub fn id_of(&self, holder: &Holder) -> Option<RawId> {
        self.by_location
            .get(holder.location())
            .map(|&idx| RawId(idx as u32))
    }

    /// Element registered under `id`.
    #[inline]
    pub fn element_of(&self, id: RawId) -> Option<&Holder> {
        self.entries.get(id.0 as usize)
    }

    /// Registered element, or a shared placeholder that binds on registration.
    pub fn reserve(&mut self, location: &ResourceLocation) -> Result<Holder, RegistryError> {
        if let Some(holder) = self.get(location) {
            return Ok(holder.clone());
        }
        if self.frozen {
            return Err(RegistryError::Frozen(self.key.clone()));
        }
        Ok(self
            .pending
            .entry(location.clone())
            .or_insert_with(|| Holder::unbound(location.clone()))
            .clone())
    }

    /// Locations handed out as placeholders but never registered.
    pub fn unbound(&self) -> Vec<ResourceLocation> {
        let mut missing: Vec<_> = self.pending.keys().cloned().collect();
        missing.sort();
        missing
    }

    /// Make the registry read-only.
    ///
    /// Fails, leaving the registry writable, if any placeholder is unbound.
    pub fn freeze(&mut self) -> Result<(), RegistryError> {
        if !self.pending.is_empty() {
            return Err(RegistryError::Unbound {
                registry: self.key.clone(),
                missing: self.unbound(),
            });
        }
        self.frozen = true;
        Ok(())
    }
}

/// Element registries by key.
#[derive(Debug, Default)]
pub struct ElementRegistries {
    registries: IndexMap<RegistryKey, ElementRegistry>,
}

impl ElementRegistries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a registry, returning any registry previously stored under its key.
    pub fn insert(&mut self, registry: ElementRegistry) -> Option<ElementRegistry> {
        self.registries.insert(registry.key().clone(), registry)
    }

    #[inline]
    pub fn get(&self, key: &RegistryKey) -> Option<&ElementRegistry> {
        self.registries.get(key)
    }

    #[inline]
    pub fn get_mut(&mut self, key: &RegistryKey) -> Option<&mut ElementRegistry> {
        self.registries.get_mut(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ElementRegistry> {
        self.registries.values()
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

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(s: &str) -> ResourceLocation {
        ResourceLocation::parse(s).unwrap()
    }

    fn blocks() -> ElementRegistry {
        ElementRegistry::new(RegistryKey::from_static("block"))
    }

    #[test]
    fn register_and_lookup() {
        let mut reg = blocks();
        let stone = reg.register(loc("stone")).unwrap();
        let dirt = reg.register(loc("dirt")).unwrap();

        assert_eq!(stone, RawId(0));
        assert_eq!(dirt, RawId(1));
        assert_eq!(reg.element_of(dirt).unwrap().location(), &loc("dirt"));

        let holder = reg.get(&loc("stone")).unwrap();
        assert_eq!(reg.id_of(holder), Some(stone));
        assert_eq!(holder.raw_id(), Some(stone));
        assert!(reg.element_of(RawId(9)).is_none());
    }

    #[test]
    fn register_idempotent() {
        let mut reg = blocks();
        let a = reg.register(loc("stone")).unwrap();
        let b = reg.register(loc("stone")).unwrap();
        assert_eq!(a, b);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn placeholder_binds_on_registration() {
        let mut reg = blocks();
        let placeholder = reg.reserve(&loc("copper_ore")).unwrap();
        assert!(!placeholder.is_bound());
        assert!(!reg.contains(&loc("copper_ore")));

        let id = reg.register(loc("copper_ore")).unwrap();
        assert!(placeholder.is_bound());
        assert_eq!(placeholder.raw_id(), Some(id));
        assert_eq!(reg.id_of(&placeholder), Some(id));
        assert!(reg.unbound().is_empty());
    }

    #[test]
    fn reserve_shares_one_placeholder() {
        let mut reg = blocks();
        let a = reg.reserve(&loc("tin_ore")).unwrap();
        let b = reg.reserve(&loc("tin_ore")).unwrap();
        reg.register(loc("tin_ore")).unwrap();
        assert!(a.is_bound() && b.is_bound());
    }

    #[test]
    fn freeze_rejects_unbound_placeholders() {
        let mut reg = blocks();
        reg.reserve(&loc("never_registered")).unwrap();

        let err = reg.freeze().unwrap_err();
        assert_eq!(
            err,
            RegistryError::Unbound {
                registry: RegistryKey::from_static("block"),
                missing: vec![loc("never_registered")],
            }
        );
        assert!(!reg.is_frozen());
    }

    #[test]
    fn frozen_registry_rejects_writes() {
        let mut reg = ElementRegistry::build(RegistryKey::from_static("block"), [loc("stone")]).unwrap();
        assert!(reg.is_frozen());
        assert!(matches!(reg.register(loc("dirt")), Err(RegistryError::Frozen(_))));
        assert!(matches!(reg.reserve(&loc("dirt")), Err(RegistryError::Frozen(_))));
        // Existing elements are still reachable.
        assert_eq!(reg.register(loc("stone")).unwrap(), RawId(0));
        assert!(reg.reserve(&loc("stone")).unwrap().is_bound());
    }

    #[test]
    fn holders_compare_by_location() {
        let mut a = blocks();
        let mut b = blocks();
        b.register(loc("filler")).unwrap();
        a.register(loc("stone")).unwrap();
        b.register(loc("stone")).unwrap();

        assert_eq!(a.get(&loc("stone")), b.get(&loc("stone")));
    }
}
