//! Element lookups consumed by the resolution engine.
//!
//! The engine only ever calls [`ElementLookup::lookup_element`]; which
//! lookup it is handed decides whether forward references are allowed.

use crate::location::ResourceLocation;
use crate::registry::{ElementRegistry, Holder};

/// Resolves element references found in tag documents.
pub trait ElementLookup {
    type Element;

    /// Element named by `id`, or `None` if it cannot be resolved.
    ///
    /// `required` tells the lookup whether the owning tag fails without it,
    /// which lets writable lookups hand out placeholders only when needed.
    fn lookup_element(&mut self, id: &ResourceLocation, required: bool) -> Option<Self::Element>;
}

/// Plain existence checks against a registry whose contents are final.
#[derive(Clone, Copy, Debug)]
pub struct FrozenLookup<'a> {
    registry: &'a ElementRegistry,
}

impl<'a> FrozenLookup<'a> {
    pub fn new(registry: &'a ElementRegistry) -> Self {
        Self { registry }
    }
}

impl ElementLookup for FrozenLookup<'_> {
    type Element = Holder;

    fn lookup_element(&mut self, id: &ResourceLocation, _required: bool) -> Option<Holder> {
        self.registry.get(id).cloned()
    }
}

/// Lookup against a registry that is still being populated.
///
/// Required references to elements that are not registered yet resolve to a
/// placeholder, which becomes valid once the element is registered later in
/// the same bootstrap pass. [`ElementRegistry::freeze`] reports placeholders
/// that never got registered. Optional references only see what is already
/// registered.
#[derive(Debug)]
pub struct BootstrapLookup<'a> {
    registry: &'a mut ElementRegistry,
}

impl<'a> BootstrapLookup<'a> {
    pub fn new(registry: &'a mut ElementRegistry) -> Self {
        Self { registry }
    }
}

impl ElementLookup for BootstrapLookup<'_> {
    type Element = Holder;

    fn lookup_element(&mut self, id: &ResourceLocation, required: bool) -> Option<Holder> {
        if required {
            // Only fails once the registry is frozen.
            self.registry.reserve(id).ok()
        } else {
            self.registry.get(id).cloned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::RegistryKey;

    fn loc(s: &str) -> ResourceLocation {
        ResourceLocation::parse(s).unwrap()
    }

    #[test]
    fn frozen_lookup_checks_existence() {
        let reg = ElementRegistry::build(RegistryKey::from_static("item"), [loc("apple")]).unwrap();
        let mut lookup = FrozenLookup::new(&reg);

        assert!(lookup.lookup_element(&loc("apple"), true).is_some());
        assert!(lookup.lookup_element(&loc("pear"), true).is_none());
        assert!(lookup.lookup_element(&loc("pear"), false).is_none());
    }

    #[test]
    fn bootstrap_lookup_forward_references_required_only() {
        let mut reg = ElementRegistry::new(RegistryKey::from_static("item"));

        let pear = {
            let mut lookup = BootstrapLookup::new(&mut reg);
            assert!(lookup.lookup_element(&loc("plum"), false).is_none());
            lookup.lookup_element(&loc("pear"), true).unwrap()
        };
        assert!(!pear.is_bound());

        reg.register(loc("pear")).unwrap();
        assert!(pear.is_bound());
        assert!(reg.freeze().is_ok());
    }
}
