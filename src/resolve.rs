//! Resolution engine — turns merged entry lists into flat element lists.
//!
//! Tags are resolved in dependency order, so a nested tag reference only
//! ever looks at tags that are already finished. Each tag's elements are
//! deduplicated by first occurrence. A tag with an unresolved required entry
//! is left out of the result and reported; unresolved optional entries are
//! dropped silently.

use std::fmt;
use std::hash::Hash;

use indexmap::{IndexMap, IndexSet};

use crate::builder::{DocumentFailure, MergedTags, ResourceProvider, merge_layers};
use crate::entry::{EntryWithSource, TagEntry};
use crate::location::{RegistryKey, TagId};
use crate::lookup::ElementLookup;
use crate::sorter::{BrokenEdge, DependencyEntry, DependencySorter, Sorted};

// =============================================================================
// ResolvedTags
// =============================================================================

/// Resolved tags of one registry: tag id → duplicate-free element list.
///
/// A missing key means the tag failed to resolve or was never defined.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedTags<E> {
    registry: RegistryKey,
    tags: IndexMap<TagId, Vec<E>>,
}

impl<E> ResolvedTags<E> {
    pub fn new(registry: RegistryKey) -> Self {
        Self {
            registry,
            tags: IndexMap::new(),
        }
    }

    #[inline]
    pub fn registry(&self) -> &RegistryKey {
        &self.registry
    }

    #[inline]
    pub fn get(&self, id: &TagId) -> Option<&[E]> {
        self.tags.get(id).map(Vec::as_slice)
    }

    #[inline]
    pub fn contains_tag(&self, id: &TagId) -> bool {
        self.tags.contains_key(id)
    }

    /// Whether `element` is a member of tag `id`.
    pub fn contains(&self, id: &TagId, element: &E) -> bool
    where
        E: PartialEq,
    {
        self.get(id).is_some_and(|elements| elements.contains(element))
    }

    /// Ids from `expected` that did not resolve.
    pub fn missing<'a>(&self, expected: &'a [TagId]) -> Vec<&'a TagId> {
        expected.iter().filter(|id| !self.contains_tag(id)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TagId, &[E])> {
        self.tags.iter().map(|(id, elements)| (id, elements.as_slice()))
    }

    pub fn tag_ids(&self) -> impl Iterator<Item = &TagId> {
        self.tags.keys()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub(crate) fn insert(&mut self, id: TagId, elements: Vec<E>) {
        self.tags.insert(id, elements);
    }
}

// =============================================================================
// Results
// =============================================================================

/// A tag left out because some of its required references did not resolve.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagFailure {
    pub tag: TagId,
    /// Every unresolved required entry, with the layer that contributed it.
    pub missing: Vec<EntryWithSource>,
}

impl fmt::Display for TagFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is missing ", self.tag)?;
        for (i, entry) in self.missing.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", entry)?;
        }
        Ok(())
    }
}

/// Everything one load pass produced for a registry.
#[derive(Debug)]
pub struct LoadResult<E> {
    pub tags: ResolvedTags<E>,
    /// Tags that failed, in resolution order.
    pub failures: Vec<TagFailure>,
    /// Dependency edges dropped to break cycles between tags.
    pub cycles: Vec<BrokenEdge<TagId>>,
    /// Documents skipped during the merge.
    pub document_failures: Vec<DocumentFailure>,
}

impl<E> LoadResult<E> {
    /// True if every document parsed and every tag resolved.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.cycles.is_empty() && self.document_failures.is_empty()
    }

    pub fn failure(&self, id: &TagId) -> Option<&TagFailure> {
        self.failures.iter().find(|f| &f.tag == id)
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Sorter entry: the merged entries of one tag.
struct PendingTag<'m> {
    registry: &'m RegistryKey,
    entries: Vec<TagEntry>,
}

impl DependencyEntry<TagId> for PendingTag<'_> {
    fn visit_required_dependencies(&self, visitor: &mut dyn FnMut(&TagId)) {
        self.visit_tag_refs(true, visitor);
    }

    fn visit_optional_dependencies(&self, visitor: &mut dyn FnMut(&TagId)) {
        self.visit_tag_refs(false, visitor);
    }
}

impl PendingTag<'_> {
    fn visit_tag_refs(&self, required: bool, visitor: &mut dyn FnMut(&TagId)) {
        for entry in &self.entries {
            if let TagEntry::TagRef { id, required: r } = entry
                && *r == required
            {
                visitor(&TagId::new(self.registry.clone(), id.clone()));
            }
        }
    }
}

/// Resolve every merged tag against `lookup`.
pub fn resolve_tags<L>(merged: MergedTags, lookup: &mut L) -> LoadResult<L::Element>
where
    L: ElementLookup,
    L::Element: Clone + Eq + Hash,
{
    let registry = merged.registry().clone();
    let (entries, diagnostics) = merged.into_entries();

    let mut sorter = DependencySorter::new();
    for (id, entries) in entries {
        sorter.add_entry(
            id,
            PendingTag {
                registry: &registry,
                entries,
            },
        );
    }
    let Sorted { ordered, broken } = sorter.order_by_dependencies();

    for edge in &broken {
        if edge.required {
            tracing::warn!(
                "Tag {} requires {}, which depends back on it; the reference cannot be resolved",
                edge.from,
                edge.to
            );
        } else {
            tracing::debug!(
                "Tag {} optionally references {}, which depends back on it",
                edge.from,
                edge.to
            );
        }
    }

    let mut resolved = ResolvedTags::new(registry.clone());
    let mut failures = Vec::new();

    for (id, pending) in ordered {
        match resolve_entries(&id, &pending.entries, lookup, &resolved) {
            Ok(elements) => resolved.insert(id, elements),
            Err(unresolved) => {
                let missing: Vec<EntryWithSource> = unresolved
                    .into_iter()
                    .map(|idx| diagnostics.provenance.annotate(&id, idx, &pending.entries[idx]))
                    .collect();
                let failure = TagFailure { tag: id, missing };
                tracing::error!("Couldn't load tag {}", failure);
                failures.push(failure);
            }
        }
    }

    tracing::debug!(
        registry = %registry,
        loaded = resolved.len(),
        failed = failures.len(),
        "resolved tags"
    );

    LoadResult {
        tags: resolved,
        failures,
        cycles: broken,
        document_failures: diagnostics.failures,
    }
}

/// Resolve one tag's entries, or return the indices of unresolved required entries.
fn resolve_entries<L>(
    id: &TagId,
    entries: &[TagEntry],
    lookup: &mut L,
    resolved: &ResolvedTags<L::Element>,
) -> Result<Vec<L::Element>, Vec<usize>>
where
    L: ElementLookup,
    L::Element: Clone + Eq + Hash,
{
    let mut elements: IndexSet<L::Element> = IndexSet::new();
    let mut unresolved = Vec::new();

    for (idx, entry) in entries.iter().enumerate() {
        let found = match entry {
            TagEntry::Element { id: element, required } => {
                match lookup.lookup_element(element, *required) {
                    Some(found) => {
                        elements.insert(found);
                        true
                    }
                    None => false,
                }
            }
            TagEntry::TagRef { id: tag, .. } => match resolved.get(&id.sibling(tag.clone())) {
                Some(members) => {
                    elements.extend(members.iter().cloned());
                    true
                }
                None => false,
            },
        };
        if !found && entry.is_required() {
            unresolved.push(idx);
        }
    }

    if unresolved.is_empty() {
        Ok(elements.into_iter().collect())
    } else {
        Err(unresolved)
    }
}

// =============================================================================
// Loader
// =============================================================================

/// Loads and resolves the tags of one registry.
#[derive(Clone, Debug)]
pub struct TagLoader {
    registry: RegistryKey,
}

impl TagLoader {
    pub fn new(registry: RegistryKey) -> Self {
        Self { registry }
    }

    #[inline]
    pub fn registry(&self) -> &RegistryKey {
        &self.registry
    }

    /// Merge every layer's documents for this registry.
    pub fn load<P: ResourceProvider + ?Sized>(&self, provider: &P) -> MergedTags {
        merge_layers(provider, &self.registry)
    }

    /// Resolve merged tags against `lookup`.
    pub fn build<L>(&self, merged: MergedTags, lookup: &mut L) -> LoadResult<L::Element>
    where
        L: ElementLookup,
        L::Element: Clone + Eq + Hash,
    {
        resolve_tags(merged, lookup)
    }

    pub fn load_and_build<P, L>(&self, provider: &P, lookup: &mut L) -> LoadResult<L::Element>
    where
        P: ResourceProvider + ?Sized,
        L: ElementLookup,
        L::Element: Clone + Eq + Hash,
    {
        let result = self.build(self.load(provider), lookup);
        tracing::info!(
            "Loaded {} tags for registry {} ({} failed)",
            result.tags.len(),
            self.registry,
            result.failures.len()
        );
        result
    }
}

// =============================================================================
// Tests
// =============================================================================
