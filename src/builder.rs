//! Layered merge — folds per-layer tag documents into one entry list per tag.
//!
//! Layers are visited lowest priority first. A document with `replace: true`
//! discards everything earlier layers contributed to the same tag. A document
//! that cannot be read or parsed is logged, recorded and skipped; it never
//! affects other layers or other tags.

use std::collections::HashMap;
use std::io;

use indexmap::IndexMap;

use crate::entry::{EntryWithSource, SourceId, TagEntry, TagFile, TagFileError};
use crate::location::{RegistryKey, ResourceLocation, TagId};

/// One layer's raw document for a tag.
#[derive(Debug)]
pub struct LayerResource {
    pub source: SourceId,
    pub contents: io::Result<Vec<u8>>,
}

/// Supplies raw tag documents from the active content layers.
pub trait ResourceProvider {
    /// Tags of `registry` defined by at least one layer.
    fn list_tags(&self, registry: &RegistryKey) -> Vec<ResourceLocation>;

    /// Every layer's document for `id`, lowest priority first.
    fn layers_for(&self, id: &TagId) -> Vec<LayerResource>;
}

impl<P: ResourceProvider + ?Sized> ResourceProvider for &P {
    fn list_tags(&self, registry: &RegistryKey) -> Vec<ResourceLocation> {
        (**self).list_tags(registry)
    }

    fn layers_for(&self, id: &TagId) -> Vec<LayerResource> {
        (**self).layers_for(id)
    }
}

// =============================================================================
// Merge output
// =============================================================================

/// Source layer of every merged entry, keyed by (tag id, entry index).
#[derive(Clone, Debug, Default)]
pub struct ProvenanceTable {
    sources: HashMap<TagId, Vec<SourceId>>,
}

impl ProvenanceTable {
    pub fn source_of(&self, id: &TagId, index: usize) -> Option<&SourceId> {
        self.sources.get(id)?.get(index)
    }

    /// `entry` joined with the layer that contributed it at `index`.
    pub fn annotate(&self, id: &TagId, index: usize, entry: &TagEntry) -> EntryWithSource {
        EntryWithSource {
            entry: entry.clone(),
            source: self
                .source_of(id, index)
                .cloned()
                .unwrap_or_else(|| SourceId::new("<unknown>")),
        }
    }
}

/// A document that was skipped during the merge.
#[derive(Debug)]
pub struct DocumentFailure {
    pub tag: TagId,
    pub source: SourceId,
    pub error: TagFileError,
}

/// Accumulated builder state: merged entries per tag id, in discovery order.
#[derive(Debug)]
pub struct MergedTags {
    registry: RegistryKey,
    entries: IndexMap<TagId, Vec<TagEntry>>,
    provenance: ProvenanceTable,
    failures: Vec<DocumentFailure>,
}

impl MergedTags {
    pub fn new(registry: RegistryKey) -> Self {
        Self {
            registry,
            entries: IndexMap::new(),
            provenance: ProvenanceTable::default(),
            failures: Vec::new(),
        }
    }

    #[inline]
    pub fn registry(&self) -> &RegistryKey {
        &self.registry
    }

    /// Fold one parsed layer document into the tag's entry list.
    pub fn apply(&mut self, id: TagId, source: &SourceId, file: TagFile) {
        let sources = self.provenance.sources.entry(id.clone()).or_default();
        let entries = self.entries.entry(id).or_default();
        if file.replace {
            entries.clear();
            sources.clear();
        }
        sources.extend(std::iter::repeat_n(source.clone(), file.values.len()));
        entries.extend(file.values);
    }

    /// Shorthand for tests and embedders: fold a document from a named layer.
    pub fn with(mut self, id: TagId, source: &str, file: TagFile) -> Self {
        self.apply(id, &SourceId::new(source), file);
        self
    }

    #[inline]
    pub fn get(&self, id: &TagId) -> Option<&[TagEntry]> {
        self.entries.get(id).map(Vec::as_slice)
    }

    /// Entries of `id` joined with their source layers.
    pub fn entries_with_source<'a>(
        &'a self,
        id: &'a TagId,
    ) -> impl Iterator<Item = EntryWithSource> + 'a {
        self.get(id)
            .unwrap_or_default()
            .iter()
            .enumerate()
            .map(move |(idx, entry)| self.provenance.annotate(id, idx, entry))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TagId, &[TagEntry])> {
        self.entries.iter().map(|(id, entries)| (id, entries.as_slice()))
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
    pub fn provenance(&self) -> &ProvenanceTable {
        &self.provenance
    }

    /// Documents skipped because they could not be read or parsed.
    #[inline]
    pub fn document_failures(&self) -> &[DocumentFailure] {
        &self.failures
    }

    pub(crate) fn into_entries(self) -> (IndexMap<TagId, Vec<TagEntry>>, MergedTagsDiagnostics) {
        (
            self.entries,
            MergedTagsDiagnostics {
                provenance: self.provenance,
                failures: self.failures,
            },
        )
    }
}

/// What remains of a [`MergedTags`] once its entries are handed to the sorter.
#[derive(Debug)]
pub(crate) struct MergedTagsDiagnostics {
    pub provenance: ProvenanceTable,
    pub failures: Vec<DocumentFailure>,
}

/// Read every layer document of every tag of `registry` and merge them.
pub fn merge_layers<P: ResourceProvider + ?Sized>(provider: &P, registry: &RegistryKey) -> MergedTags {
    let mut merged = MergedTags::new(registry.clone());

    for location in provider.list_tags(registry) {
        let id = TagId::new(registry.clone(), location);
        for layer in provider.layers_for(&id) {
            let parsed = layer
                .contents
                .map_err(TagFileError::from)
                .and_then(|bytes| TagFile::from_slice(&bytes));
            match parsed {
                Ok(file) => merged.apply(id.clone(), &layer.source, file),
                Err(error) => {
                    tracing::error!(
                        "Couldn't read tag list {} from {}: {}",
                        id,
                        layer.source,
                        error
                    );
                    merged.failures.push(DocumentFailure {
                        tag: id.clone(),
                        source: layer.source,
                        error,
                    });
                }
            }
        }
    }

    tracing::debug!(
        registry = %registry,
        tags = merged.len(),
        skipped = merged.failures.len(),
        "merged tag layers"
    );
    merged
}

// =============================================================================
// In-memory provider
// =============================================================================

#[derive(Clone, Debug)]
enum MemoryDocument {
    Bytes(Vec<u8>),
    File(TagFile),
}

/// One content layer held in memory.
#[derive(Clone, Debug)]
pub struct MemoryLayer {
    source: SourceId,
    documents: IndexMap<TagId, MemoryDocument>,
}

impl MemoryLayer {
    #[inline]
    pub fn source(&self) -> &SourceId {
        &self.source
    }

    /// Add a parsed document.
    pub fn insert(&mut self, id: TagId, file: TagFile) -> &mut Self {
        self.documents.insert(id, MemoryDocument::File(file));
        self
    }

    /// Add raw document bytes, parsed during the merge.
    pub fn insert_bytes(&mut self, id: TagId, bytes: impl Into<Vec<u8>>) -> &mut Self {
        self.documents.insert(id, MemoryDocument::Bytes(bytes.into()));
        self
    }
}

/// Content layers held in memory, lowest priority first.
///
/// ```ignore
/// let mut provider = MemoryProvider::new();
/// provider.layer("vanilla").insert(logs.clone(), TagFile::new(vec![oak]));
/// provider.layer("mod").insert(logs, TagFile::replacing(vec![birch]));
/// ```
#[derive(Clone, Debug, Default)]
pub struct MemoryProvider {
    layers: Vec<MemoryLayer>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a new layer above all existing ones.
    pub fn layer(&mut self, name: &str) -> &mut MemoryLayer {
        self.layers.push(MemoryLayer {
            source: SourceId::new(name),
            documents: IndexMap::new(),
        });
        let last = self.layers.len() - 1;
        &mut self.layers[last]
    }

    pub fn layers(&self) -> &[MemoryLayer] {
        &self.layers
    }
}

impl ResourceProvider for MemoryProvider {
    fn list_tags(&self, registry: &RegistryKey) -> Vec<ResourceLocation> {
        let mut seen = indexmap::IndexSet::new();
        for layer in &self.layers {
            for id in layer.documents.keys() {
                if id.registry() == registry {
                    seen.insert(id.location().clone());
                }
            }
        }
        seen.into_iter().collect()
    }

    fn layers_for(&self, id: &TagId) -> Vec<LayerResource> {
        self.layers
            .iter()
            .filter_map(|layer| {
                let contents = match layer.documents.get(id)? {
                    MemoryDocument::Bytes(bytes) => Ok(bytes.clone()),
                    MemoryDocument::File(file) => file.to_vec().map_err(io::Error::other),
                };
                Some(LayerResource {
                    source: layer.source.clone(),
                    contents,
                })
            })
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
