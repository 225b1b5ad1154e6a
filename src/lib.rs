//! # Data-driven tags (bevy-tagpack)
//!
//! Named groups of registry elements, defined in layered JSON documents and
//! resolved into flat, duplicate-free element lists. A tag may reference
//! other tags; references are resolved in dependency order, and a tag whose
//! required references cannot be satisfied is reported instead of aborting
//! the load.
//!
//! ## Pipeline
//!
//! ```text
//! layer documents ──► merge ──► dependency sort ──► resolve ──► Tags
//!  (per provider)    (replace)   (breaks cycles)    (lookup)      │
//!                                                                 ▼
//!                                          SyncPacket ──► peer Tags
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use bevy_tagpack::*;
//!
//! let blocks = ElementRegistry::build(RegistryKey::from_static("block"), locations)?;
//! let logs = TagId::from_static("block", "minecraft", "logs");
//!
//! let mut provider = MemoryProvider::new();
//! provider.layer("vanilla").insert(logs.clone(), TagFile::new(vec![
//!     TagEntry::element(ResourceLocation::parse("oak_log")?),
//!     TagEntry::optional_tag(ResourceLocation::parse("mymod:logs")?),
//! ]));
//!
//! let result = TagLoader::new(blocks.key().clone())
//!     .load_and_build(&provider, &mut FrozenLookup::new(&blocks));
//! for failure in &result.failures {
//!     eprintln!("{failure}");
//! }
//! ```

pub mod bevy;
pub mod builder;
pub mod entry;
pub mod location;
pub mod lookup;
pub mod network;
pub mod registry;
pub mod resolve;
pub mod sorter;
pub mod store;

pub use builder::{
    DocumentFailure, LayerResource, MemoryLayer, MemoryProvider, MergedTags, ProvenanceTable,
    ResourceProvider, merge_layers,
};
pub use entry::{EntryWithSource, SourceId, TagEntry, TagFile, TagFileError};
pub use location::{DEFAULT_NAMESPACE, LocationError, RegistryKey, ResourceLocation, TagId};
pub use lookup::{BootstrapLookup, ElementLookup, FrozenLookup};
pub use network::{CodecError, SyncPacket, TagPayload, serialize_tags};
pub use registry::{ElementRegistries, ElementRegistry, Holder, RawId, RegistryError};
pub use resolve::{LoadResult, ResolvedTags, TagFailure, TagLoader, resolve_tags};
pub use sorter::{BrokenEdge, DependencyEntry, DependencySorter, Sorted};
pub use store::Tags;

pub use bevy_tagpack_macro::tag_keys;
