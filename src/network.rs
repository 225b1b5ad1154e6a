//! Network codec — resolved tags as raw id lists, and the framed sync packet.
//!
//! The authority encodes each registry's resolved tags as
//! `tag location → [raw id]`. A peer decodes them against its own registry;
//! ids it does not know are dropped from that tag only, so content mismatch
//! between the two sides degrades the affected tags instead of failing.
//!
//! ## Frame layout
//!
//! ```text
//! ┌──────────┬──────────┬──────────┬────────────┬──────────────────┐
//! │ magic    │ version  │ flags    │ body_len   │ body (postcard)  │
//! │ "TAGS"   │ u16 LE   │ u16 LE   │ u32 LE     │ body_len bytes   │
//! └──────────┴──────────┴──────────┴────────────┴──────────────────┘
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zerocopy::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::location::{RegistryKey, ResourceLocation, TagId};
use crate::registry::{ElementRegistries, ElementRegistry, Holder, RawId};
use crate::resolve::ResolvedTags;

pub const PACKET_MAGIC: [u8; 4] = *b"TAGS";
pub const PACKET_VERSION: u16 = 1;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("tag packet truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("tag packet has {0} trailing bytes")]
    TrailingBytes(usize),
    #[error("not a tag packet (magic {0:?})")]
    BadMagic([u8; 4]),
    #[error("unsupported tag packet version {0}")]
    UnsupportedVersion(u16),
    #[error("tag packet body too large ({0} bytes)")]
    TooLarge(usize),
    #[error("malformed tag packet body: {0}")]
    Body(#[from] postcard::Error),
}

// =============================================================================
// Per-registry payload
// =============================================================================

/// One registry's tags as raw id lists, keyed by tag location.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPayload {
    tags: IndexMap<ResourceLocation, Vec<u32>>,
}

impl TagPayload {
    #[inline]
    pub fn get(&self, location: &ResourceLocation) -> Option<&[u32]> {
        self.tags.get(location).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResourceLocation, &[u32])> {
        self.tags.iter().map(|(loc, ids)| (loc, ids.as_slice()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Rebuild element lists against the local registry.
    ///
    /// Ids unknown to `registry` are dropped; the tag keeps its other members.
    pub fn resolve(&self, registry: &ElementRegistry) -> ResolvedTags<Holder> {
        let mut resolved = ResolvedTags::new(registry.key().clone());
        for (location, ids) in &self.tags {
            let id = TagId::new(registry.key().clone(), location.clone());
            let mut elements = Vec::with_capacity(ids.len());
            for &raw in ids {
                match registry.element_of(RawId(raw)) {
                    Some(holder) => elements.push(holder.clone()),
                    None => tracing::debug!(
                        "Dropping unknown element id {} from {} during tag sync",
                        raw,
                        id
                    ),
                }
            }
            resolved.insert(id, elements);
        }
        resolved
    }
}

/// Encode `tags` as raw ids of `registry`, leaving out tags with no members.
pub fn serialize_tags(registry: &ElementRegistry, tags: &ResolvedTags<Holder>) -> TagPayload {
    let mut payload = TagPayload::default();
    for (id, members) in tags.iter() {
        let ids: Vec<u32> = members
            .iter()
            .filter_map(|holder| match registry.id_of(holder) {
                Some(RawId(raw)) => Some(raw),
                None => {
                    tracing::warn!("Tag {} contains unregistered element {}", id, holder);
                    None
                }
            })
            .collect();
        if ids.is_empty() {
            continue;
        }
        payload.tags.insert(id.location().clone(), ids);
    }
    payload
}

// =============================================================================
// Sync packet
// =============================================================================

#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct FrameHeader {
    magic: [u8; 4],
    version: U16,
    flags: U16,
    body_len: U32,
}

const HEADER_LEN: usize = size_of::<FrameHeader>();

/// Every registry's tag payload for one sync event.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPacket {
    registries: IndexMap<RegistryKey, TagPayload>,
}

impl SyncPacket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode the resolved tags of every registry in `registries`.
    pub fn collect<'a, I>(registries: &ElementRegistries, tags: I) -> Self
    where
        I: IntoIterator<Item = &'a ResolvedTags<Holder>>,
    {
        let mut packet = Self::new();
        for resolved in tags {
            match registries.get(resolved.registry()) {
                Some(registry) => packet.insert(resolved.registry().clone(), serialize_tags(registry, resolved)),
                None => tracing::warn!(
                    "No registry {} to encode tags against; skipping",
                    resolved.registry()
                ),
            }
        }
        packet
    }

    /// Add a registry's payload. Empty payloads are omitted.
    pub fn insert(&mut self, registry: RegistryKey, payload: TagPayload) {
        if payload.is_empty() {
            self.registries.shift_remove(&registry);
        } else {
            self.registries.insert(registry, payload);
        }
    }

    #[inline]
    pub fn get(&self, registry: &RegistryKey) -> Option<&TagPayload> {
        self.registries.get(registry)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RegistryKey, &TagPayload)> {
        self.registries.iter()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.registries.is_empty()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let body = postcard::to_allocvec(self)?;
        let body_len = u32::try_from(body.len()).map_err(|_| CodecError::TooLarge(body.len()))?;
        let header = FrameHeader {
            magic: PACKET_MAGIC,
            version: U16::new(PACKET_VERSION),
            flags: U16::new(0),
            body_len: U32::new(body_len),
        };

        let mut out = Vec::with_capacity(HEADER_LEN + body.len());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(&body);
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let (header, body) = FrameHeader::ref_from_prefix(bytes).map_err(|_| CodecError::Truncated {
            expected: HEADER_LEN,
            actual: bytes.len(),
        })?;
        if header.magic != PACKET_MAGIC {
            return Err(CodecError::BadMagic(header.magic));
        }
        if header.version.get() != PACKET_VERSION {
            return Err(CodecError::UnsupportedVersion(header.version.get()));
        }
        let body_len = header.body_len.get() as usize;
        if body.len() < body_len {
            return Err(CodecError::Truncated {
                expected: HEADER_LEN + body_len,
                actual: bytes.len(),
            });
        }
        if body.len() > body_len {
            return Err(CodecError::TrailingBytes(body.len() - body_len));
        }
        Ok(postcard::from_bytes(body)?)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::MergedTags;
    use crate::entry::{TagEntry, TagFile};
    use crate::lookup::FrozenLookup;
    use crate::resolve::resolve_tags;
    use pretty_assertions::assert_eq;

    fn loc(s: &str) -> ResourceLocation {
        ResourceLocation::parse(s).unwrap()
    }

    fn registry(names: &[&str]) -> ElementRegistry {
        ElementRegistry::build(RegistryKey::from_static("item"), names.iter().map(|n| loc(n))).unwrap()
    }

    fn resolved(registry: &ElementRegistry) -> ResolvedTags<Holder> {
        let merged = MergedTags::new(RegistryKey::from_static("item"))
            .with(
                TagId::from_static("item", "minecraft", "fruit"),
                "base",
                TagFile::new(vec![
                    TagEntry::element(loc("pear")),
                    TagEntry::element(loc("apple")),
                ]),
            )
            .with(TagId::from_static("item", "minecraft", "empty"), "base", TagFile::default());
        resolve_tags(merged, &mut FrozenLookup::new(registry)).tags
    }

    #[test]
    fn empty_tags_are_omitted() {
        let reg = registry(&["apple", "pear"]);
        let payload = serialize_tags(&reg, &resolved(&reg));

        assert_eq!(payload.len(), 1);
        assert_eq!(payload.get(&loc("fruit")), Some(&[1, 0][..]));
        assert!(payload.get(&loc("empty")).is_none());
    }

    #[test]
    fn tags_of_only_unregistered_elements_are_omitted() {
        let source = registry(&["apple", "pear"]);
        let other = registry(&["plum"]);
        let payload = serialize_tags(&other, &resolved(&source));

        assert!(payload.is_empty());
    }

    #[test]
    fn empty_registries_are_omitted() {
        let mut packet = SyncPacket::new();
        packet.insert(RegistryKey::from_static("item"), TagPayload::default());
        assert!(packet.is_empty());
    }

    #[test]
    fn unknown_ids_are_dropped_on_decode() {
        let server = registry(&["apple", "pear", "plum"]);
        let client = registry(&["apple", "pear"]);

        let mut payload = TagPayload::default();
        payload.tags.insert(loc("fruit"), vec![2, 0, 1]);

        let decoded = payload.resolve(&client);
        let fruit = decoded
            .get(&TagId::from_static("item", "minecraft", "fruit"))
            .unwrap();
        assert_eq!(fruit, &[client.entries()[0].clone(), client.entries()[1].clone()]);
        assert_eq!(server.len(), 3);
    }

    #[test]
    fn frame_round_trip() {
        let reg = registry(&["apple", "pear"]);
        let mut registries = ElementRegistries::new();
        registries.insert(reg);
        let tags = resolved(registries.get(&RegistryKey::from_static("item")).unwrap());

        let packet = SyncPacket::collect(&registries, [&tags]);
        let bytes = packet.to_bytes().unwrap();
        assert_eq!(&bytes[..4], b"TAGS");
        assert_eq!(SyncPacket::from_bytes(&bytes).unwrap(), packet);
    }

    #[test]
    fn frame_rejects_bad_input() {
        let mut packet = SyncPacket::new();
        let mut payload = TagPayload::default();
        payload.tags.insert(loc("fruit"), vec![0]);
        packet.insert(RegistryKey::from_static("item"), payload);
        let bytes = packet.to_bytes().unwrap();

        assert!(matches!(
            SyncPacket::from_bytes(&bytes[..5]),
            Err(CodecError::Truncated { .. })
        ));
        assert!(matches!(
            SyncPacket::from_bytes(&bytes[..bytes.len() - 1]),
            Err(CodecError::Truncated { .. })
        ));

        let mut trailing = bytes.clone();
        trailing.push(0);
        assert!(matches!(
            SyncPacket::from_bytes(&trailing),
            Err(CodecError::TrailingBytes(1))
        ));

        let mut magic = bytes.clone();
        magic[0] = b'X';
        assert!(matches!(SyncPacket::from_bytes(&magic), Err(CodecError::BadMagic(_))));

        let mut version = bytes;
        version[4] = 9;
        assert!(matches!(
            SyncPacket::from_bytes(&version),
            Err(CodecError::UnsupportedVersion(9))
        ));
    }
}
