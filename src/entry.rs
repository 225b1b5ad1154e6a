//! Tag file data model — entries, documents and their source layers.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::location::{LocationError, ResourceLocation};

/// One reference inside a tag document.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawEntry", into = "RawEntry")]
pub enum TagEntry {
    /// A concrete registry element.
    Element {
        id: ResourceLocation,
        required: bool,
    },
    /// Another tag whose members are spliced in.
    TagRef {
        id: ResourceLocation,
        required: bool,
    },
}

impl TagEntry {
    pub fn element(id: ResourceLocation) -> Self {
        Self::Element { id, required: true }
    }

    pub fn optional_element(id: ResourceLocation) -> Self {
        Self::Element { id, required: false }
    }

    pub fn tag(id: ResourceLocation) -> Self {
        Self::TagRef { id, required: true }
    }

    pub fn optional_tag(id: ResourceLocation) -> Self {
        Self::TagRef { id, required: false }
    }

    /// Parse the string form: `ns:id` or `#ns:id`.
    pub fn parse(raw: &str, required: bool) -> Result<Self, LocationError> {
        match raw.strip_prefix('#') {
            Some(tag) => Ok(Self::TagRef {
                id: ResourceLocation::parse(tag)?,
                required,
            }),
            None => Ok(Self::Element {
                id: ResourceLocation::parse(raw)?,
                required,
            }),
        }
    }

    #[inline]
    pub fn id(&self) -> &ResourceLocation {
        match self {
            Self::Element { id, .. } | Self::TagRef { id, .. } => id,
        }
    }

    #[inline]
    pub fn is_required(&self) -> bool {
        match self {
            Self::Element { required, .. } | Self::TagRef { required, .. } => *required,
        }
    }

    #[inline]
    pub fn is_tag(&self) -> bool {
        matches!(self, Self::TagRef { .. })
    }
}

impl fmt::Display for TagEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_tag() {
            f.write_str("#")?;
        }
        write!(f, "{}", self.id())?;
        if !self.is_required() {
            f.write_str("?")?;
        }
        Ok(())
    }
}

/// On-disk shape of a single entry.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Plain(String),
    Detailed {
        id: String,
        #[serde(default = "default_required")]
        required: bool,
    },
}

fn default_required() -> bool {
    true
}

impl TryFrom<RawEntry> for TagEntry {
    type Error = LocationError;

    fn try_from(raw: RawEntry) -> Result<Self, Self::Error> {
        match raw {
            RawEntry::Plain(id) => TagEntry::parse(&id, true),
            RawEntry::Detailed { id, required } => TagEntry::parse(&id, required),
        }
    }
}

impl From<TagEntry> for RawEntry {
    fn from(entry: TagEntry) -> Self {
        let id = match &entry {
            TagEntry::Element { id, .. } => id.to_string(),
            TagEntry::TagRef { id, .. } => format!("#{}", id),
        };
        if entry.is_required() {
            RawEntry::Plain(id)
        } else {
            RawEntry::Detailed {
                id,
                required: false,
            }
        }
    }
}

// =============================================================================
// TagFile
// =============================================================================

/// One layer's document for one tag id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFile {
    /// Discard entries accumulated from lower-priority layers first.
    #[serde(default)]
    pub replace: bool,
    pub values: Vec<TagEntry>,
}

impl TagFile {
    pub fn new(values: Vec<TagEntry>) -> Self {
        Self {
            replace: false,
            values,
        }
    }

    pub fn replacing(values: Vec<TagEntry>) -> Self {
        Self {
            replace: true,
            values,
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, TagFileError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, TagFileError> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Why a single (tag id, layer) document could not be used.
#[derive(Debug, Error)]
pub enum TagFileError {
    #[error("failed to read tag document: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed tag document: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Provenance
// =============================================================================

/// Name of the content layer an entry came from.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(Arc<str>);

impl SourceId {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// An entry annotated with the layer that contributed it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryWithSource {
    pub entry: TagEntry,
    pub source: SourceId,
}

impl fmt::Display for EntryWithSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (from {})", self.entry, self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn loc(s: &str) -> ResourceLocation {
        ResourceLocation::parse(s).unwrap()
    }

    #[test]
    fn parse_all_entry_forms() {
        let json = br##"{
            "values": [
                "minecraft:oak_log",
                "#minecraft:birch_logs",
                {"id": "mymod:tin_ore", "required": false},
                {"id": "#mymod:ores"}
            ]
        }"##;
        let file = TagFile::from_slice(json).unwrap();

        assert!(!file.replace);
        assert_eq!(
            file.values,
            vec![
                TagEntry::element(loc("minecraft:oak_log")),
                TagEntry::tag(loc("minecraft:birch_logs")),
                TagEntry::optional_element(loc("mymod:tin_ore")),
                TagEntry::tag(loc("mymod:ores")),
            ]
        );
    }

    #[test]
    fn replace_flag() {
        let file = TagFile::from_slice(br#"{"replace": true, "values": ["stone"]}"#).unwrap();
        assert!(file.replace);
        assert_eq!(file.values, vec![TagEntry::element(loc("minecraft:stone"))]);
    }

    #[test]
    fn missing_values_is_an_error() {
        assert!(TagFile::from_slice(br#"{"replace": true}"#).is_err());
    }

    #[test]
    fn malformed_id_is_an_error() {
        let err = TagFile::from_slice(br#"{"values": ["Not A Location"]}"#).unwrap_err();
        assert!(matches!(err, TagFileError::Json(_)));
    }

    #[test]
    fn serializes_optional_entries_in_object_form() {
        let file = TagFile::new(vec![
            TagEntry::tag(loc("minecraft:logs")),
            TagEntry::optional_element(loc("mymod:tin_ore")),
        ]);
        let value: serde_json::Value = serde_json::from_slice(&file.to_vec().unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "replace": false,
                "values": ["#minecraft:logs", {"id": "mymod:tin_ore", "required": false}]
            })
        );
    }

    #[test]
    fn entry_display() {
        assert_eq!(TagEntry::tag(loc("minecraft:logs")).to_string(), "#minecraft:logs");
        assert_eq!(
            TagEntry::optional_element(loc("mymod:tin")).to_string(),
            "mymod:tin?"
        );
    }
}
