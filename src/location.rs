//! Identities — namespaced locations, registry keys and tag ids.
//!
//! All three are plain values: equality and hashing are structural, there is
//! no interning. Every type can be built in `const` context from `&'static str`
//! parts, which is what the `tag_keys!` macro relies on.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Namespace used when a location is written without a `namespace:` prefix.
pub const DEFAULT_NAMESPACE: &str = "minecraft";

/// Errors produced while parsing identities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("empty namespace in '{0}'")]
    EmptyNamespace(String),
    #[error("empty path in '{0}'")]
    EmptyPath(String),
    #[error("invalid character '{ch}' in namespace of '{input}'")]
    InvalidNamespace { input: String, ch: char },
    #[error("invalid character '{ch}' in path of '{input}'")]
    InvalidPath { input: String, ch: char },
    #[error("invalid registry key '{0}': expected [a-z0-9_/] and no empty segments")]
    InvalidRegistryKey(String),
}

#[inline]
pub const fn is_valid_namespace_char(c: char) -> bool {
    matches!(c, 'a'..='z' | '0'..='9' | '_' | '-' | '.')
}

#[inline]
pub const fn is_valid_path_char(c: char) -> bool {
    matches!(c, 'a'..='z' | '0'..='9' | '_' | '-' | '.' | '/')
}

// =============================================================================
// ResourceLocation
// =============================================================================

/// A `namespace:path` identifier naming an element or a tag.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceLocation {
    namespace: Cow<'static, str>,
    path: Cow<'static, str>,
}

impl ResourceLocation {
    /// Build from static parts without validation.
    ///
    /// Used by generated code, which validates at expansion time.
    pub const fn from_static(namespace: &'static str, path: &'static str) -> Self {
        Self {
            namespace: Cow::Borrowed(namespace),
            path: Cow::Borrowed(path),
        }
    }

    /// Build from owned parts, validating both.
    pub fn new(
        namespace: impl Into<String>,
        path: impl Into<String>,
    ) -> Result<Self, LocationError> {
        let namespace = namespace.into();
        let path = path.into();
        let display = format!("{}:{}", namespace, path);
        validate_namespace(&namespace, &display)?;
        validate_path(&path, &display)?;
        Ok(Self {
            namespace: Cow::Owned(namespace),
            path: Cow::Owned(path),
        })
    }

    /// Parse `namespace:path`, or `path` with the default namespace.
    pub fn parse(input: &str) -> Result<Self, LocationError> {
        match input.split_once(':') {
            Some((namespace, path)) => {
                validate_namespace(namespace, input)?;
                validate_path(path, input)?;
                Ok(Self {
                    namespace: Cow::Owned(namespace.to_string()),
                    path: Cow::Owned(path.to_string()),
                })
            }
            None => {
                validate_path(input, input)?;
                Ok(Self {
                    namespace: Cow::Borrowed(DEFAULT_NAMESPACE),
                    path: Cow::Owned(input.to_string()),
                })
            }
        }
    }

    #[inline]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }
}

fn validate_namespace(namespace: &str, input: &str) -> Result<(), LocationError> {
    if namespace.is_empty() {
        return Err(LocationError::EmptyNamespace(input.to_string()));
    }
    if let Some(ch) = namespace.chars().find(|&c| !is_valid_namespace_char(c)) {
        return Err(LocationError::InvalidNamespace {
            input: input.to_string(),
            ch,
        });
    }
    Ok(())
}

fn validate_path(path: &str, input: &str) -> Result<(), LocationError> {
    if path.is_empty() {
        return Err(LocationError::EmptyPath(input.to_string()));
    }
    if let Some(ch) = path.chars().find(|&c| !is_valid_path_char(c)) {
        return Err(LocationError::InvalidPath {
            input: input.to_string(),
            ch,
        });
    }
    Ok(())
}

impl fmt::Display for ResourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl FromStr for ResourceLocation {
    type Err = LocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ResourceLocation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResourceLocation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// RegistryKey
// =============================================================================

/// Name of an element registry, e.g. `block` or `worldgen/biome`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistryKey(Cow<'static, str>);

impl RegistryKey {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Result<Self, LocationError> {
        let name = name.into();
        let valid = !name.is_empty()
            && name
                .split('/')
                .all(|seg| !seg.is_empty() && seg.chars().all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_')));
        if !valid {
            return Err(LocationError::InvalidRegistryKey(name));
        }
        Ok(Self(Cow::Owned(name)))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegistryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for RegistryKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RegistryKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// TagId
// =============================================================================

/// Identity of a tag: the registry it groups elements of, plus its location.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagId {
    registry: RegistryKey,
    location: ResourceLocation,
}

impl TagId {
    pub const fn new(registry: RegistryKey, location: ResourceLocation) -> Self {
        Self { registry, location }
    }

    pub const fn from_static(
        registry: &'static str,
        namespace: &'static str,
        path: &'static str,
    ) -> Self {
        Self {
            registry: RegistryKey::from_static(registry),
            location: ResourceLocation::from_static(namespace, path),
        }
    }

    /// Parse a location into a tag id of `registry`.
    pub fn parse(registry: RegistryKey, location: &str) -> Result<Self, LocationError> {
        Ok(Self::new(registry, ResourceLocation::parse(location)?))
    }

    #[inline]
    pub fn registry(&self) -> &RegistryKey {
        &self.registry
    }

    #[inline]
    pub fn location(&self) -> &ResourceLocation {
        &self.location
    }

    /// Another tag of the same registry.
    pub fn sibling(&self, location: ResourceLocation) -> Self {
        Self::new(self.registry.clone(), location)
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} ({})", self.location, self.registry)
    }
}
