//! Asset Handle - Reference to resident assets
//!
//! Handles are cheap to clone and share the resident bytes of an asset.
//! A handle only exists for an asset that has finished loading, so holding
//! one means the asset is ready to use.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Unique identifier for an asset
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetId(pub u64);

impl AssetId {
    /// Create a new asset ID
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Invalid asset ID
    pub const fn invalid() -> Self {
        Self(u64::MAX)
    }

    /// Check if valid
    pub const fn is_valid(&self) -> bool {
        self.0 != u64::MAX
    }

    /// Get raw ID value
    pub const fn id(&self) -> u64 {
        self.0
    }
}

impl Default for AssetId {
    fn default() -> Self {
        Self::invalid()
    }
}

/// Kind of resource an asset key refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// Model geometry
    Model,
    /// Surface material
    Material,
    /// Texture image
    Texture,
    /// Particle system configuration
    Particle,
    /// Audio clip
    Audio,
    /// Opaque data blob
    Data,
}

impl AssetKind {
    /// Lowercase name used in manifests and log output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Material => "material",
            Self::Texture => "texture",
            Self::Particle => "particle",
            Self::Audio => "audio",
            Self::Data => "data",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "model" | "mesh" => Ok(Self::Model),
            "material" => Ok(Self::Material),
            "texture" | "image" => Ok(Self::Texture),
            "particle" | "particles" => Ok(Self::Particle),
            "audio" | "sound" => Ok(Self::Audio),
            "data" | "bytes" => Ok(Self::Data),
            _ => Err(format!("Unknown asset kind: {}", s)),
        }
    }
}

/// Load state for an asset as seen by the server
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadState {
    /// Declared but never requested
    NotLoaded,
    /// Queued for the next `process` call
    Loading,
    /// Resident and ready
    Loaded,
    /// Last fetch failed
    Failed,
}

/// Internal handle data
struct HandleData {
    id: AssetId,
    key: String,
    kind: AssetKind,
    bytes: Arc<[u8]>,
}

/// Shared handle to a resident asset
#[derive(Clone)]
pub struct AssetHandle {
    data: Arc<HandleData>,
}

impl AssetHandle {
    /// Create a handle for freshly stored bytes
    pub fn new(id: AssetId, key: impl Into<String>, kind: AssetKind, bytes: impl Into<Arc<[u8]>>) -> Self {
        let data = Arc::new(HandleData {
            id,
            key: key.into(),
            kind,
            bytes: bytes.into(),
        });
        Self { data }
    }

    /// Get the asset ID
    pub fn id(&self) -> AssetId {
        self.data.id
    }

    /// Get the key the asset was declared under
    pub fn key(&self) -> &str {
        &self.data.key
    }

    /// Get the asset kind
    pub fn kind(&self) -> AssetKind {
        self.data.kind
    }

    /// Get the resident bytes
    pub fn bytes(&self) -> &[u8] {
        &self.data.bytes
    }

    /// Size of the resident bytes
    pub fn len(&self) -> usize {
        self.data.bytes.len()
    }

    /// Check if the asset is empty
    pub fn is_empty(&self) -> bool {
        self.data.bytes.is_empty()
    }

    /// Number of live handles sharing this asset
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.data)
    }
}

impl PartialEq for AssetHandle {
    fn eq(&self, other: &Self) -> bool {
        self.data.id == other.data.id
    }
}

impl Eq for AssetHandle {}

impl Hash for AssetHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.data.id.hash(state);
    }
}

impl fmt::Debug for AssetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetHandle")
            .field("id", &self.data.id)
            .field("key", &self.data.key)
            .field("kind", &self.data.kind)
            .field("len", &self.data.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_basic() {
        let handle = AssetHandle::new(AssetId::new(42), "car", AssetKind::Model, vec![1u8, 2, 3]);

        assert_eq!(handle.id(), AssetId::new(42));
        assert_eq!(handle.key(), "car");
        assert_eq!(handle.kind(), AssetKind::Model);
        assert_eq!(handle.bytes(), &[1, 2, 3]);
    }

    #[test]
    fn test_handle_clone() {
        let handle1 = AssetHandle::new(AssetId::new(7), "car", AssetKind::Model, Vec::new());
        let handle2 = handle1.clone();

        assert_eq!(handle1, handle2);
        assert_eq!(handle1.ref_count(), 2);

        drop(handle2);
        assert_eq!(handle1.ref_count(), 1);
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("Mesh".parse::<AssetKind>(), Ok(AssetKind::Model));
        assert_eq!("material".parse::<AssetKind>(), Ok(AssetKind::Material));
        assert!("shader".parse::<AssetKind>().is_err());
        assert_eq!(AssetKind::Texture.to_string(), "texture");
    }

    #[test]
    fn test_invalid_id() {
        assert!(!AssetId::default().is_valid());
        assert!(AssetId::new(1).is_valid());
    }
}
