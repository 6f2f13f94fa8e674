//! Asset manifest - the set of keys a server is able to fetch
//!
//! ```json
//! {
//!     "assets": {
//!         "sedan": { "kind": "model", "path": "models/sedan.obj" },
//!         "asphalt": { "kind": "material", "path": "materials/asphalt.json" }
//!     }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::handle::AssetKind;
use crate::provider::{AssetError, AssetResult};

/// A single declared asset
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDecl {
    /// Resource kind
    pub kind: AssetKind,
    /// Path relative to the server's asset directory
    pub path: String,
}

/// Declared assets by key
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetManifest {
    #[serde(default)]
    assets: BTreeMap<String, AssetDecl>,
}

impl AssetManifest {
    /// Create an empty manifest
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a manifest from JSON text
    pub fn from_json(text: &str) -> AssetResult<Self> {
        serde_json::from_str(text).map_err(|e| AssetError::Manifest(e.to_string()))
    }

    /// Read and parse a manifest file
    pub fn from_file(path: impl AsRef<Path>) -> AssetResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    /// Declare an asset, replacing any previous declaration for the key
    pub fn declare(&mut self, key: impl Into<String>, kind: AssetKind, path: impl Into<String>) -> &mut Self {
        self.assets.insert(key.into(), AssetDecl { kind, path: path.into() });
        self
    }

    /// Builder-style declaration
    pub fn with(mut self, key: impl Into<String>, kind: AssetKind, path: impl Into<String>) -> Self {
        self.declare(key, kind, path);
        self
    }

    /// Look up a declaration
    pub fn get(&self, key: &str) -> Option<&AssetDecl> {
        self.assets.get(key)
    }

    /// Check if a key is declared
    pub fn contains(&self, key: &str) -> bool {
        self.assets.contains_key(key)
    }

    /// Merge another manifest into this one; entries in `other` win
    pub fn merge(&mut self, other: AssetManifest) {
        self.assets.extend(other.assets);
    }

    /// Iterate over declarations
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AssetDecl)> {
        self.assets.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of declared assets
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest() {
        let json = r#"{
            "assets": {
                "sedan": { "kind": "model", "path": "models/sedan.obj" },
                "asphalt": { "kind": "material", "path": "materials/asphalt.json" }
            }
        }"#;

        let manifest = AssetManifest::from_json(json).unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.get("sedan").unwrap().kind, AssetKind::Model);
        assert_eq!(manifest.get("asphalt").unwrap().path, "materials/asphalt.json");
    }

    #[test]
    fn test_invalid_manifest() {
        let result = AssetManifest::from_json(r#"{ "assets": { "x": { "kind": "shader", "path": "a" } } }"#);
        assert!(matches!(result, Err(AssetError::Manifest(_))));
    }

    #[test]
    fn test_merge_overrides() {
        let mut base = AssetManifest::new().with("car", AssetKind::Model, "old.obj");
        base.merge(AssetManifest::new().with("car", AssetKind::Model, "new.obj"));

        assert_eq!(base.len(), 1);
        assert_eq!(base.get("car").unwrap().path, "new.obj");
    }
}
