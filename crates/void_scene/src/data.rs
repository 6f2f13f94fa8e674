//! Node Data - the declarative description of a node and its subtree
//!
//! ```json
//! {
//!     "name": "map",
//!     "children": [
//!         { "name": "startMarker", "position": [0, 0, -4] },
//!         {
//!             "name": "obstacle",
//!             "tags": ["carObstacle"],
//!             "components": { "model": { "model": "sedan", "material": "red_paint" } }
//!         }
//!     ]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SceneResult;

/// Component kind resolved through the asset provider with suspension
pub const MODEL_COMPONENT: &str = "model";
/// Component kind whose texture references resolve synchronously
pub const PARTICLE_COMPONENT: &str = "particle";
/// Component kind dispatched through the behavior table
pub const SCRIPT_COMPONENT: &str = "script";

/// One node of a scene document
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    /// Node name
    pub name: String,
    /// Tags, in declared order
    #[serde(default)]
    pub tags: Vec<String>,
    /// Local position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<[f32; 3]>,
    /// Local rotation (Euler XYZ, radians)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<[f32; 3]>,
    /// Local scale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<[f32; 3]>,
    /// Component kind -> raw configuration
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub components: BTreeMap<String, Value>,
    /// Child nodes, order preserved
    #[serde(default)]
    pub children: Vec<NodeData>,
}

impl NodeData {
    /// Create a bare node
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Parse a node tree from JSON text
    pub fn from_json(text: &str) -> SceneResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Convert an already-parsed document value
    pub fn from_value(value: Value) -> SceneResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Read and parse a scene document from disk
    pub fn from_file(path: impl AsRef<Path>) -> SceneResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    /// Add a tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Add a child
    pub fn with_child(mut self, child: NodeData) -> Self {
        self.children.push(child);
        self
    }

    /// Add a component
    pub fn with_component(mut self, kind: impl Into<String>, config: Value) -> Self {
        self.components.insert(kind.into(), config);
        self
    }

    /// Set the position
    pub fn with_position(mut self, position: [f32; 3]) -> Self {
        self.position = Some(position);
        self
    }

    /// Set the rotation
    pub fn with_rotation(mut self, rotation: [f32; 3]) -> Self {
        self.rotation = Some(rotation);
        self
    }

    /// Set the scale
    pub fn with_scale(mut self, scale: [f32; 3]) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Whether the node declares a component that suspends on asset I/O
    pub fn has_asset_component(&self) -> bool {
        self.components.contains_key(MODEL_COMPONENT)
    }

    /// Number of nodes in this subtree, including this one
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(NodeData::subtree_len).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_defaults() {
        let data = NodeData::from_json(r#"{ "name": "leaf" }"#).unwrap();

        assert_eq!(data.name, "leaf");
        assert!(data.tags.is_empty());
        assert!(data.children.is_empty());
        assert!(data.components.is_empty());
        assert!(data.position.is_none());
        assert!(!data.has_asset_component());
    }

    #[test]
    fn test_parse_nested() {
        let data = NodeData::from_value(json!({
            "name": "map",
            "children": [
                { "name": "a", "position": [1, 2, 3] },
                { "name": "b", "tags": ["x", "y"], "components": { "model": "sedan" } }
            ]
        }))
        .unwrap();

        assert_eq!(data.subtree_len(), 3);
        assert_eq!(data.children[0].name, "a");
        assert_eq!(data.children[0].position, Some([1.0, 2.0, 3.0]));
        assert_eq!(data.children[1].tags, vec!["x", "y"]);
        assert!(data.children[1].has_asset_component());
    }

    #[test]
    fn test_parse_rejects_bad_transform() {
        let result = NodeData::from_value(json!({ "name": "a", "scale": [1, 2] }));
        assert!(result.is_err());
    }

    #[test]
    fn test_builder() {
        let data = NodeData::new("car")
            .with_tag("vehicle")
            .with_scale([2.0, 2.0, 2.0])
            .with_child(NodeData::new("wheel"));

        assert_eq!(data.tags, vec!["vehicle"]);
        assert_eq!(data.scale, Some([2.0, 2.0, 2.0]));
        assert_eq!(data.subtree_len(), 2);
    }
}
