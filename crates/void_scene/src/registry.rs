//! Type Registry - picks the node type for a data block
//!
//! Exact node names and tags share one key space. Dispatch order:
//! 1. an entry for the node's exact name
//! 2. the first of the node's tags, in declared order, that has an entry
//! 3. the default factory (a [`GenericNode`])

use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::data::NodeData;
use crate::env::TreeContext;
use crate::node::{GenericNode, LoaderNode, SceneNode};

/// Everything a factory needs to build one node
pub struct NodeInit {
    pub(crate) data: NodeData,
    pub(crate) parent: Weak<LoaderNode>,
    pub(crate) context: Rc<TreeContext>,
}

impl NodeInit {
    /// The node's data block
    pub fn data(&self) -> &NodeData {
        &self.data
    }

    /// The node's name
    pub fn name(&self) -> &str {
        &self.data.name
    }

    /// The shared tree context
    pub fn context(&self) -> &TreeContext {
        &self.context
    }
}

impl fmt::Debug for NodeInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeInit")
            .field("name", &self.data.name)
            .field("has_parent", &(self.parent.strong_count() > 0))
            .finish()
    }
}

/// Node factory
pub type NodeFactory = dyn Fn(NodeInit) -> Rc<dyn SceneNode>;

/// Which registry entry a data block resolved to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch<'a> {
    /// Matched the node's exact name
    Name(&'a str),
    /// Matched one of the node's tags
    Tag(&'a str),
    /// Nothing matched
    Default,
}

/// Mapping from name or tag to node factory
pub struct TypeRegistry {
    entries: HashMap<String, Box<NodeFactory>>,
    default: Box<NodeFactory>,
}

impl TypeRegistry {
    /// Create a registry whose only type is the generic node
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            default: Box::new(GenericNode::create),
        }
    }

    /// Register a factory under a name or tag
    pub fn register<F>(&mut self, key: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(NodeInit) -> Rc<dyn SceneNode> + 'static,
    {
        self.entries.insert(key.into(), Box::new(factory));
        self
    }

    /// Builder-style registration
    pub fn with<F>(mut self, key: impl Into<String>, factory: F) -> Self
    where
        F: Fn(NodeInit) -> Rc<dyn SceneNode> + 'static,
    {
        self.register(key, factory);
        self
    }

    /// Replace the fallback factory
    pub fn set_default<F>(&mut self, factory: F) -> &mut Self
    where
        F: Fn(NodeInit) -> Rc<dyn SceneNode> + 'static,
    {
        self.default = Box::new(factory);
        self
    }

    /// Which entry `data` dispatches to
    pub fn dispatch<'a>(&self, data: &'a NodeData) -> Dispatch<'a> {
        if self.entries.contains_key(&data.name) {
            return Dispatch::Name(&data.name);
        }
        data.tags
            .iter()
            .find(|tag| self.entries.contains_key(tag.as_str()))
            .map_or(Dispatch::Default, |tag| Dispatch::Tag(tag))
    }

    /// The factory for `data`
    pub fn resolve(&self, data: &NodeData) -> &NodeFactory {
        match self.dispatch(data) {
            Dispatch::Name(key) | Dispatch::Tag(key) => self.entries[key].as_ref(),
            Dispatch::Default => self.default.as_ref(),
        }
    }

    /// Check if a key is registered
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of registered keys (excluding the default)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.entries.keys().collect();
        keys.sort();
        f.debug_struct("TypeRegistry").field("keys", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(init: NodeInit) -> Rc<dyn SceneNode> {
        GenericNode::create(init)
    }

    fn registry() -> TypeRegistry {
        TypeRegistry::new().with("bridge", noop).with("unknown", noop)
    }

    #[test]
    fn test_dispatch_by_tag() {
        let data = NodeData::new("x").with_tag("bridge");
        assert_eq!(registry().dispatch(&data), Dispatch::Tag("bridge"));
    }

    #[test]
    fn test_dispatch_by_name() {
        let data = NodeData::new("bridge");
        assert_eq!(registry().dispatch(&data), Dispatch::Name("bridge"));
    }

    #[test]
    fn test_name_beats_tag() {
        let data = NodeData::new("bridge").with_tag("unknown");
        assert_eq!(registry().dispatch(&data), Dispatch::Name("bridge"));
    }

    #[test]
    fn test_first_tag_wins() {
        let data = NodeData::new("x").with_tag("unknown").with_tag("bridge");
        assert_eq!(registry().dispatch(&data), Dispatch::Tag("unknown"));

        let data = NodeData::new("x").with_tag("nothing").with_tag("bridge");
        assert_eq!(registry().dispatch(&data), Dispatch::Tag("bridge"));
    }

    #[test]
    fn test_default_dispatch() {
        let data = NodeData::new("x").with_tag("nothing");
        assert_eq!(registry().dispatch(&data), Dispatch::Default);
        assert_eq!(TypeRegistry::new().len(), 0);
    }
}
