//! Tree Builder - turns a Node Data document into a loader node tree
//!
//! The whole tree is materialized before any node starts loading, so a
//! caller can subscribe to [`SceneTree::on_loaded`] and only then call
//! [`Loadable::load`]. With `auto_load` the root load is spawned on the
//! environment's local spawner and starts the next time that executor runs.
//! Without a spawner the root load starts during construction and its
//! future is held until the caller asks for it through `load()`.
//!
//! ```ignore
//! let tree = SceneTree::construct(data, false, registry, env, TreeOptions::default());
//! tree.on_loaded(|| log::info!("scene ready"));
//! pool.spawner().spawn_local(tree.load())?;
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::path::Path;
use std::rc::{Rc, Weak};

use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};

use crate::data::NodeData;
use crate::env::{SceneEnv, TreeContext};
use crate::error::SceneResult;
use crate::node::{Loadable, LoaderNode, NodeState, SceneNode};
use crate::registry::TypeRegistry;
use crate::signal::{Signal, SubscriberId};

/// Options for building a tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeOptions {
    /// Start loading as soon as the tree is built
    pub auto_load: bool,
}

impl TreeOptions {
    /// Options with `auto_load` enabled
    pub fn auto_load() -> Self {
        Self { auto_load: true }
    }
}

/// A constructed scene tree
pub struct SceneTree {
    root: Rc<dyn SceneNode>,
    context: Rc<TreeContext>,
    loaded: Rc<Signal<()>>,
    fired: Rc<Cell<bool>>,
    /// Root load started in place by `auto_load`, not yet handed out
    started: RefCell<Option<LocalBoxFuture<'static, ()>>>,
}

impl SceneTree {
    /// Build the full node tree for `root_data`
    ///
    /// No asset I/O happens here. `caching` is forwarded to every asset
    /// request the tree makes.
    pub fn construct(
        root_data: NodeData,
        caching: bool,
        registry: Rc<TypeRegistry>,
        env: SceneEnv,
        options: TreeOptions,
    ) -> Self {
        let context = TreeContext::new(registry, env, caching);
        let name = root_data.name.clone();
        let root = LoaderNode::instantiate(root_data, Weak::new(), &context);

        let loaded = Rc::new(Signal::new());
        let fired = Rc::new(Cell::new(false));
        {
            let loaded = Rc::clone(&loaded);
            let fired = Rc::clone(&fired);
            root.node().loaded_signal().connect_once(move |_| {
                if !fired.replace(true) {
                    loaded.emit(&());
                }
            });
        }

        let tree = Self {
            root,
            context,
            loaded,
            fired,
            started: RefCell::new(None),
        };
        log::info!("Constructed scene '{}' with {} nodes", name, tree.node_count());

        if options.auto_load {
            tree.auto_load();
        }
        tree
    }

    fn auto_load(&self) {
        if self.context.env().can_spawn() && self.spawn_load() {
            return;
        }
        log::debug!("Loading scene '{}' in place", self.root.node().name());
        let pending = self.root.node().load();
        *self.started.borrow_mut() = Some(pending);
    }

    /// Parse a JSON document and build its tree
    pub fn from_json(
        text: &str,
        caching: bool,
        registry: Rc<TypeRegistry>,
        env: SceneEnv,
        options: TreeOptions,
    ) -> SceneResult<Self> {
        let data = NodeData::from_json(text)?;
        Ok(Self::construct(data, caching, registry, env, options))
    }

    /// Read a JSON document from disk and build its tree
    pub fn from_file(
        path: impl AsRef<Path>,
        caching: bool,
        registry: Rc<TypeRegistry>,
        env: SceneEnv,
        options: TreeOptions,
    ) -> SceneResult<Self> {
        let data = NodeData::from_file(path)?;
        Ok(Self::construct(data, caching, registry, env, options))
    }

    /// Spawn the root load on the environment's spawner
    ///
    /// Returns false if nothing was spawned; `load()` can still be called
    /// manually.
    pub fn spawn_load(&self) -> bool {
        let root = Rc::clone(&self.root);
        match self.context.env().spawn(async move { root.node().load().await }) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Scene '{}' not auto-loaded: {}", self.root.node().name(), e);
                false
            }
        }
    }

    /// Subscribe to the tree-wide `Loaded` event
    pub fn on_loaded<F>(&self, listener: F) -> SubscriberId
    where
        F: Fn() + 'static,
    {
        self.loaded.connect(move |_| listener())
    }

    /// Unsubscribe from the `Loaded` event
    pub fn disconnect_loaded(&self, id: SubscriberId) -> bool {
        self.loaded.disconnect(id)
    }

    /// Subscribe to the root's progress
    pub fn on_progress<F>(&self, listener: F) -> SubscriberId
    where
        F: Fn(f32) + 'static,
    {
        self.root.node().on_progress(listener)
    }

    /// Whether the tree-wide `Loaded` event has fired
    pub fn has_fired(&self) -> bool {
        self.fired.get()
    }

    /// The root node
    pub fn root(&self) -> &Rc<dyn SceneNode> {
        &self.root
    }

    /// The root's loader node
    pub fn root_node(&self) -> &Rc<LoaderNode> {
        self.root.node()
    }

    /// The shared tree context
    pub fn context(&self) -> &TreeContext {
        &self.context
    }

    /// Load state of the root
    pub fn state(&self) -> NodeState {
        self.root.node().state()
    }

    /// Fraction of the root's children loaded
    pub fn progress(&self) -> f32 {
        self.root.node().progress()
    }

    /// First node named `name`, root included, depth-first
    pub fn find(&self, name: &str) -> Option<Rc<dyn SceneNode>> {
        if self.root.node().name() == name {
            return Some(Rc::clone(&self.root));
        }
        self.root.node().find_descendant(name)
    }

    /// Every node carrying `tag`, root included, depth-first
    pub fn find_by_tag(&self, tag: &str) -> Vec<Rc<dyn SceneNode>> {
        let mut found = Vec::new();
        if self.root.node().has_tag(tag) {
            found.push(Rc::clone(&self.root));
        }
        found.extend(self.root.node().descendants_with_tag(tag));
        found
    }

    /// Total number of nodes
    pub fn node_count(&self) -> usize {
        self.root.node().subtree_len()
    }

    /// Tear down every node
    pub fn destroy(&self) {
        self.loaded.clear();
        self.root.node().destroy();
    }
}

impl Loadable for SceneTree {
    fn load(&self) -> LocalBoxFuture<'static, ()> {
        let started = self.started.borrow_mut().take();
        match started {
            Some(pending) => pending,
            None => self.root.node().load(),
        }
    }

    fn is_loaded(&self) -> bool {
        self.root.node().is_loaded()
    }
}

impl fmt::Debug for SceneTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneTree")
            .field("root", self.root.node())
            .field("fired", &self.fired.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::{block_on, LocalPool};
    use void_asset::AssetServer;

    fn env() -> SceneEnv {
        SceneEnv::new(Rc::new(AssetServer::default_config()))
    }

    fn map() -> NodeData {
        NodeData::new("map")
            .with_child(NodeData::new("start").with_tag("marker"))
            .with_child(NodeData::new("row").with_child(NodeData::new("cone").with_tag("marker")))
    }

    #[test]
    fn test_construct_does_not_load() {
        let tree = SceneTree::construct(map(), false, Rc::new(TypeRegistry::new()), env(), TreeOptions::default());

        assert_eq!(tree.node_count(), 4);
        assert_eq!(tree.state(), NodeState::Constructed);
        assert!(!tree.is_loaded());
    }

    #[test]
    fn test_loaded_fires_once() {
        let tree = SceneTree::construct(map(), false, Rc::new(TypeRegistry::new()), env(), TreeOptions::default());

        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        tree.on_loaded(move || c.set(c.get() + 1));

        block_on(tree.load());
        block_on(tree.load());
        assert!(tree.is_loaded());
        assert!(tree.has_fired());
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_auto_load_on_spawner() {
        let mut pool = LocalPool::new();
        let env = env().with_spawner(pool.spawner());
        let tree = SceneTree::construct(map(), false, Rc::new(TypeRegistry::new()), env, TreeOptions::auto_load());

        let fired = Rc::new(Cell::new(false));
        let f = Rc::clone(&fired);
        tree.on_loaded(move || f.set(true));
        assert!(!fired.get());

        pool.run_until_stalled();
        assert!(fired.get());
    }

    #[test]
    fn test_auto_load_without_spawner_loads_in_place() {
        let tree = SceneTree::construct(map(), false, Rc::new(TypeRegistry::new()), env(), TreeOptions::auto_load());

        assert_eq!(tree.state(), NodeState::Loaded);
        assert!(tree.is_loaded());
        assert!(tree.has_fired());

        block_on(tree.load());
        assert!(tree.is_loaded());
    }

    #[test]
    fn test_find_helpers() {
        let tree = SceneTree::construct(map(), false, Rc::new(TypeRegistry::new()), env(), TreeOptions::default());

        assert!(tree.find("map").is_some());
        assert_eq!(tree.find("cone").unwrap().node().name(), "cone");
        assert!(tree.find("finish").is_none());

        let markers: Vec<_> = tree
            .find_by_tag("marker")
            .iter()
            .map(|n| n.node().name().to_string())
            .collect();
        assert_eq!(markers, vec!["start", "cone"]);
    }

    #[test]
    fn test_from_json() {
        let text = r#"{ "name": "map", "children": [ { "name": "a" } ] }"#;
        let tree = SceneTree::from_json(text, true, Rc::new(TypeRegistry::new()), env(), TreeOptions::default()).unwrap();
        assert_eq!(tree.node_count(), 2);
        assert!(tree.context().caching());

        assert!(SceneTree::from_json("{", false, Rc::new(TypeRegistry::new()), env(), TreeOptions::default()).is_err());
    }
}
