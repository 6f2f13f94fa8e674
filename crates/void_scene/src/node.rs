//! Loader nodes and bottom-up completion tracking
//!
//! A [`LoaderNode`] is the shared base of every node type. It owns its data
//! block, its children, its attached components and the two notifications a
//! tree exposes:
//!
//! - `loaded` fires exactly once, when the node's own component is ready and
//!   every child has reported loaded
//! - `progress` fires after each child completion with `loaded / total`
//!
//! Completion propagates upward: a node that becomes loaded notifies its
//! parent, which may in turn become loaded. Node types registered in the
//! [`TypeRegistry`](crate::registry::TypeRegistry) wrap a `LoaderNode` and
//! implement [`SceneNode`].

use std::any::Any;
use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use futures::future::{self, join_all, LocalBoxFuture};
use futures::FutureExt;

use crate::component::{self, Component, ModelComponent};
use crate::data::{NodeData, MODEL_COMPONENT, PARTICLE_COMPONENT, SCRIPT_COMPONENT};
use crate::env::TreeContext;
use crate::error::SceneResult;
use crate::registry::NodeInit;
use crate::signal::{Signal, SubscriberId};
use crate::transform::Transform;

// ============================================================================
// Traits
// ============================================================================

/// Something that can be loaded and reports when it is done
pub trait Loadable {
    /// Start loading
    ///
    /// The synchronous part of loading (tags, components, transform, child
    /// loads) runs before this returns. The returned future drives pending
    /// asset fetches and completes when they have all settled, successfully
    /// or not. Errors are logged, never returned.
    fn load(&self) -> LocalBoxFuture<'static, ()>;

    /// Whether loading has completed
    fn is_loaded(&self) -> bool;
}

/// A node type built by a registry factory
pub trait SceneNode: Any {
    /// The shared loader node
    fn node(&self) -> &Rc<LoaderNode>;

    /// Get as Any reference (for downcasting)
    fn as_any(&self) -> &dyn Any;

    /// Type name for diagnostics
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl dyn SceneNode {
    /// Downcast to a concrete node type
    pub fn downcast_ref<T: SceneNode>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    /// Check the concrete node type
    pub fn is<T: SceneNode>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

impl fmt::Debug for dyn SceneNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneNode")
            .field("type", &self.type_name())
            .field("node", self.node())
            .finish()
    }
}

/// Node type used when no registry entry matches
pub struct GenericNode {
    node: Rc<LoaderNode>,
}

impl GenericNode {
    /// Default factory
    pub fn create(init: NodeInit) -> Rc<dyn SceneNode> {
        Rc::new(Self {
            node: LoaderNode::new(init),
        })
    }
}

impl SceneNode for GenericNode {
    fn node(&self) -> &Rc<LoaderNode> {
        &self.node
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// LoaderNode
// ============================================================================

/// Load state of a node
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeState {
    /// Built, `load()` not yet called
    Constructed,
    /// Loading, waiting on its own component or on children
    Pending,
    /// `loaded` has fired
    Loaded,
}

/// Shared base of every scene node
pub struct LoaderNode {
    me: Weak<LoaderNode>,
    data: NodeData,
    context: Rc<TreeContext>,
    parent: Weak<LoaderNode>,
    children: RefCell<Vec<Rc<dyn SceneNode>>>,

    children_loaded: Cell<usize>,
    own_component_loaded: Cell<bool>,
    started: Cell<bool>,
    reported: Cell<bool>,
    destroyed: Cell<bool>,

    tags: RefCell<Vec<String>>,
    transform: Cell<Transform>,
    components: RefCell<Vec<Component>>,

    loaded: Signal<()>,
    progress: Signal<f32>,
    component_ready: Signal<()>,
}

impl LoaderNode {
    /// Create the base node for a factory
    ///
    /// Children are built by the tree builder once the factory returns.
    pub fn new(init: NodeInit) -> Rc<Self> {
        let NodeInit {
            data,
            parent,
            context,
        } = init;

        let node = Rc::new_cyclic(|me| Self {
            me: me.clone(),
            data,
            context,
            parent,
            children: RefCell::new(Vec::new()),
            children_loaded: Cell::new(0),
            own_component_loaded: Cell::new(false),
            started: Cell::new(false),
            reported: Cell::new(false),
            destroyed: Cell::new(false),
            tags: RefCell::new(Vec::new()),
            transform: Cell::new(Transform::IDENTITY),
            components: RefCell::new(Vec::new()),
            loaded: Signal::new(),
            progress: Signal::new(),
            component_ready: Signal::new(),
        });

        let weak = Rc::downgrade(&node);
        node.component_ready.connect(move |_| {
            if let Some(node) = weak.upgrade() {
                node.check_loaded();
            }
        });

        node
    }

    /// Build a node and its whole subtree from `data`
    pub(crate) fn instantiate(
        data: NodeData,
        parent: Weak<LoaderNode>,
        context: &Rc<TreeContext>,
    ) -> Rc<dyn SceneNode> {
        let registry = Rc::clone(&context.registry);
        log::trace!("Building node '{}' as {:?}", data.name, registry.dispatch(&data));

        let factory = registry.resolve(&data);
        let node = factory(NodeInit {
            data,
            parent,
            context: Rc::clone(context),
        });
        node.node().build_children();
        node
    }

    fn build_children(&self) {
        for child_data in &self.data.children {
            let child = Self::instantiate(child_data.clone(), self.me.clone(), &self.context);
            self.children.borrow_mut().push(child);
        }
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Attach synchronous components and collect the suspending ones
    fn start_components(&self, pending: &mut Vec<LocalBoxFuture<'static, SceneResult<()>>>) {
        for (kind, config) in &self.data.components {
            match kind.as_str() {
                MODEL_COMPONENT => {
                    if let Some(this) = self.me.upgrade() {
                        pending.push(component::resolve_model(this, config.clone()).boxed_local());
                    }
                }
                PARTICLE_COMPONENT => {
                    let particle = component::resolve_particle(self, config);
                    self.components.borrow_mut().push(Component::Particle(particle));
                }
                SCRIPT_COMPONENT => {
                    let script = component::resolve_script(self, config);
                    self.components.borrow_mut().push(Component::Script(script));
                }
                _ => self.components.borrow_mut().push(Component::Passthrough {
                    kind: kind.clone(),
                    config: config.clone(),
                }),
            }
        }
    }

    fn merge_tags(&self) {
        let mut tags = self.tags.borrow_mut();
        for tag in &self.data.tags {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }
    }

    fn apply_transform(&self) {
        let mut transform = self.transform.get();
        transform.apply(&self.data);
        self.transform.set(transform);
    }

    /// Attach a resolved model and mark the own component loaded
    pub(crate) fn attach_model(&self, model: ModelComponent) {
        if self.destroyed.get() {
            log::debug!("Node '{}' destroyed before its model resolved", self.name());
            return;
        }
        self.components.borrow_mut().push(Component::Model(model));
        self.own_component_loaded.set(true);
        self.component_ready.emit(&());
    }

    /// Fire `loaded` and notify the parent, once, if the node is complete
    pub fn check_loaded(&self) {
        if self.reported.get() || self.destroyed.get() || !self.is_loaded() {
            return;
        }
        self.reported.set(true);

        log::debug!("Node '{}' loaded", self.name());
        self.loaded.emit(&());

        if let Some(parent) = self.parent.upgrade() {
            parent.on_child_loaded();
        }
    }

    /// Record one child completion
    pub fn on_child_loaded(&self) {
        let total = self.child_count();
        let count = self.children_loaded.get();
        if count >= total {
            log::warn!(
                "Node '{}' got a child completion beyond its {} children",
                self.name(),
                total
            );
            return;
        }

        let count = count + 1;
        self.children_loaded.set(count);
        self.check_loaded();

        if !self.destroyed.get() {
            self.progress.emit(&(count as f32 / total as f32));
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Node name
    pub fn name(&self) -> &str {
        &self.data.name
    }

    /// The data block this node was built from
    pub fn data(&self) -> &NodeData {
        &self.data
    }

    /// The shared tree context
    pub fn context(&self) -> &TreeContext {
        &self.context
    }

    /// Identity tags (declared tags are merged in by `load()`)
    pub fn tags(&self) -> Vec<String> {
        self.tags.borrow().clone()
    }

    /// Add an identity tag; used by node types
    pub fn add_tag(&self, tag: impl Into<String>) {
        let tag = tag.into();
        let mut tags = self.tags.borrow_mut();
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    /// Check identity and declared tags
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.borrow().iter().any(|t| t == tag) || self.data.tags.iter().any(|t| t == tag)
    }

    /// Local transform
    pub fn transform(&self) -> Transform {
        self.transform.get()
    }

    /// Attached components
    pub fn components(&self) -> Ref<'_, [Component]> {
        Ref::map(self.components.borrow(), |c| c.as_slice())
    }

    /// Check if a component of `kind` is attached
    pub fn has_component(&self, kind: &str) -> bool {
        self.components.borrow().iter().any(|c| c.kind() == kind)
    }

    /// The attached model, if resolved
    pub fn model(&self) -> Option<ModelComponent> {
        self.components.borrow().iter().find_map(|c| match c {
            Component::Model(model) => Some(model.clone()),
            _ => None,
        })
    }

    /// Child nodes in declared order
    pub fn children(&self) -> Vec<Rc<dyn SceneNode>> {
        self.children.borrow().clone()
    }

    /// Child at `index`
    pub fn child(&self, index: usize) -> Option<Rc<dyn SceneNode>> {
        self.children.borrow().get(index).cloned()
    }

    /// Number of children
    pub fn child_count(&self) -> usize {
        self.children.borrow().len()
    }

    /// Number of children that reported loaded
    pub fn children_loaded(&self) -> usize {
        self.children_loaded.get()
    }

    /// Whether the node's own component is ready
    pub fn is_own_component_loaded(&self) -> bool {
        self.own_component_loaded.get()
    }

    /// Parent node, `None` for the root
    pub fn parent(&self) -> Option<Rc<LoaderNode>> {
        self.parent.upgrade()
    }

    /// Current load state
    pub fn state(&self) -> NodeState {
        if self.reported.get() {
            NodeState::Loaded
        } else if self.started.get() {
            NodeState::Pending
        } else {
            NodeState::Constructed
        }
    }

    /// Fraction of children loaded; leaves report 0 or 1
    pub fn progress(&self) -> f32 {
        match self.child_count() {
            0 if self.is_loaded() => 1.0,
            0 => 0.0,
            total => self.children_loaded.get() as f32 / total as f32,
        }
    }

    /// Subscribe to the `loaded` event
    pub fn on_loaded<F>(&self, listener: F) -> SubscriberId
    where
        F: Fn() + 'static,
    {
        self.loaded.connect(move |_| listener())
    }

    /// Subscribe to `progress` events
    pub fn on_progress<F>(&self, listener: F) -> SubscriberId
    where
        F: Fn(f32) + 'static,
    {
        self.progress.connect(move |p| listener(*p))
    }

    /// The `loaded` signal
    pub fn loaded_signal(&self) -> &Signal<()> {
        &self.loaded
    }

    /// The `progress` signal
    pub fn progress_signal(&self) -> &Signal<f32> {
        &self.progress
    }

    /// First descendant named `name`, depth-first in declared order
    pub fn find_descendant(&self, name: &str) -> Option<Rc<dyn SceneNode>> {
        for child in self.children() {
            if child.node().name() == name {
                return Some(child);
            }
            if let Some(found) = child.node().find_descendant(name) {
                return Some(found);
            }
        }
        None
    }

    /// Every descendant carrying `tag`, depth-first in declared order
    pub fn descendants_with_tag(&self, tag: &str) -> Vec<Rc<dyn SceneNode>> {
        let mut out = Vec::new();
        self.collect_with_tag(tag, &mut out);
        out
    }

    fn collect_with_tag(&self, tag: &str, out: &mut Vec<Rc<dyn SceneNode>>) {
        for child in self.children() {
            if child.node().has_tag(tag) {
                out.push(Rc::clone(&child));
            }
            child.node().collect_with_tag(tag, out);
        }
    }

    /// Number of nodes in this subtree, including this one
    pub fn subtree_len(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(|c| c.node().subtree_len())
            .sum::<usize>()
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Detach this subtree
    ///
    /// Listeners are dropped, no further events fire, and late asset
    /// completions are ignored.
    pub fn destroy(&self) {
        if self.destroyed.replace(true) {
            return;
        }
        log::debug!("Destroying node '{}'", self.name());

        let children = std::mem::take(&mut *self.children.borrow_mut());
        for child in &children {
            child.node().destroy();
        }

        self.components.borrow_mut().clear();
        self.loaded.clear();
        self.progress.clear();
        self.component_ready.clear();
    }

    /// Whether `destroy()` has been called
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }
}

impl Loadable for LoaderNode {
    fn load(&self) -> LocalBoxFuture<'static, ()> {
        if self.destroyed.get() {
            log::debug!("Ignoring load() on destroyed node '{}'", self.name());
            return future::ready(()).boxed_local();
        }
        if self.started.replace(true) {
            log::debug!("Node '{}' is already loading", self.name());
            return future::ready(()).boxed_local();
        }

        self.merge_tags();

        let has_asset = self.data.has_asset_component();
        if !has_asset {
            self.own_component_loaded.set(true);
        }

        let mut pending = Vec::new();
        self.start_components(&mut pending);

        self.apply_transform();

        if !has_asset && self.child_count() == 0 {
            self.check_loaded();
        }

        let children_pending: Vec<_> = self.children().iter().map(|c| c.node().load()).collect();

        let name = self.name().to_string();
        async move {
            let (results, _) = future::join(join_all(pending), join_all(children_pending)).await;
            for result in results {
                if let Err(e) = result {
                    log::error!("Node '{}' stays pending: {}", name, e);
                }
            }
        }
        .boxed_local()
    }

    fn is_loaded(&self) -> bool {
        self.own_component_loaded.get() && self.children_loaded.get() == self.child_count()
    }
}

impl fmt::Debug for LoaderNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderNode")
            .field("name", &self.data.name)
            .field("state", &self.state())
            .field("children", &self.child_count())
            .field("children_loaded", &self.children_loaded.get())
            .field("own_component_loaded", &self.own_component_loaded.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::SceneEnv;
    use crate::registry::TypeRegistry;
    use futures::executor::block_on;
    use void_asset::AssetServer;

    fn build(data: NodeData) -> Rc<dyn SceneNode> {
        let env = SceneEnv::new(Rc::new(AssetServer::default_config()));
        let context = TreeContext::new(Rc::new(TypeRegistry::new()), env, false);
        LoaderNode::instantiate(data, Weak::new(), &context)
    }

    #[test]
    fn test_leaf_loads_synchronously() {
        let root = build(NodeData::new("leaf"));
        let node = root.node();
        assert_eq!(node.state(), NodeState::Constructed);

        let fired = Rc::new(Cell::new(0));
        let f = Rc::clone(&fired);
        node.on_loaded(move || f.set(f.get() + 1));

        let fut = node.load();
        assert!(node.is_loaded());
        assert_eq!(node.state(), NodeState::Loaded);
        assert_eq!(fired.get(), 1);
        block_on(fut);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_children_complete_parent() {
        let data = NodeData::new("root")
            .with_child(NodeData::new("a"))
            .with_child(NodeData::new("b"));
        let root = build(data);
        let node = root.node();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        node.on_progress(move |p| s.borrow_mut().push(p));

        block_on(node.load());
        assert!(node.is_loaded());
        assert_eq!(*seen.borrow(), vec![0.5, 1.0]);
        assert_eq!(node.progress(), 1.0);
    }

    #[test]
    fn test_only_asset_components_hold_back_own_load() {
        let modelled = NodeData::new("car").with_component(MODEL_COMPONENT, serde_json::json!("sedan"));
        assert!(modelled.has_asset_component());
        let root = build(modelled);
        let _pending = root.node().load();
        assert!(!root.node().is_own_component_loaded());
        assert_eq!(root.node().state(), NodeState::Pending);

        let decorated = NodeData::new("sign")
            .with_component(PARTICLE_COMPONENT, serde_json::json!({ "rate": 4 }))
            .with_component("collider", serde_json::json!({ "radius": 1.0 }));
        assert!(!decorated.has_asset_component());
        let root = build(decorated);
        let _pending = root.node().load();
        assert!(root.node().is_own_component_loaded());
        assert_eq!(root.node().state(), NodeState::Loaded);
        assert_eq!(root.node().components().len(), 2);
    }

    #[test]
    fn test_second_load_is_ignored() {
        let root = build(NodeData::new("root").with_child(NodeData::new("a")));
        let node = root.node();

        let fired = Rc::new(Cell::new(0));
        let f = Rc::clone(&fired);
        node.on_loaded(move || f.set(f.get() + 1));

        block_on(node.load());
        block_on(node.load());
        assert_eq!(fired.get(), 1);
        assert_eq!(node.children_loaded(), 1);
    }

    #[test]
    fn test_extra_child_completion_saturates() {
        let root = build(NodeData::new("root").with_child(NodeData::new("a")));
        let node = root.node();
        block_on(node.load());

        node.on_child_loaded();
        assert_eq!(node.children_loaded(), 1);
    }

    #[test]
    fn test_tags_merged_on_load() {
        let root = build(NodeData::new("root").with_tag("bridge").with_tag("bridge"));
        let node = root.node();
        node.add_tag("structure");
        assert_eq!(node.tags(), vec!["structure".to_string()]);
        assert!(node.has_tag("bridge"));

        block_on(node.load());
        assert_eq!(node.tags(), vec!["structure".to_string(), "bridge".to_string()]);
    }

    #[test]
    fn test_find_descendant() {
        let data = NodeData::new("root")
            .with_child(NodeData::new("a").with_child(NodeData::new("deep").with_tag("t")))
            .with_child(NodeData::new("b").with_tag("t"));
        let root = build(data);
        let node = root.node();

        assert_eq!(node.find_descendant("deep").unwrap().node().name(), "deep");
        assert!(node.find_descendant("root").is_none());
        assert_eq!(node.descendants_with_tag("t").len(), 2);
        assert_eq!(node.subtree_len(), 4);
        assert!(root.is::<GenericNode>());
    }

    #[test]
    fn test_destroy_silences_events() {
        let root = build(NodeData::new("root").with_child(NodeData::new("a")));
        let node = root.node();

        let fired = Rc::new(Cell::new(false));
        let f = Rc::clone(&fired);
        node.on_loaded(move || f.set(true));

        node.destroy();
        assert!(node.is_destroyed());
        assert_eq!(node.child_count(), 0);

        block_on(node.load());
        assert!(!fired.get());
        assert_eq!(node.state(), NodeState::Constructed);
    }
}
