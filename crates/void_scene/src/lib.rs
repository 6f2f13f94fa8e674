//! # void_scene - Declarative Scene-Graph Loader
//!
//! Builds a tree of loader nodes from a JSON document and reports when the
//! whole tree is ready:
//! - Node types chosen per node by exact name or tag ([`TypeRegistry`])
//! - Per-node component resolution against an injected [`AssetProvider`]
//! - Bottom-up completion with `loaded` and `progress` notifications
//!
//! ## Example
//!
//! ```ignore
//! use void_scene::prelude::*;
//!
//! let mut pool = LocalPool::new();
//! let server = Rc::new(AssetServer::default_config());
//! let env = SceneEnv::new(server.clone()).with_spawner(pool.spawner());
//!
//! let tree = SceneTree::from_json(text, false, Rc::new(TypeRegistry::new()), env, TreeOptions::default())?;
//! tree.on_loaded(|| log::info!("scene ready"));
//! tree.spawn_load();
//!
//! // Each frame
//! server.process_from_disk();
//! pool.run_until_stalled();
//! ```
//!
//! [`AssetProvider`]: void_asset::AssetProvider

pub mod behavior;
pub mod component;
pub mod config;
pub mod data;
pub mod env;
pub mod error;
pub mod node;
pub mod registry;
pub mod signal;
pub mod transform;
pub mod tree;

pub use behavior::{Behavior, BehaviorTable, Blink, Bob, Spin};
pub use component::{Component, ModelComponent, ParticleComponent, ScriptComponent};
pub use config::{ConfigError, SceneConfig};
pub use data::{NodeData, MODEL_COMPONENT, PARTICLE_COMPONENT, SCRIPT_COMPONENT};
pub use env::{SceneEnv, TreeContext};
pub use error::{SceneError, SceneResult};
pub use node::{GenericNode, Loadable, LoaderNode, NodeState, SceneNode};
pub use registry::{Dispatch, NodeFactory, NodeInit, TypeRegistry};
pub use signal::{Signal, SubscriberId};
pub use transform::Transform;
pub use tree::{SceneTree, TreeOptions};

/// Prelude - commonly used types
pub mod prelude {
    pub use crate::data::NodeData;
    pub use crate::env::SceneEnv;
    pub use crate::error::{SceneError, SceneResult};
    pub use crate::node::{GenericNode, Loadable, LoaderNode, NodeState, SceneNode};
    pub use crate::registry::{NodeInit, TypeRegistry};
    pub use crate::tree::{SceneTree, TreeOptions};
    pub use void_asset::prelude::*;
}
