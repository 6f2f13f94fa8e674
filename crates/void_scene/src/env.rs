//! Scene environment - the collaborators injected into a tree
//!
//! Every node of a tree shares one [`TreeContext`], which carries the
//! environment, the type registry and the caching hint down to the leaves.

use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::task::{LocalSpawn, LocalSpawnExt};
use void_asset::AssetProvider;

use crate::behavior::BehaviorTable;
use crate::error::{SceneError, SceneResult};
use crate::registry::TypeRegistry;

/// External collaborators used while loading
#[derive(Clone)]
pub struct SceneEnv {
    provider: Rc<dyn AssetProvider>,
    behaviors: Rc<BehaviorTable>,
    spawner: Option<Rc<dyn LocalSpawn>>,
}

impl SceneEnv {
    /// Create an environment around an asset provider
    ///
    /// Uses the built-in behavior table and no spawner.
    pub fn new(provider: Rc<dyn AssetProvider>) -> Self {
        Self {
            provider,
            behaviors: Rc::new(BehaviorTable::with_builtins()),
            spawner: None,
        }
    }

    /// Set the spawner used for auto-loading trees
    pub fn with_spawner(mut self, spawner: impl LocalSpawn + 'static) -> Self {
        self.spawner = Some(Rc::new(spawner));
        self
    }

    /// Replace the behavior table
    pub fn with_behaviors(mut self, behaviors: BehaviorTable) -> Self {
        self.behaviors = Rc::new(behaviors);
        self
    }

    /// The asset provider
    pub fn provider(&self) -> &Rc<dyn AssetProvider> {
        &self.provider
    }

    /// The behavior table
    pub fn behaviors(&self) -> &BehaviorTable {
        &self.behaviors
    }

    /// Check if a spawner is configured
    pub fn can_spawn(&self) -> bool {
        self.spawner.is_some()
    }

    /// Spawn a local future on the configured spawner
    pub fn spawn<F>(&self, future: F) -> SceneResult<()>
    where
        F: Future<Output = ()> + 'static,
    {
        let spawner = self
            .spawner
            .as_ref()
            .ok_or_else(|| SceneError::Spawn("no local spawner configured".to_string()))?;
        spawner
            .spawn_local(future)
            .map_err(|e| SceneError::Spawn(e.to_string()))
    }
}

impl fmt::Debug for SceneEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneEnv")
            .field("behaviors", &self.behaviors)
            .field("spawner", &self.spawner.is_some())
            .finish()
    }
}

/// State shared by every node of one tree
pub struct TreeContext {
    pub(crate) registry: Rc<TypeRegistry>,
    pub(crate) env: SceneEnv,
    pub(crate) caching: bool,
}

impl TreeContext {
    pub(crate) fn new(registry: Rc<TypeRegistry>, env: SceneEnv, caching: bool) -> Rc<Self> {
        Rc::new(Self {
            registry,
            env,
            caching,
        })
    }

    /// The tree's environment
    pub fn env(&self) -> &SceneEnv {
        &self.env
    }

    /// The tree's type registry
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Retention hint forwarded to the asset provider
    pub fn caching(&self) -> bool {
        self.caching
    }
}

impl fmt::Debug for TreeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeContext")
            .field("registry", &self.registry)
            .field("env", &self.env)
            .field("caching", &self.caching)
            .finish()
    }
}
