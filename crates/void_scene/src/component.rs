//! Component resolution for loader nodes
//!
//! Only the model component suspends: it may have to wait for the asset
//! provider to fetch its model and material. Particle, script and unknown
//! components attach synchronously during `load()`.

use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::Value;
use void_asset::{AssetHandle, AssetKind};

use crate::behavior::Behavior;
use crate::data::{MODEL_COMPONENT, PARTICLE_COMPONENT, SCRIPT_COMPONENT};
use crate::error::{SceneError, SceneResult};
use crate::node::LoaderNode;

/// A model with its optional material, attached with a fixed render policy
#[derive(Clone, Debug, PartialEq)]
pub struct ModelComponent {
    pub model: AssetHandle,
    pub material: Option<AssetHandle>,
    pub cast_shadows: bool,
    pub receive_shadows: bool,
    /// Never moves after placement
    pub is_static: bool,
    /// Eligible for static batching
    pub batched: bool,
}

impl ModelComponent {
    /// Static, non-shadow-casting visual
    pub fn new(model: AssetHandle, material: Option<AssetHandle>) -> Self {
        Self {
            model,
            material,
            cast_shadows: false,
            receive_shadows: false,
            is_static: true,
            batched: true,
        }
    }
}

/// Particle configuration with its texture references resolved
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleComponent {
    /// Raw configuration as declared
    pub config: Value,
    /// Resolved texture handles by configuration key
    pub textures: BTreeMap<String, AssetHandle>,
}

/// Behaviors instantiated from a script component
#[derive(Debug, Default)]
pub struct ScriptComponent {
    pub behaviors: Vec<Box<dyn Behavior>>,
}

/// A component attached to a loader node
#[derive(Debug)]
pub enum Component {
    Model(ModelComponent),
    Particle(ParticleComponent),
    Script(ScriptComponent),
    /// Any other kind, attached with its configuration unmodified
    Passthrough { kind: String, config: Value },
}

impl Component {
    /// The component kind as declared in node data
    pub fn kind(&self) -> &str {
        match self {
            Self::Model(_) => MODEL_COMPONENT,
            Self::Particle(_) => PARTICLE_COMPONENT,
            Self::Script(_) => SCRIPT_COMPONENT,
            Self::Passthrough { kind, .. } => kind,
        }
    }
}

/// Whether a particle configuration key names a texture asset
pub fn is_asset_reference_key(key: &str) -> bool {
    key.to_lowercase().ends_with("texture")
}

// ============================================================================
// Model
// ============================================================================

/// Keys referenced by a model component
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ModelRef {
    pub model: String,
    pub material: Option<String>,
}

impl ModelRef {
    /// Accepts `"key"` or `{ "model": "key", "material": "key" }`
    pub(crate) fn parse(node: &str, config: &Value) -> SceneResult<Self> {
        let invalid = |reason: &str| SceneError::InvalidComponent {
            node: node.to_string(),
            kind: MODEL_COMPONENT.to_string(),
            reason: reason.to_string(),
        };

        match config {
            Value::String(key) => Ok(Self {
                model: key.clone(),
                material: None,
            }),
            Value::Object(map) => {
                let model = map
                    .get("model")
                    .and_then(Value::as_str)
                    .ok_or_else(|| invalid("missing string field 'model'"))?;
                let material = match map.get("material") {
                    None | Some(Value::Null) => None,
                    Some(Value::String(key)) => Some(key.clone()),
                    Some(_) => return Err(invalid("field 'material' must be a string")),
                };
                Ok(Self {
                    model: model.to_string(),
                    material,
                })
            }
            _ => Err(invalid("expected an asset key or an object")),
        }
    }
}

/// Resolve and attach a node's model component
///
/// On success the node's own component is marked loaded. On failure the
/// node stays pending and the error is returned for logging.
pub(crate) async fn resolve_model(node: Rc<LoaderNode>, config: Value) -> SceneResult<()> {
    let keys = ModelRef::parse(node.name(), &config)?;

    let model = resolve_asset(&node, &keys.model, AssetKind::Model).await?;
    let material = match &keys.material {
        Some(key) => Some(resolve_asset(&node, key, AssetKind::Material).await?),
        None => None,
    };

    node.attach_model(ModelComponent::new(model, material));
    Ok(())
}

/// Find a resident asset, fetching it first if it is only declared
async fn resolve_asset(node: &LoaderNode, key: &str, kind: AssetKind) -> SceneResult<AssetHandle> {
    let provider = Rc::clone(node.context().env().provider());
    let missing = || SceneError::MissingAsset {
        node: node.name().to_string(),
        key: key.to_string(),
        kind,
    };

    if let Some(handle) = provider.find(key) {
        return Ok(handle);
    }
    if !provider.has_declared(key, Some(kind)) {
        return Err(missing());
    }

    log::debug!("Node '{}' waiting on {} '{}'", node.name(), kind, key);
    provider
        .load(key, kind, node.context().caching())
        .await
        .map_err(|source| SceneError::Fetch {
            node: node.name().to_string(),
            key: key.to_string(),
            source,
        })?;

    provider.find(key).ok_or_else(missing)
}

// ============================================================================
// Particle
// ============================================================================

/// Resolve texture references of a particle configuration without suspending
pub(crate) fn resolve_particle(node: &LoaderNode, config: &Value) -> ParticleComponent {
    let provider = node.context().env().provider();
    let mut textures = BTreeMap::new();

    if let Value::Object(map) = config {
        for (field, value) in map {
            if !is_asset_reference_key(field) {
                continue;
            }
            let Some(key) = value.as_str() else { continue };
            match provider.find(key) {
                Some(handle) => {
                    textures.insert(field.clone(), handle);
                }
                None => log::warn!(
                    "Node '{}': particle texture '{}' ({}) is not resident",
                    node.name(),
                    key,
                    field
                ),
            }
        }
    }

    ParticleComponent {
        config: config.clone(),
        textures,
    }
}

// ============================================================================
// Script
// ============================================================================

/// Instantiate every behavior a script component names
///
/// Unknown names and invalid configurations are logged and skipped.
pub(crate) fn resolve_script(node: &LoaderNode, config: &Value) -> ScriptComponent {
    let entries: Vec<&Value> = match config {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    let table = node.context().env().behaviors();
    let mut behaviors = Vec::new();

    for entry in entries {
        let (name, params) = match entry {
            Value::String(name) => (name.as_str(), &Value::Null),
            Value::Object(map) => match map.get("name").and_then(Value::as_str) {
                Some(name) => (name, entry),
                None => {
                    log::warn!("Node '{}': script entry without a name: {}", node.name(), entry);
                    continue;
                }
            },
            _ => {
                log::warn!("Node '{}': unsupported script entry: {}", node.name(), entry);
                continue;
            }
        };

        match table.create(name, params) {
            Some(Ok(behavior)) => behaviors.push(behavior),
            Some(Err(e)) => log::warn!("Node '{}': invalid '{}' behavior: {}", node.name(), name, e),
            None => log::warn!("Node '{}': unknown behavior '{}'", node.name(), name),
        }
    }

    ScriptComponent { behaviors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_model_ref_string() {
        let keys = ModelRef::parse("car", &json!("sedan")).unwrap();
        assert_eq!(keys.model, "sedan");
        assert_eq!(keys.material, None);
    }

    #[test]
    fn test_model_ref_object() {
        let keys = ModelRef::parse("car", &json!({ "model": "sedan", "material": "red" })).unwrap();
        assert_eq!(keys.model, "sedan");
        assert_eq!(keys.material.as_deref(), Some("red"));
    }

    #[test]
    fn test_model_ref_invalid() {
        assert!(ModelRef::parse("car", &json!(3)).is_err());
        assert!(ModelRef::parse("car", &json!({ "material": "red" })).is_err());
        assert!(ModelRef::parse("car", &json!({ "model": "sedan", "material": 1 })).is_err());
    }

    #[test]
    fn test_asset_reference_keys() {
        assert!(is_asset_reference_key("texture"));
        assert!(is_asset_reference_key("smokeTexture"));
        assert!(is_asset_reference_key("spark_texture"));
        assert!(!is_asset_reference_key("rate"));
        assert!(!is_asset_reference_key("textureScale"));
    }
}
