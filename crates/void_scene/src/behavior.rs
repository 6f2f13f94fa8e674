//! Behavior table for `script` components
//!
//! A script component names behaviors; each name is looked up in a
//! [`BehaviorTable`] and instantiated from its configuration. The table ships
//! with a few built-ins and collaborators register their own.
//!
//! Accepted script configurations:
//!
//! ```json
//! "spin"
//! { "name": "bob", "amplitude": 0.5 }
//! ["spin", { "name": "blink", "period": 0.25 }]
//! ```

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// A behavior attached to a node by its script component
pub trait Behavior: fmt::Debug {
    /// Registered behavior name
    fn name(&self) -> &str;

    /// Get as Any reference (for downcasting)
    fn as_any(&self) -> &dyn Any;
}

impl dyn Behavior {
    /// Downcast to a concrete behavior
    pub fn downcast_ref<T: Behavior + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }
}

/// Behavior factory: configuration in, behavior out
pub type BehaviorFactory = dyn Fn(&Value) -> Result<Box<dyn Behavior>, String>;

/// Registry of known behavior names
pub struct BehaviorTable {
    entries: BTreeMap<String, Box<BehaviorFactory>>,
}

impl BehaviorTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Create a table with the built-in behaviors registered
    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        table.register_config::<Spin>("spin");
        table.register_config::<Bob>("bob");
        table.register_config::<Blink>("blink");
        table
    }

    /// Register a behavior factory under a name
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&Value) -> Result<Box<dyn Behavior>, String> + 'static,
    {
        self.entries.insert(name.into(), Box::new(factory));
        self
    }

    /// Register a behavior deserialized straight from its configuration
    pub fn register_config<B>(&mut self, name: &str) -> &mut Self
    where
        B: Behavior + DeserializeOwned + 'static,
    {
        self.register(name, |config| {
            let config = match config {
                Value::Null => Value::Object(Default::default()),
                other => other.clone(),
            };
            serde_json::from_value::<B>(config)
                .map(|b| Box::new(b) as Box<dyn Behavior>)
                .map_err(|e| e.to_string())
        })
    }

    /// Instantiate a behavior; `None` if the name is unknown
    pub fn create(&self, name: &str, config: &Value) -> Option<Result<Box<dyn Behavior>, String>> {
        self.entries.get(name).map(|factory| factory(config))
    }

    /// Check if a name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    /// Number of registered behaviors
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for BehaviorTable {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for BehaviorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorTable")
            .field("behaviors", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// Built-in behaviors
// ============================================================================

/// Constant rotation
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Spin {
    /// Radians per second around each axis
    pub rate: [f32; 3],
}

impl Default for Spin {
    fn default() -> Self {
        Self { rate: [0.0, 1.0, 0.0] }
    }
}

impl Behavior for Spin {
    fn name(&self) -> &str {
        "spin"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Vertical oscillation
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Bob {
    pub amplitude: f32,
    /// Cycles per second
    pub frequency: f32,
}

impl Default for Bob {
    fn default() -> Self {
        Self {
            amplitude: 0.25,
            frequency: 1.0,
        }
    }
}

impl Behavior for Bob {
    fn name(&self) -> &str {
        "bob"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Visibility toggling
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Blink {
    /// Seconds per toggle
    pub period: f32,
}

impl Default for Blink {
    fn default() -> Self {
        Self { period: 0.5 }
    }
}

impl Behavior for Blink {
    fn name(&self) -> &str {
        "blink"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtins() {
        let table = BehaviorTable::with_builtins();
        assert_eq!(table.len(), 3);
        assert!(table.contains("spin"));
        assert!(table.contains("bob"));
        assert!(table.contains("blink"));
    }

    #[test]
    fn test_create_with_config() {
        let table = BehaviorTable::with_builtins();

        let behavior = table.create("bob", &json!({ "name": "bob", "amplitude": 2.0 })).unwrap().unwrap();
        let bob = behavior.downcast_ref::<Bob>().unwrap();
        assert_eq!(bob.amplitude, 2.0);
        assert_eq!(bob.frequency, 1.0);
    }

    #[test]
    fn test_create_without_config() {
        let table = BehaviorTable::with_builtins();

        let behavior = table.create("spin", &Value::Null).unwrap().unwrap();
        assert_eq!(behavior.downcast_ref::<Spin>(), Some(&Spin::default()));
    }

    #[test]
    fn test_unknown_and_invalid() {
        let table = BehaviorTable::with_builtins();

        assert!(table.create("fly", &Value::Null).is_none());
        assert!(table.create("blink", &json!({ "period": "fast" })).unwrap().is_err());
    }

    #[test]
    fn test_custom_registration() {
        #[derive(Debug)]
        struct Honk;

        impl Behavior for Honk {
            fn name(&self) -> &str {
                "honk"
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }

        let mut table = BehaviorTable::new();
        table.register("honk", |_| Ok(Box::new(Honk) as Box<dyn Behavior>));

        let behavior = table.create("honk", &Value::Null).unwrap().unwrap();
        assert_eq!(behavior.name(), "honk");
    }
}
