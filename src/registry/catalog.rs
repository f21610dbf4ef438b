use std::collections::BTreeMap;
use std::sync::Arc;

/// Builds a fresh plugin instance.
pub type Factory<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// The identifiers a plugin list may name, each with its factory.
///
/// Populated once at startup; plugin lists resolve their entries against it.
pub struct PluginCatalog<T> {
    factories: BTreeMap<String, Factory<T>>,
}

impl<T> PluginCatalog<T> {
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Register `factory` under `identifier`, replacing any previous one.
    pub fn register<F>(&mut self, identifier: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.factories.insert(identifier.into(), Arc::new(factory));
        self
    }

    pub fn factory(&self, identifier: &str) -> Option<Factory<T>> {
        self.factories.get(identifier).cloned()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.factories.contains_key(identifier)
    }

    /// A new instance of `identifier`.
    pub fn create(&self, identifier: &str) -> Option<T> {
        self.factories.get(identifier).map(|factory| factory())
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl<T> Default for PluginCatalog<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for PluginCatalog<T> {
    fn clone(&self) -> Self {
        Self {
            factories: self.factories.clone(),
        }
    }
}

impl<T> std::fmt::Debug for PluginCatalog<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}
