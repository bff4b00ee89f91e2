//! Name-keyed provider constructors.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::config::ProviderConfig;
use crate::error::{ProviderError, Result};
use crate::ollama::{OllamaProvider, PROVIDER_NAME as OLLAMA};
use crate::Provider;

/// Builds a provider from its configuration.
pub type ProviderConstructor =
    Arc<dyn Fn(ProviderConfig) -> Result<Box<dyn Provider>> + Send + Sync>;

/// Registry of provider constructors keyed by case-folded name.
///
/// All methods take `&self`; the map is guarded by a read-write lock.
pub struct ProviderRegistry {
    constructors: RwLock<HashMap<String, ProviderConstructor>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            constructors: RwLock::new(HashMap::new()),
        }
    }

    /// Create a registry with the built-in providers registered.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.insert(OLLAMA.to_string(), Arc::new(ollama_constructor));
        registry
    }

    /// Register a constructor under `name`.
    ///
    /// Fails if `name` is blank or already registered in any casing.
    pub fn register<F>(&self, name: &str, constructor: F) -> Result<()>
    where
        F: Fn(ProviderConfig) -> Result<Box<dyn Provider>> + Send + Sync + 'static,
    {
        let key = normalize(name);
        if key.is_empty() {
            return Err(ProviderError::config("Provider name cannot be empty"));
        }

        let mut constructors = self.constructors.write();
        if constructors.contains_key(&key) {
            return Err(ProviderError::config(format!(
                "Provider '{name}' is already registered. Use a different name or unregister first."
            )));
        }
        constructors.insert(key.clone(), Arc::new(constructor));
        info!(provider = %key, "registered provider");
        Ok(())
    }

    /// Remove the constructor registered under `name`.
    pub fn unregister(&self, name: &str) -> Result<()> {
        let key = normalize(name);
        match self.constructors.write().remove(&key) {
            Some(_) => {
                info!(provider = %key, "unregistered provider");
                Ok(())
            }
            None => Err(ProviderError::config(format!(
                "Provider '{name}' is not registered"
            ))),
        }
    }

    /// Instantiate the provider registered under `name`.
    pub fn create(&self, name: &str, config: ProviderConfig) -> Result<Box<dyn Provider>> {
        let key = normalize(name);
        let constructor = self.constructors.read().get(&key).cloned();

        let Some(constructor) = constructor else {
            let available = self.available();
            let available = if available.is_empty() {
                "none".to_string()
            } else {
                available.join(", ")
            };
            return Err(ProviderError::config(format!(
                "Provider '{name}' is not registered. Available providers: {available}"
            )));
        };

        debug!(provider = %key, model = config.model(), "creating provider");
        constructor(config)
    }

    /// Whether a constructor is registered under `name`.
    pub fn is_registered(&self, name: &str) -> bool {
        self.constructors.read().contains_key(&normalize(name))
    }

    /// Registered names, sorted.
    pub fn available(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn insert(&self, key: String, constructor: ProviderConstructor) {
        self.constructors.write().insert(key, constructor);
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.available())
            .finish()
    }
}

fn ollama_constructor(config: ProviderConfig) -> Result<Box<dyn Provider>> {
    Ok(Box::new(OllamaProvider::new(config)?))
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

static DEFAULT_REGISTRY: Lazy<ProviderRegistry> = Lazy::new(ProviderRegistry::with_builtins);

/// Process-wide registry with the built-in providers, created on first use.
pub fn default_registry() -> &'static ProviderRegistry {
    &DEFAULT_REGISTRY
}
