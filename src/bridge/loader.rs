//! Module loading for sandboxed link languages.

use crate::error::ModuleLoadError;
use crate::language::LinkLanguage;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Resolves a module path to a ready link language.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn load(&self, path: &str) -> Result<Arc<dyn LinkLanguage>, ModuleLoadError>;
}

/// Builds a language instance for a module path.
pub type ModuleFactory =
    Arc<dyn Fn(&str) -> Result<Arc<dyn LinkLanguage>, ModuleLoadError> + Send + Sync>;

/// In-process loader mapping module paths to factories.
#[derive(Default)]
pub struct ModuleCatalog {
    factories: RwLock<HashMap<String, ModuleFactory>>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&self, path: impl Into<String>, factory: F)
    where
        F: Fn(&str) -> Result<Arc<dyn LinkLanguage>, ModuleLoadError> + Send + Sync + 'static,
    {
        self.factories.write().insert(path.into(), Arc::new(factory));
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<_> = self.factories.read().keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl ModuleLoader for ModuleCatalog {
    async fn load(&self, path: &str) -> Result<Arc<dyn LinkLanguage>, ModuleLoadError> {
        let factory = self
            .factories
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| ModuleLoadError::NotFound(path.to_string()))?;
        factory(path)
    }
}
