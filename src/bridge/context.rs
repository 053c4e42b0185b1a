//! Per-plugin sandbox context.

use super::loader::ModuleLoader;
use crate::error::ModuleLoadError;
use crate::identity::{AgentIdentity, ScopedSigner, SigningDna};
use crate::language::LinkLanguage;
use crate::types::ContentAddress;
use futures::FutureExt;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Blake3 content address of `bytes`, hex encoded.
pub fn content_address(bytes: &[u8]) -> ContentAddress {
    blake3::hash(bytes).to_hex().to_string()
}

/// The only host surface a sandboxed plugin gets.
///
/// Holds the agent identity, a loader and the modules it has loaded. It
/// has no route to the registry, other perspectives or persistence.
pub struct SandboxContext {
    scope: String,
    identity: Arc<dyn AgentIdentity>,
    loader: Arc<dyn ModuleLoader>,
    load_timeout: Duration,
    modules: RwLock<HashMap<String, Arc<dyn LinkLanguage>>>,
}

impl SandboxContext {
    pub fn new(
        scope: impl Into<String>,
        identity: Arc<dyn AgentIdentity>,
        loader: Arc<dyn ModuleLoader>,
        load_timeout: Duration,
    ) -> Self {
        Self {
            scope: scope.into(),
            identity,
            loader,
            load_timeout,
            modules: RwLock::new(HashMap::new()),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Public half of this plugin's scoped signing identity.
    pub fn derive_signing_identity(&self) -> SigningDna {
        self.scoped_signer().dna().clone()
    }

    /// Signer for this plugin's scope. Same scope, same key.
    pub fn scoped_signer(&self) -> ScopedSigner {
        self.identity.derive_scoped_signer(&self.scope)
    }

    pub fn hash(&self, bytes: &[u8]) -> ContentAddress {
        content_address(bytes)
    }

    /// Load a module, bounded by the configured timeout.
    ///
    /// Loader panics surface as `Init`. Only a successful load is recorded.
    pub async fn load_module(&self, path: &str) -> Result<Arc<dyn LinkLanguage>, ModuleLoadError> {
        debug!(scope = %self.scope, path, "Loading module");
        let load = AssertUnwindSafe(self.loader.load(path)).catch_unwind();

        let outcome = match tokio::time::timeout(self.load_timeout, load).await {
            Err(_) => Err(ModuleLoadError::Timeout {
                path: path.to_string(),
                timeout_ms: self.load_timeout.as_millis() as u64,
            }),
            Ok(Err(panic)) => Err(ModuleLoadError::Init {
                path: path.to_string(),
                message: panic_message(panic.as_ref()),
            }),
            Ok(Ok(result)) => result,
        };

        match outcome {
            Ok(language) => {
                self.modules
                    .write()
                    .insert(path.to_string(), Arc::clone(&language));
                info!(
                    scope = %self.scope,
                    path,
                    language = %language.address(),
                    "Loaded module"
                );
                Ok(language)
            }
            Err(err) => {
                warn!(scope = %self.scope, path, kind = err.kind(), error = %err, "Module load failed");
                Err(err)
            }
        }
    }

    pub fn module(&self, path: &str) -> Option<Arc<dyn LinkLanguage>> {
        self.modules.read().get(path).cloned()
    }

    /// Paths of successfully loaded modules, sorted.
    pub fn loaded_modules(&self) -> Vec<String> {
        let mut paths: Vec<_> = self.modules.read().keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn unload(&self, path: &str) -> bool {
        self.modules.write().remove(path).is_some()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "module panicked during load".to_string()
    }
}
