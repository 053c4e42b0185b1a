use crate::integration::support::{agent, next_notification, peer_link, registry_context};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use weave::bridge::{ModuleCatalog, ModuleLoader, SandboxContext};
use weave::error::ModuleLoadError;
use weave::language::{LinkLanguage, MemoryLinkLanguage};
use weave::link::LinkDiff;
use weave::notify::{BroadcastSink, Topic};
use weave::perspective::Neighbourhood;
use weave::registry::PerspectivesController;

fn sandbox(loader: Arc<dyn ModuleLoader>) -> SandboxContext {
    SandboxContext::new("lang-social", agent(), loader, Duration::from_secs(5))
}

#[tokio::test]
async fn missing_module_leaves_bridge_untouched() {
    let catalog = Arc::new(ModuleCatalog::new());
    catalog.register("modules/social.wasm", |_path: &str| {
        Ok(Arc::new(MemoryLinkLanguage::new("lang-social")) as Arc<dyn LinkLanguage>)
    });
    let bridge = sandbox(catalog);
    bridge.load_module("modules/social.wasm").await.unwrap();

    let err = bridge.load_module("modules/missing.wasm").await.unwrap_err();
    assert_eq!(
        err,
        ModuleLoadError::NotFound("modules/missing.wasm".to_string())
    );
    assert_eq!(bridge.loaded_modules(), vec!["modules/social.wasm"]);
    assert!(bridge.module("modules/missing.wasm").is_none());
}

struct HangingLoader;

#[async_trait]
impl ModuleLoader for HangingLoader {
    async fn load(&self, _path: &str) -> Result<Arc<dyn LinkLanguage>, ModuleLoadError> {
        futures::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn slow_module_times_out() {
    let bridge = SandboxContext::new(
        "lang-slow",
        agent(),
        Arc::new(HangingLoader),
        Duration::from_millis(250),
    );

    let err = bridge.load_module("modules/slow.wasm").await.unwrap_err();
    assert_eq!(
        err,
        ModuleLoadError::Timeout {
            path: "modules/slow.wasm".to_string(),
            timeout_ms: 250,
        }
    );
    assert!(bridge.loaded_modules().is_empty());
}

#[tokio::test]
async fn scoped_identity_differs_between_plugins() {
    let catalog: Arc<dyn ModuleLoader> = Arc::new(ModuleCatalog::new());
    let social = SandboxContext::new("lang-social", agent(), catalog.clone(), Duration::from_secs(1));
    let chat = SandboxContext::new("lang-chat", agent(), catalog, Duration::from_secs(1));

    assert_eq!(
        social.derive_signing_identity(),
        sandbox(Arc::new(ModuleCatalog::new())).derive_signing_identity()
    );
    assert_ne!(
        social.derive_signing_identity().verifying_key,
        chat.derive_signing_identity().verifying_key
    );
    assert_eq!(social.hash(b"weave"), chat.hash(b"weave"));
}

#[tokio::test]
async fn loaded_module_serves_a_perspective() {
    let language = Arc::new(MemoryLinkLanguage::new("lang-social"));
    let catalog = Arc::new(ModuleCatalog::new());
    let shared = language.clone();
    catalog.register("modules/social.wasm", move |_path: &str| {
        Ok(shared.clone() as Arc<dyn LinkLanguage>)
    });

    let dir = TempDir::new().unwrap();
    let sink = Arc::new(BroadcastSink::with_capacity(16));
    let registry = PerspectivesController::open(registry_context(&dir, sink.clone())).unwrap();

    let loaded = sandbox(catalog)
        .load_module("modules/social.wasm")
        .await
        .unwrap();
    registry.languages().install(loaded).unwrap();
    let handle = registry
        .add("social", None, Some(Neighbourhood::new("lang-social")))
        .unwrap();
    let mut rx = sink.subscribe();

    language
        .deliver_remote(LinkDiff::addition(peer_link("alice", "follows", "bob", 0)))
        .await
        .unwrap();

    let notification = next_notification(&mut rx).await.unwrap();
    assert_eq!(notification.topic(), Topic::LinkAdded(handle.uuid));
    assert_eq!(notification.perspective_uuid(), handle.uuid);
}
