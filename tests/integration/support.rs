use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::broadcast;
use weave::error::StorageError;
use weave::identity::Ed25519Agent;
use weave::language::LanguageController;
use weave::link::{Link, LinkExpression};
use weave::notify::{BroadcastSink, Notification};
use weave::registry::{HandleSet, JsonFileRepository, PerspectiveRepository, RegistryContext};

pub const STORE_FILE: &str = "perspectives.json";

pub fn agent() -> Arc<Ed25519Agent> {
    Arc::new(Ed25519Agent::from_seed([42u8; 32]))
}

/// Registry collaborators over a JSON store inside `dir`.
pub fn registry_context(dir: &TempDir, sink: Arc<BroadcastSink>) -> RegistryContext {
    RegistryContext {
        repository: Arc::new(JsonFileRepository::new(dir.path().join(STORE_FILE))),
        languages: Arc::new(LanguageController::new(64)),
        identity: agent(),
        sink,
    }
}

pub fn at(offset_secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(offset_secs)
}

pub fn peer_link(source: &str, predicate: &str, target: &str, offset_secs: i64) -> LinkExpression {
    LinkExpression::new(
        "did:key:peer",
        at(offset_secs),
        Link::new(source, target).with_predicate(predicate),
    )
}

/// Next notification, or `None` if nothing arrives within a second.
pub async fn next_notification(rx: &mut broadcast::Receiver<Notification>) -> Option<Notification> {
    tokio::time::timeout(std::time::Duration::from_secs(1), rx.recv())
        .await
        .ok()
        .and_then(Result::ok)
}

/// Repository whose writes always fail.
pub struct FailingRepository;

impl PerspectiveRepository for FailingRepository {
    fn load(&self) -> Result<HandleSet, StorageError> {
        Ok(HandleSet::new())
    }

    fn save(&self, _handles: &HandleSet) -> Result<(), StorageError> {
        Err(StorageError::InvalidPath("read-only store".to_string()))
    }

    fn location(&self) -> String {
        "failing://".to_string()
    }
}
