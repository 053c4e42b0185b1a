use crate::integration::support::{agent, registry_context, FailingRepository, STORE_FILE};
use proptest::prelude::*;
use std::sync::Arc;
use tempfile::TempDir;
use weave::error::ApiError;
use weave::language::LanguageController;
use weave::notify::BroadcastSink;
use weave::perspective::{Neighbourhood, PerspectiveHandle};
use weave::registry::{PerspectivesController, RegistryContext};

fn open(dir: &TempDir) -> PerspectivesController {
    PerspectivesController::load(registry_context(dir, Arc::new(BroadcastSink::new()))).unwrap()
}

#[test]
fn new_perspective_is_empty_and_persisted() {
    let dir = TempDir::new().unwrap();
    let registry = open(&dir);

    let handle = registry.add("notes", None, None).unwrap();
    assert_eq!(handle.name, "notes");
    assert_eq!(handle.shared_url, None);
    assert_eq!(handle.neighbourhood, None);
    assert!(registry.snapshot(handle.uuid).unwrap().is_empty());

    let raw = std::fs::read_to_string(dir.path().join(STORE_FILE)).unwrap();
    let stored: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let entry = &stored[handle.uuid.to_string()];
    assert_eq!(entry["name"], "notes");
    assert!(entry["sharedUrl"].is_null());
}

#[test]
fn removing_twice_is_harmless() {
    let dir = TempDir::new().unwrap();
    let registry = open(&dir);
    let keep = registry.add("keep", None, None).unwrap();
    let gone = registry.add("gone", None, None).unwrap();

    registry.remove(gone.uuid).unwrap();
    assert_eq!(registry.all_handles(), vec![keep.clone()]);
    registry.remove(gone.uuid).unwrap();
    assert_eq!(registry.all_handles(), vec![keep]);
}

#[test]
fn neighbourhood_binding_survives_restart() {
    let dir = TempDir::new().unwrap();
    let uuid = {
        let registry = open(&dir);
        let handle = registry.add("shared", Some("weave://n1".into()), None).unwrap();
        let neighbourhood =
            Neighbourhood::new("lang-n1").with_metadata(serde_json::json!({ "topic": "birds" }));
        registry.replace(handle.clone(), neighbourhood).unwrap();
        handle.uuid
    };

    let reopened = open(&dir);
    let handle = reopened.handle(uuid).unwrap();
    assert_eq!(handle.language_address(), Some("lang-n1"));
    assert_eq!(handle.shared_url.as_deref(), Some("weave://n1"));
    let instance = reopened.instance(uuid).unwrap();
    assert!(instance.is_shared());
}

#[test]
fn failed_write_leaves_registry_untouched() {
    let sink = Arc::new(BroadcastSink::new());
    let mut rx = sink.subscribe();
    let registry = PerspectivesController::load(RegistryContext {
        repository: Arc::new(FailingRepository),
        languages: Arc::new(LanguageController::new(4)),
        identity: agent(),
        sink,
    })
    .unwrap();

    assert!(matches!(
        registry.add("notes", None, None),
        Err(ApiError::Persistence(_))
    ));
    assert!(registry.all_handles().is_empty());
    assert!(rx.try_recv().is_err());
}

#[test]
fn failed_write_keeps_previous_file() {
    let dir = TempDir::new().unwrap();
    let registry = open(&dir);
    let handle = registry.add("notes", None, None).unwrap();
    let before = std::fs::read_to_string(dir.path().join(STORE_FILE)).unwrap();

    // A directory squatting on the temp name makes the next write fail.
    std::fs::create_dir(dir.path().join(format!("{}.tmp", STORE_FILE))).unwrap();
    assert!(registry.update(handle.uuid, "journal").is_err());

    assert_eq!(registry.handle(handle.uuid).unwrap().name, "notes");
    let after = std::fs::read_to_string(dir.path().join(STORE_FILE)).unwrap();
    assert_eq!(before, after);
}

#[derive(Debug, Clone)]
enum Op {
    Add(String),
    Rename(usize, String),
    Remove(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        "[a-z]{1,8}".prop_map(Op::Add),
        (any::<usize>(), "[a-z]{1,8}").prop_map(|(i, name)| Op::Rename(i, name)),
        any::<usize>().prop_map(Op::Remove),
    ]
}

fn pick(handles: &[PerspectiveHandle], index: usize) -> Option<&PerspectiveHandle> {
    if handles.is_empty() {
        None
    } else {
        handles.get(index % handles.len())
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]

    #[test]
    fn reload_reproduces_handle_set(ops in prop::collection::vec(op_strategy(), 1..24)) {
        let dir = TempDir::new().unwrap();
        let registry = open(&dir);

        for op in ops {
            let handles = registry.all_handles();
            match op {
                Op::Add(name) => {
                    registry.add(name, None, None).unwrap();
                }
                Op::Rename(index, name) => {
                    if let Some(handle) = pick(&handles, index) {
                        registry.update(handle.uuid, name).unwrap();
                    }
                }
                Op::Remove(index) => {
                    if let Some(handle) = pick(&handles, index) {
                        registry.remove(handle.uuid).unwrap();
                    }
                }
            }
        }

        let reopened = open(&dir);
        prop_assert_eq!(reopened.all_handles(), registry.all_handles());
    }
}
