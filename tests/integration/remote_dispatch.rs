use crate::integration::support::{next_notification, peer_link, registry_context};
use std::sync::Arc;
use tempfile::TempDir;
use weave::error::{ApiError, PropagationError};
use weave::language::MemoryLinkLanguage;
use weave::link::{Link, LinkDiff, LinkQuery, RemoteDiff};
use weave::notify::{BroadcastSink, Notification, Topic};
use weave::perspective::{Neighbourhood, SyncState};
use weave::registry::{DispatchOutcome, PerspectivesController};

struct Fixture {
    _dir: TempDir,
    sink: Arc<BroadcastSink>,
    registry: PerspectivesController,
    language: Arc<MemoryLinkLanguage>,
}

/// Open a registry with one in-memory language installed at `address`.
fn fixture(address: &str) -> Fixture {
    let dir = TempDir::new().unwrap();
    let sink = Arc::new(BroadcastSink::with_capacity(64));
    let registry = PerspectivesController::open(registry_context(&dir, sink.clone())).unwrap();
    let language = Arc::new(MemoryLinkLanguage::new(address));
    registry.languages().install(language.clone()).unwrap();
    Fixture {
        _dir: dir,
        sink,
        registry,
        language,
    }
}

#[tokio::test]
async fn remote_addition_reaches_bound_perspective_once() {
    let f = fixture("lang-n");
    let handle = f.registry.add("notes", None, None).unwrap();
    f.registry
        .replace(handle.clone(), Neighbourhood::new("lang-n"))
        .unwrap();
    let mut rx = f.sink.subscribe();

    let link = peer_link("a", "p", "b", 0);
    f.language
        .deliver_remote(LinkDiff::addition(link.clone()))
        .await
        .unwrap();

    match next_notification(&mut rx).await {
        Some(Notification::LinkAdded {
            perspective,
            link: added,
        }) => {
            assert_eq!(perspective.uuid, handle.uuid);
            assert_eq!(added, link);
        }
        other => panic!("expected link-added, got {other:?}"),
    }

    let found = f
        .registry
        .instance(handle.uuid)
        .unwrap()
        .get_links(&LinkQuery::new().source("a"));
    assert_eq!(found, vec![link.clone()]);

    // Replaying the same diff changes nothing and stays silent.
    f.language
        .deliver_remote(LinkDiff::addition(link))
        .await
        .unwrap();
    let marker = peer_link("marker", "p", "m", 1);
    f.language
        .deliver_remote(LinkDiff::addition(marker.clone()))
        .await
        .unwrap();
    match next_notification(&mut rx).await {
        Some(Notification::LinkAdded { link, .. }) => assert_eq!(link, marker),
        other => panic!("expected marker link-added, got {other:?}"),
    }
}

#[tokio::test]
async fn misrouted_diff_changes_nothing() {
    let f = fixture("lang-n");
    let bound = f
        .registry
        .add("bound", None, Some(Neighbourhood::new("lang-n")))
        .unwrap();
    let private = f.registry.add("private", None, None).unwrap();
    let mut rx = f.sink.subscribe();

    let outcome = f.registry.dispatch(RemoteDiff::new(
        "lang-unknown",
        LinkDiff::addition(peer_link("a", "p", "b", 0)),
    ));

    assert_eq!(
        outcome,
        DispatchOutcome::Misrouted {
            language: "lang-unknown".to_string()
        }
    );
    assert!(f.registry.snapshot(bound.uuid).unwrap().is_empty());
    assert!(f.registry.snapshot(private.uuid).unwrap().is_empty());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn remote_removal_publishes_link_removed() {
    let f = fixture("lang-n");
    let handle = f
        .registry
        .add("notes", None, Some(Neighbourhood::new("lang-n")))
        .unwrap();
    let mut rx = f.sink.subscribe();
    let link = peer_link("a", "p", "b", 0);

    f.language
        .deliver_remote(LinkDiff::addition(link.clone()))
        .await
        .unwrap();
    f.language
        .deliver_remote(LinkDiff::removal(link.clone()))
        .await
        .unwrap();

    let first = next_notification(&mut rx).await.unwrap();
    let second = next_notification(&mut rx).await.unwrap();
    assert_eq!(first.topic(), Topic::LinkAdded(handle.uuid));
    assert_eq!(second.topic(), Topic::LinkRemoved(handle.uuid));
    assert_eq!(second.perspective_uuid(), handle.uuid);
    assert!(f.registry.snapshot(handle.uuid).unwrap().is_empty());
}

#[tokio::test]
async fn local_change_notifies_once_and_echo_is_silent() {
    let f = fixture("lang-n");
    let handle = f
        .registry
        .add("notes", None, Some(Neighbourhood::new("lang-n")))
        .unwrap();
    let mut rx = f.sink.subscribe();

    let instance = f.registry.instance(handle.uuid).unwrap();
    let local = instance.add_link(Link::new("me", "you")).await.unwrap();
    assert_eq!(f.language.submitted(), vec![LinkDiff::addition(local.clone())]);

    match next_notification(&mut rx).await {
        Some(Notification::LinkAdded { perspective, link }) => {
            assert_eq!(perspective.uuid, handle.uuid);
            assert_eq!(link, local);
        }
        other => panic!("expected local link-added, got {other:?}"),
    }

    // The echo is queued ahead of the marker, so the marker must come next.
    let marker = peer_link("marker", "p", "m", 1);
    f.language
        .deliver_remote(LinkDiff::addition(marker.clone()))
        .await
        .unwrap();
    match next_notification(&mut rx).await {
        Some(Notification::LinkAdded { link, .. }) => assert_eq!(link, marker),
        other => panic!("expected marker link-added, got {other:?}"),
    }
    assert_eq!(instance.link_count(), 2);
}

#[tokio::test]
async fn private_local_changes_notify() {
    let f = fixture("lang-n");
    let handle = f.registry.add("private", None, None).unwrap();
    let mut rx = f.sink.subscribe();

    let instance = f.registry.instance(handle.uuid).unwrap();
    let link = instance.add_link(Link::new("a", "b")).await.unwrap();
    instance.remove_local(link).await.unwrap();

    let topics: Vec<Topic> = std::iter::from_fn(|| rx.try_recv().ok())
        .map(|n| n.topic())
        .collect();
    assert_eq!(
        topics,
        vec![Topic::LinkAdded(handle.uuid), Topic::LinkRemoved(handle.uuid)]
    );
}

#[tokio::test]
async fn sync_backfills_existing_shared_links() {
    let f = fixture("lang-n");
    f.language
        .seed(vec![peer_link("a", "p", "b", 0), peer_link("a", "p", "c", 1)]);
    let handle = f
        .registry
        .add("notes", None, Some(Neighbourhood::new("lang-n")))
        .unwrap();
    let instance = f.registry.instance(handle.uuid).unwrap();
    assert_eq!(instance.sync_state(), SyncState::AwaitingBackfill);
    let mut rx = f.sink.subscribe();

    assert_eq!(f.registry.sync(handle.uuid).await.unwrap(), 2);
    assert_eq!(instance.sync_state(), SyncState::Synced);
    for _ in 0..2 {
        assert_eq!(rx.try_recv().unwrap().topic(), Topic::LinkAdded(handle.uuid));
    }

    assert_eq!(f.registry.sync(handle.uuid).await.unwrap(), 0);
    assert!(rx.try_recv().is_err());

    let results = f.registry.sync_all().await;
    assert_eq!(results.len(), 1);
    assert!(matches!(results[0], (uuid, Ok(0)) if uuid == handle.uuid));
}

#[tokio::test]
async fn propagation_failure_keeps_local_change() {
    let f = fixture("lang-n");
    let handle = f
        .registry
        .add("notes", None, Some(Neighbourhood::new("lang-n")))
        .unwrap();
    f.language.set_unavailable(Some("offline".to_string()));

    let instance = f.registry.instance(handle.uuid).unwrap();
    let err = instance.add_link(Link::new("a", "b")).await.unwrap_err();
    assert!(matches!(
        err,
        ApiError::Propagation(PropagationError::Unavailable { .. })
    ));
    assert_eq!(instance.link_count(), 1);
    assert!(f.language.submitted().is_empty());
}

#[tokio::test]
async fn bound_perspective_without_language_reports_not_loaded() {
    let f = fixture("lang-n");
    let handle = f
        .registry
        .add("orphan", None, Some(Neighbourhood::new("lang-missing")))
        .unwrap();
    let instance = f.registry.instance(handle.uuid).unwrap();

    let err = instance.add_link(Link::new("a", "b")).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        ApiError::Propagation(PropagationError::LanguageNotLoaded("lang-missing".into()))
            .to_string()
    );
    assert!(f.registry.sync(handle.uuid).await.is_err());
}
