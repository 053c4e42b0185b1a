use crate::integration::support::{agent, at, peer_link};
use proptest::prelude::*;
use std::sync::Arc;
use uuid::Uuid;
use weave::identity::{verify_proof, AgentIdentity};
use weave::language::LanguageController;
use weave::link::{Link, LinkDiff, LinkExpression, LinkQuery};
use weave::perspective::{LinkStore, Neighbourhood, Perspective, PerspectiveHandle};

fn bound_perspective(address: &str) -> Perspective {
    let neighbourhood = Neighbourhood::new(address);
    let mut handle = PerspectiveHandle::new(Uuid::new_v4(), "shared");
    handle.neighbourhood = Some(neighbourhood.clone());
    Perspective::new(
        handle,
        Some(neighbourhood),
        Arc::new(LanguageController::new(8)),
        agent(),
    )
}

#[tokio::test]
async fn remote_readd_after_local_removal_wins() {
    let perspective = bound_perspective("lang-offline");
    let link = peer_link("a", "p", "b", 0);
    perspective.apply_remote_diff(&LinkDiff::addition(link.clone()));

    // No language is installed, so propagation fails but the removal stands.
    assert!(perspective.remove_local(link.clone()).await.is_err());
    assert_eq!(perspective.link_count(), 0);

    let applied = perspective.apply_remote_diff(&LinkDiff::addition(link.clone()));
    assert_eq!(applied.added, vec![link.clone()]);
    assert_eq!(perspective.get_links(&LinkQuery::default()), vec![link]);
}

#[test]
fn private_perspective_ignores_remote_diffs() {
    let perspective = Perspective::new(
        PerspectiveHandle::new(Uuid::new_v4(), "private"),
        None,
        Arc::new(LanguageController::new(8)),
        agent(),
    );
    let applied = perspective.apply_remote_diff(&LinkDiff::addition(peer_link("a", "p", "b", 0)));
    assert!(applied.is_empty());
    assert_eq!(perspective.link_count(), 0);
}

#[test]
fn empty_query_returns_links_in_timestamp_order() {
    let perspective = bound_perspective("lang-n");
    let late = peer_link("a", "p", "late", 30);
    let early = peer_link("a", "p", "early", 10);
    let middle = peer_link("b", "q", "middle", 20);
    perspective.apply_remote_diff(&LinkDiff::new(
        vec![late.clone(), early.clone(), middle.clone()],
        Vec::new(),
    ));

    assert_eq!(
        perspective.get_links(&LinkQuery::new()),
        vec![early.clone(), middle.clone(), late.clone()]
    );
    assert_eq!(
        perspective.get_links(&LinkQuery::new().source("a").limit(1)),
        vec![early]
    );
    assert_eq!(
        perspective.get_links(&LinkQuery::new().from_date(at(15)).until_date(at(25))),
        vec![middle]
    );
}

#[tokio::test]
async fn local_links_are_signed_by_the_agent() {
    let perspective = Perspective::new(
        PerspectiveHandle::new(Uuid::new_v4(), "private"),
        None,
        Arc::new(LanguageController::new(8)),
        agent(),
    );
    let expression = perspective
        .add_link(Link::new("a", "b").with_predicate("knows"))
        .await
        .unwrap();
    assert_eq!(expression.author, agent().did());
    assert!(verify_proof(&expression));

    let replacement = perspective
        .update_link(&expression, Link::new("a", "c"))
        .await
        .unwrap();
    let links = perspective.get_links(&LinkQuery::default());
    assert_eq!(links, vec![replacement]);
}

fn link_strategy() -> impl Strategy<Value = LinkExpression> {
    ("[a-c]", "[p-q]", "[x-z]", 0i64..5).prop_map(|(source, predicate, target, offset)| {
        peer_link(&source, &predicate, &target, offset)
    })
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn applying_a_diff_twice_is_a_no_op(
        existing in prop::collection::vec(link_strategy(), 0..8),
        additions in prop::collection::vec(link_strategy(), 0..8),
        removals in prop::collection::vec(link_strategy(), 0..8),
    ) {
        let mut store = LinkStore::new();
        store.apply(&LinkDiff::new(existing, Vec::new()));

        let diff = LinkDiff::new(additions, removals);
        store.apply(&diff);
        let after_first = store.all();

        let second = store.apply(&diff);
        prop_assert_eq!(store.all(), after_first);

        // A link both added and removed by the diff bounces in and out again.
        let mut added: Vec<_> = second.added.iter().map(LinkExpression::key).collect();
        let mut removed: Vec<_> = second.removed.iter().map(LinkExpression::key).collect();
        added.sort();
        removed.sort();
        prop_assert_eq!(added, removed);
    }
}
