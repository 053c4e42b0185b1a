//! Runtime perspective: a handle, its link store, and an optional binding to
//! a link language.

use super::handle::{Neighbourhood, PerspectiveHandle};
use super::store::{AppliedDiff, LinkStore};
use crate::error::{ApiError, PropagationError};
use crate::identity::AgentIdentity;
use crate::language::LanguageController;
use crate::link::{Link, LinkDiff, LinkExpression, LinkQuery};
use crate::notify::{Notification, NotificationSink};
use crate::types::PerspectiveId;
use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where a perspective stands with respect to its neighbourhood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// No neighbourhood; never touches the network.
    Private,
    /// Bound, but the language's current state has not been pulled yet.
    AwaitingBackfill,
    /// Bound and backfilled at least once.
    Synced,
}

/// A perspective as used at runtime.
///
/// Local mutations are applied to the store first and then submitted to
/// the bound language. A propagation failure is returned to the caller but
/// the local change stays. Locks are never held across an await.
///
/// With a sink attached, every local change that takes effect is published
/// as `link-added`/`link-removed` before it is submitted.
pub struct Perspective {
    handle: RwLock<PerspectiveHandle>,
    neighbourhood: Option<Neighbourhood>,
    store: RwLock<LinkStore>,
    sync_state: RwLock<SyncState>,
    languages: Arc<LanguageController>,
    identity: Arc<dyn AgentIdentity>,
    sink: Option<Arc<dyn NotificationSink>>,
}

impl Perspective {
    pub fn new(
        handle: PerspectiveHandle,
        neighbourhood: Option<Neighbourhood>,
        languages: Arc<LanguageController>,
        identity: Arc<dyn AgentIdentity>,
    ) -> Self {
        let sync_state = if neighbourhood.is_some() {
            SyncState::AwaitingBackfill
        } else {
            SyncState::Private
        };
        Self {
            handle: RwLock::new(handle),
            neighbourhood,
            store: RwLock::new(LinkStore::new()),
            sync_state: RwLock::new(sync_state),
            languages,
            identity,
            sink: None,
        }
    }

    /// Publish local link changes to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn uuid(&self) -> PerspectiveId {
        self.handle.read().uuid
    }

    pub fn handle(&self) -> PerspectiveHandle {
        self.handle.read().clone()
    }

    pub fn neighbourhood(&self) -> Option<&Neighbourhood> {
        self.neighbourhood.as_ref()
    }

    pub fn language_address(&self) -> Option<&str> {
        self.neighbourhood
            .as_ref()
            .map(|n| n.link_language_address.as_str())
    }

    pub fn is_shared(&self) -> bool {
        self.neighbourhood.is_some()
    }

    pub fn sync_state(&self) -> SyncState {
        *self.sync_state.read()
    }

    pub fn link_count(&self) -> usize {
        self.store.read().len()
    }

    /// Refresh mutable identity fields after a registry update.
    pub fn update_from_id(&self, handle: &PerspectiveHandle) {
        let mut current = self.handle.write();
        current.name = handle.name.clone();
        current.shared_url = handle.shared_url.clone();
    }

    /// Store a link locally, then propagate it.
    pub async fn apply_local(&self, link: LinkExpression) -> Result<(), ApiError> {
        let inserted = self.store.write().insert(link.clone());
        if inserted {
            self.publish_added(&link);
        } else {
            debug!(perspective = %self.uuid(), "Link already present locally");
        }
        self.submit(LinkDiff::addition(link)).await
    }

    /// Drop a link locally, then propagate the removal.
    pub async fn remove_local(&self, link: LinkExpression) -> Result<(), ApiError> {
        let removed = self.store.write().remove(&link);
        if removed {
            self.publish_removed(&link);
        } else {
            debug!(perspective = %self.uuid(), "Removed link was not present locally");
        }
        self.submit(LinkDiff::removal(link)).await
    }

    /// Author, sign and store a new link.
    pub async fn add_link(&self, link: Link) -> Result<LinkExpression, ApiError> {
        let expression = self.author(link)?;
        self.apply_local(expression.clone()).await?;
        Ok(expression)
    }

    /// Replace `old` with a freshly authored expression of `new`.
    ///
    /// Both halves travel in one diff so peers see the swap atomically.
    pub async fn update_link(
        &self,
        old: &LinkExpression,
        new: Link,
    ) -> Result<LinkExpression, ApiError> {
        let expression = self.author(new)?;
        {
            let mut store = self.store.write();
            if !store.contains(old) {
                return Err(ApiError::LinkNotFound(self.uuid()));
            }
            store.remove(old);
            store.insert(expression.clone());
        }
        self.publish_removed(old);
        self.publish_added(&expression);
        self.submit(LinkDiff::new(vec![expression.clone()], vec![old.clone()]))
            .await?;
        Ok(expression)
    }

    /// Merge a diff delivered by the bound language.
    ///
    /// Returns only the changes that took effect, so replays are silent.
    pub fn apply_remote_diff(&self, diff: &LinkDiff) -> AppliedDiff {
        if !self.is_shared() {
            warn!(perspective = %self.uuid(), "Ignoring remote diff for private perspective");
            return AppliedDiff::default();
        }
        let applied = self.store.write().apply(diff);
        debug!(
            perspective = %self.uuid(),
            added = applied.added.len(),
            removed = applied.removed.len(),
            "Applied remote diff"
        );
        applied
    }

    pub fn get_links(&self, query: &LinkQuery) -> Vec<LinkExpression> {
        self.store.read().query(query)
    }

    /// Pull the language's current state into the store.
    ///
    /// Returns the links that were new locally. Private perspectives have
    /// nothing to pull.
    pub async fn sync_from_language(&self) -> Result<AppliedDiff, ApiError> {
        let Some(address) = self.language_address() else {
            return Ok(AppliedDiff::default());
        };
        let language = self
            .languages
            .language(address)
            .ok_or_else(|| PropagationError::LanguageNotLoaded(address.to_string()))?;

        let links = language.current_state().await?;
        let applied = self
            .store
            .write()
            .apply(&LinkDiff::new(links, Vec::new()));
        *self.sync_state.write() = SyncState::Synced;
        info!(
            perspective = %self.uuid(),
            language = %address,
            added = applied.added.len(),
            "Backfilled perspective from link language"
        );
        Ok(applied)
    }

    fn publish_added(&self, link: &LinkExpression) {
        if let Some(sink) = &self.sink {
            sink.publish(Notification::LinkAdded {
                perspective: self.handle(),
                link: link.clone(),
            });
        }
    }

    fn publish_removed(&self, link: &LinkExpression) {
        if let Some(sink) = &self.sink {
            sink.publish(Notification::LinkRemoved {
                perspective: self.handle(),
                link: link.clone(),
            });
        }
    }

    fn author(&self, link: Link) -> Result<LinkExpression, ApiError> {
        let expression = LinkExpression::new(self.identity.did(), Utc::now(), link);
        let payload = expression
            .signing_payload()
            .map_err(|e| ApiError::Signing(format!("Failed to encode link payload: {}", e)))?;
        let proof = self.identity.sign(&payload)?;
        Ok(expression.with_proof(proof))
    }

    async fn submit(&self, diff: LinkDiff) -> Result<(), ApiError> {
        let Some(address) = self.language_address() else {
            return Ok(());
        };
        let language = self
            .languages
            .language(address)
            .ok_or_else(|| PropagationError::LanguageNotLoaded(address.to_string()))?;

        match language.submit_local_diff(diff).await {
            Ok(ack) => {
                debug!(
                    perspective = %self.uuid(),
                    language = %ack.language,
                    additions = ack.additions,
                    removals = ack.removals,
                    "Local diff accepted"
                );
                Ok(())
            }
            Err(err) => {
                warn!(
                    perspective = %self.uuid(),
                    language = %address,
                    error = %err,
                    "Local diff was not propagated"
                );
                Err(err.into())
            }
        }
    }
}
