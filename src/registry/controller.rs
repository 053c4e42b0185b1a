//! Perspectives controller: the registry of handles and live instances.

use super::dispatcher::{DiffDispatcher, DispatchOutcome};
use super::repository::{HandleSet, PerspectiveRepository};
use crate::error::ApiError;
use crate::identity::AgentIdentity;
use crate::language::LanguageController;
use crate::link::{LinkExpression, LinkQuery, RemoteDiff};
use crate::notify::{Notification, NotificationSink};
use crate::perspective::{Neighbourhood, Perspective, PerspectiveHandle};
use crate::types::PerspectiveId;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Collaborators the registry is built from.
#[derive(Clone)]
pub struct RegistryContext {
    pub repository: Arc<dyn PerspectiveRepository>,
    pub languages: Arc<LanguageController>,
    pub identity: Arc<dyn AgentIdentity>,
    pub sink: Arc<dyn NotificationSink>,
}

/// Committed registry state: persisted handles and cached instances.
#[derive(Default)]
pub(crate) struct RegistryState {
    handles: HashMap<PerspectiveId, PerspectiveHandle>,
    instances: HashMap<PerspectiveId, Arc<Perspective>>,
}

impl RegistryState {
    /// Cached perspective bound to `address`, if any.
    pub(crate) fn bound_to(&self, address: &str) -> Option<Arc<Perspective>> {
        self.instances
            .values()
            .find(|p| p.language_address() == Some(address))
            .cloned()
    }

    fn handle_set(&self) -> HandleSet {
        self.handles
            .iter()
            .map(|(uuid, handle)| (*uuid, handle.clone()))
            .collect()
    }

    fn binding_owner(&self, address: &str, except: Option<PerspectiveId>) -> Option<PerspectiveId> {
        self.handles
            .values()
            .find(|h| Some(h.uuid) != except && h.language_address() == Some(address))
            .map(|h| h.uuid)
    }
}

/// Registry of perspectives.
///
/// Mutations are serialized by one writer lock. Each computes the next
/// handle set, persists it, and commits to memory only once the write
/// succeeded, so a failed write leaves nothing half-applied.
pub struct PerspectivesController {
    state: Arc<RwLock<RegistryState>>,
    writer: Mutex<()>,
    context: RegistryContext,
    dispatcher: DiffDispatcher,
    dispatch_task: Mutex<Option<JoinHandle<()>>>,
}

impl PerspectivesController {
    /// Load persisted handles and start consuming remote diffs.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(context: RegistryContext) -> Result<Self, ApiError> {
        let controller = Self::load(context)?;
        let events = controller.context.languages.take_diff_events()?;
        let task = tokio::spawn(controller.dispatcher.clone().run(events));
        *controller.dispatch_task.lock() = Some(task);
        Ok(controller)
    }

    /// Load persisted handles without taking the remote diff stream.
    ///
    /// Bound perspectives get an instance right away so diffs can be
    /// routed to them; private ones are built on first use.
    pub fn load(context: RegistryContext) -> Result<Self, ApiError> {
        let handles = context.repository.load()?;

        let mut state = RegistryState::default();
        for (uuid, handle) in handles {
            if let Some(neighbourhood) = handle.neighbourhood.clone() {
                let instance = Perspective::new(
                    handle.clone(),
                    Some(neighbourhood),
                    Arc::clone(&context.languages),
                    Arc::clone(&context.identity),
                )
                .with_sink(Arc::clone(&context.sink));
                state.instances.insert(uuid, Arc::new(instance));
            }
            state.handles.insert(uuid, handle);
        }
        info!(
            location = %context.repository.location(),
            perspectives = state.handles.len(),
            bound = state.instances.len(),
            "Loaded perspectives"
        );

        let state = Arc::new(RwLock::new(state));
        let dispatcher = DiffDispatcher::new(Arc::clone(&state), Arc::clone(&context.sink));
        Ok(Self {
            state,
            writer: Mutex::new(()),
            context,
            dispatcher,
            dispatch_task: Mutex::new(None),
        })
    }

    pub fn all_handles(&self) -> Vec<PerspectiveHandle> {
        let mut handles: Vec<_> = self.state.read().handles.values().cloned().collect();
        handles.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.uuid.cmp(&b.uuid)));
        handles
    }

    pub fn handle(&self, uuid: PerspectiveId) -> Option<PerspectiveHandle> {
        self.state.read().handles.get(&uuid).cloned()
    }

    /// Cached instance, built unbound from the handle on first access.
    pub fn instance(&self, uuid: PerspectiveId) -> Result<Arc<Perspective>, ApiError> {
        if let Some(instance) = self.state.read().instances.get(&uuid) {
            return Ok(Arc::clone(instance));
        }

        let mut state = self.state.write();
        let handle = state
            .handles
            .get(&uuid)
            .cloned()
            .ok_or(ApiError::NotFound(uuid))?;
        let instance = state
            .instances
            .entry(uuid)
            .or_insert_with(|| {
                debug!(perspective = %uuid, "Creating perspective instance");
                Arc::new(self.build_instance(handle, None))
            });
        Ok(Arc::clone(instance))
    }

    /// Every link currently known for a perspective.
    pub fn snapshot(&self, uuid: PerspectiveId) -> Result<Vec<LinkExpression>, ApiError> {
        Ok(self.instance(uuid)?.get_links(&LinkQuery::default()))
    }

    pub fn add(
        &self,
        name: impl Into<String>,
        shared_url: Option<String>,
        neighbourhood: Option<Neighbourhood>,
    ) -> Result<PerspectiveHandle, ApiError> {
        let _writer = self.writer.lock();

        let (uuid, mut next) = {
            let state = self.state.read();
            if let Some(n) = &neighbourhood {
                if let Some(owner) = state.binding_owner(&n.link_language_address, None) {
                    return Err(ApiError::NeighbourhoodInUse {
                        address: n.link_language_address.clone(),
                        perspective: owner,
                    });
                }
            }
            let mut uuid = Uuid::new_v4();
            while state.handles.contains_key(&uuid) {
                uuid = Uuid::new_v4();
            }
            (uuid, state.handle_set())
        };

        let handle = PerspectiveHandle {
            uuid,
            name: name.into(),
            shared_url,
            neighbourhood: neighbourhood.clone(),
        };
        next.insert(uuid, handle.clone());
        self.context.repository.save(&next)?;

        let instance = Arc::new(self.build_instance(handle.clone(), neighbourhood));
        {
            let mut state = self.state.write();
            state.handles.insert(uuid, handle.clone());
            state.instances.insert(uuid, instance);
        }

        info!(perspective = %uuid, name = %handle.name, shared = handle.neighbourhood.is_some(), "Added perspective");
        self.context.sink.publish(Notification::PerspectiveAdded {
            perspective: handle.clone(),
        });
        Ok(handle)
    }

    /// Rebind an existing perspective to `neighbourhood`.
    ///
    /// The cached instance is replaced, so links held in memory by the old
    /// instance are dropped.
    pub fn replace(
        &self,
        handle: PerspectiveHandle,
        neighbourhood: Neighbourhood,
    ) -> Result<PerspectiveHandle, ApiError> {
        let _writer = self.writer.lock();
        let uuid = handle.uuid;

        let mut next = {
            let state = self.state.read();
            if !state.handles.contains_key(&uuid) {
                return Err(ApiError::NotFound(uuid));
            }
            if let Some(owner) =
                state.binding_owner(&neighbourhood.link_language_address, Some(uuid))
            {
                return Err(ApiError::NeighbourhoodInUse {
                    address: neighbourhood.link_language_address.clone(),
                    perspective: owner,
                });
            }
            state.handle_set()
        };

        let mut updated = handle;
        updated.neighbourhood = Some(neighbourhood.clone());
        next.insert(uuid, updated.clone());
        self.context.repository.save(&next)?;

        let instance = Arc::new(self.build_instance(updated.clone(), Some(neighbourhood)));
        {
            let mut state = self.state.write();
            state.handles.insert(uuid, updated.clone());
            state.instances.insert(uuid, instance);
        }

        info!(
            perspective = %uuid,
            language = updated.language_address().unwrap_or_default(),
            "Rebound perspective to neighbourhood"
        );
        self.context.sink.publish(Notification::PerspectiveUpdated {
            perspective: updated.clone(),
        });
        Ok(updated)
    }

    /// Delete a perspective. Unknown uuids are ignored.
    pub fn remove(&self, uuid: PerspectiveId) -> Result<(), ApiError> {
        let _writer = self.writer.lock();

        let mut next = {
            let state = self.state.read();
            if !state.handles.contains_key(&uuid) {
                debug!(perspective = %uuid, "Remove of unknown perspective ignored");
                return Ok(());
            }
            state.handle_set()
        };
        next.remove(&uuid);
        self.context.repository.save(&next)?;

        {
            let mut state = self.state.write();
            state.handles.remove(&uuid);
            state.instances.remove(&uuid);
        }

        info!(perspective = %uuid, "Removed perspective");
        self.context
            .sink
            .publish(Notification::PerspectiveRemoved { uuid });
        Ok(())
    }

    /// Rename a perspective.
    pub fn update(
        &self,
        uuid: PerspectiveId,
        name: impl Into<String>,
    ) -> Result<PerspectiveHandle, ApiError> {
        let _writer = self.writer.lock();

        let (mut updated, mut next) = {
            let state = self.state.read();
            let current = state
                .handles
                .get(&uuid)
                .cloned()
                .ok_or(ApiError::NotFound(uuid))?;
            (current, state.handle_set())
        };
        updated.name = name.into();
        next.insert(uuid, updated.clone());
        self.context.repository.save(&next)?;

        {
            let mut state = self.state.write();
            state.handles.insert(uuid, updated.clone());
            if let Some(instance) = state.instances.get(&uuid) {
                instance.update_from_id(&updated);
            }
        }

        info!(perspective = %uuid, name = %updated.name, "Updated perspective");
        self.context.sink.publish(Notification::PerspectiveUpdated {
            perspective: updated.clone(),
        });
        Ok(updated)
    }

    /// Backfill one perspective from its language's current state.
    ///
    /// Returns how many links were new. Each one is published as
    /// `link-added`.
    pub async fn sync(&self, uuid: PerspectiveId) -> Result<usize, ApiError> {
        let instance = self.instance(uuid)?;
        let applied = instance.sync_from_language().await?;
        let added = applied.added.len();
        let handle = instance.handle();
        for link in applied.added {
            self.context.sink.publish(Notification::LinkAdded {
                perspective: handle.clone(),
                link,
            });
        }
        Ok(added)
    }

    /// Backfill every bound perspective. Failures are reported per perspective.
    pub async fn sync_all(&self) -> Vec<(PerspectiveId, Result<usize, ApiError>)> {
        let bound: Vec<PerspectiveId> = {
            let state = self.state.read();
            let mut ids: Vec<_> = state
                .instances
                .values()
                .filter(|p| p.is_shared())
                .map(|p| p.uuid())
                .collect();
            ids.sort();
            ids
        };

        let mut results = Vec::with_capacity(bound.len());
        for uuid in bound {
            let result = self.sync(uuid).await;
            if let Err(err) = &result {
                warn!(perspective = %uuid, error = %err, "Backfill failed");
            }
            results.push((uuid, result));
        }
        results
    }

    /// Route one remote diff, as the dispatcher task does.
    pub fn dispatch(&self, event: RemoteDiff) -> DispatchOutcome {
        self.dispatcher.dispatch(event)
    }

    /// Stop the dispatcher task. Diffs still buffered are dropped.
    pub fn shutdown(&self) {
        if let Some(task) = self.dispatch_task.lock().take() {
            task.abort();
            info!("Stopped remote diff dispatcher");
        }
    }

    pub fn languages(&self) -> &Arc<LanguageController> {
        &self.context.languages
    }

    fn build_instance(
        &self,
        handle: PerspectiveHandle,
        neighbourhood: Option<Neighbourhood>,
    ) -> Perspective {
        Perspective::new(
            handle,
            neighbourhood,
            Arc::clone(&self.context.languages),
            Arc::clone(&self.context.identity),
        )
        .with_sink(Arc::clone(&self.context.sink))
    }
}

impl Drop for PerspectivesController {
    fn drop(&mut self) {
        if let Some(task) = self.dispatch_task.get_mut().take() {
            task.abort();
        }
    }
}
