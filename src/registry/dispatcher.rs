//! Remote diff dispatcher.

use super::controller::RegistryState;
use crate::link::RemoteDiff;
use crate::notify::{Notification, NotificationSink};
use crate::types::{LanguageAddress, PerspectiveId};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Result of routing one remote diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Applied {
        perspective: PerspectiveId,
        added: usize,
        removed: usize,
    },
    /// No cached perspective is bound to the diff's language.
    Misrouted { language: LanguageAddress },
}

/// Routes remote diffs to the perspective bound to their language and
/// publishes one notification per effective change.
#[derive(Clone)]
pub(crate) struct DiffDispatcher {
    state: Arc<RwLock<RegistryState>>,
    sink: Arc<dyn NotificationSink>,
}

impl DiffDispatcher {
    pub(crate) fn new(state: Arc<RwLock<RegistryState>>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { state, sink }
    }

    pub(crate) fn dispatch(&self, event: RemoteDiff) -> DispatchOutcome {
        let target = self.state.read().bound_to(&event.language);
        let Some(perspective) = target else {
            warn!(
                language = %event.language,
                additions = event.diff.additions.len(),
                removals = event.diff.removals.len(),
                "Misrouted remote diff, no perspective is bound to this language"
            );
            return DispatchOutcome::Misrouted {
                language: event.language,
            };
        };

        let applied = perspective.apply_remote_diff(&event.diff);
        let handle = perspective.handle();
        let outcome = DispatchOutcome::Applied {
            perspective: handle.uuid,
            added: applied.added.len(),
            removed: applied.removed.len(),
        };

        for link in applied.added {
            self.sink.publish(Notification::LinkAdded {
                perspective: handle.clone(),
                link,
            });
        }
        for link in applied.removed {
            self.sink.publish(Notification::LinkRemoved {
                perspective: handle.clone(),
                link,
            });
        }
        outcome
    }

    pub(crate) async fn run(self, mut events: mpsc::Receiver<RemoteDiff>) {
        debug!("Remote diff dispatcher started");
        while let Some(event) = events.recv().await {
            self.dispatch(event);
        }
        debug!("Remote diff stream closed, dispatcher stopped");
    }
}
