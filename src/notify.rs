//! Notification sink
//!
//! Publish-subscribe boundary between the registry and whatever fans events
//! out to clients. `BroadcastSink` is a tokio broadcast bus; publishing with
//! no subscribers is not an error.

use crate::link::LinkExpression;
use crate::perspective::PerspectiveHandle;
use crate::types::PerspectiveId;
use std::fmt;
use tokio::sync::broadcast;
use tracing::trace;

/// Events published by the registry and the remote diff dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    PerspectiveAdded {
        perspective: PerspectiveHandle,
    },
    PerspectiveUpdated {
        perspective: PerspectiveHandle,
    },
    PerspectiveRemoved {
        uuid: PerspectiveId,
    },
    LinkAdded {
        perspective: PerspectiveHandle,
        link: LinkExpression,
    },
    LinkRemoved {
        perspective: PerspectiveHandle,
        link: LinkExpression,
    },
}

/// Topic a notification is published under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    PerspectiveAdded,
    PerspectiveUpdated,
    PerspectiveRemoved,
    LinkAdded(PerspectiveId),
    LinkRemoved(PerspectiveId),
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::PerspectiveAdded => write!(f, "perspective-added"),
            Topic::PerspectiveUpdated => write!(f, "perspective-updated"),
            Topic::PerspectiveRemoved => write!(f, "perspective-removed"),
            Topic::LinkAdded(uuid) => write!(f, "link-added({})", uuid),
            Topic::LinkRemoved(uuid) => write!(f, "link-removed({})", uuid),
        }
    }
}

impl Notification {
    pub fn topic(&self) -> Topic {
        match self {
            Notification::PerspectiveAdded { .. } => Topic::PerspectiveAdded,
            Notification::PerspectiveUpdated { .. } => Topic::PerspectiveUpdated,
            Notification::PerspectiveRemoved { .. } => Topic::PerspectiveRemoved,
            Notification::LinkAdded { perspective, .. } => Topic::LinkAdded(perspective.uuid),
            Notification::LinkRemoved { perspective, .. } => Topic::LinkRemoved(perspective.uuid),
        }
    }

    pub fn perspective_uuid(&self) -> PerspectiveId {
        match self {
            Notification::PerspectiveRemoved { uuid } => *uuid,
            Notification::PerspectiveAdded { perspective }
            | Notification::PerspectiveUpdated { perspective }
            | Notification::LinkAdded { perspective, .. }
            | Notification::LinkRemoved { perspective, .. } => perspective.uuid,
        }
    }
}

pub trait NotificationSink: Send + Sync {
    fn publish(&self, notification: Notification);
}

/// Broadcast event bus
pub struct BroadcastSink {
    sender: broadcast::Sender<Notification>,
}

impl BroadcastSink {
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationSink for BroadcastSink {
    fn publish(&self, notification: Notification) {
        trace!(topic = %notification.topic(), "Publishing notification");
        // No subscribers is fine
        let _ = self.sender.send(notification);
    }
}
