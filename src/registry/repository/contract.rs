//! Perspective repository port.

use crate::error::StorageError;
use crate::perspective::PerspectiveHandle;
use crate::types::PerspectiveId;
use std::collections::BTreeMap;

/// Full set of persisted handles, keyed by uuid.
pub type HandleSet = BTreeMap<PerspectiveId, PerspectiveHandle>;

/// Durable storage for the handle set.
///
/// `save` replaces the whole set. An implementation must either persist all
/// of it or leave the previous set in place.
pub trait PerspectiveRepository: Send + Sync {
    fn load(&self) -> Result<HandleSet, StorageError>;

    fn save(&self, handles: &HandleSet) -> Result<(), StorageError>;

    /// Human-readable location, for logs.
    fn location(&self) -> String;
}
