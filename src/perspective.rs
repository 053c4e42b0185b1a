//! Perspectives
//!
//! A perspective is an agent-owned link graph. Its handle is durable; its
//! links live in memory and, when the perspective is bound to a
//! neighbourhood, are kept in step with peers through a link language.

pub mod handle;
pub mod instance;
pub mod store;

pub use handle::{Neighbourhood, PerspectiveHandle};
pub use instance::{Perspective, SyncState};
pub use store::{AppliedDiff, LinkStore};
