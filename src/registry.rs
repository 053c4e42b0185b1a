//! Perspectives registry
//!
//! Owns the durable handle set, the cached runtime perspectives, and the
//! dispatcher that routes remote diffs to them.

pub mod controller;
pub mod dispatcher;
pub mod repository;

pub use controller::{PerspectivesController, RegistryContext};
pub use dispatcher::DispatchOutcome;
pub use repository::{HandleSet, JsonFileRepository, PerspectiveRepository};
