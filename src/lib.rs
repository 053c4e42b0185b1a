//! Weave: agent-owned link perspectives
//!
//! Perspectives are named graphs of signed links that belong to one agent.
//! A perspective can stay private or be bound to a neighbourhood, where a
//! pluggable link language keeps it in step with peers. This crate holds the
//! registry of perspectives, the runtime link stores, the link language
//! surface, the capability bridge handed to language plugins, and the
//! notification boundary.

pub mod bridge;
pub mod config;
pub mod error;
pub mod identity;
pub mod language;
pub mod link;
pub mod logging;
pub mod notify;
pub mod perspective;
pub mod registry;
pub mod tooling;
pub mod types;

pub use error::ApiError;
pub use link::{Link, LinkDiff, LinkExpression, LinkQuery};
pub use perspective::{Neighbourhood, Perspective, PerspectiveHandle};
pub use registry::{PerspectivesController, RegistryContext};
