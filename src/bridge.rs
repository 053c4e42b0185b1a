//! Capability bridge
//!
//! Host operations handed to link-language plugins: scoped signing,
//! content hashing and module loading. Plugin faults come back as typed
//! errors.

pub mod context;
pub mod loader;

pub use context::{content_address, SandboxContext};
pub use loader::{ModuleCatalog, ModuleFactory, ModuleLoader};
