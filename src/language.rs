//! Link languages
//!
//! A link language is the pluggable replication protocol behind a shared
//! perspective. This module defines the capability surface, the controller
//! that owns installed languages, and an in-memory implementation.

pub mod contract;
pub mod controller;
pub mod memory;

pub use contract::{Ack, DiffReceiver, LinkLanguage};
pub use controller::LanguageController;
pub use memory::MemoryLinkLanguage;
