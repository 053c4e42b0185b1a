//! Perspective repository port and adapters.

pub mod contract;
pub mod json_file;

pub use contract::{HandleSet, PerspectiveRepository};
pub use json_file::JsonFileRepository;
