//! Tooling & Integration Layer
//!
//! Command-line access to the perspectives registry.

pub mod cli;

pub use cli::{Cli, CliContext, Commands, PerspectiveCommands};
